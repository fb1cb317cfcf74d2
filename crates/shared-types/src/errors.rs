//! # Error Types
//!
//! Errors delivered to request callbacks. None of these are ever thrown into
//! caller code: they reach the caller only through an `on_error` callback or
//! the diagnostic sink.

use serde_json::Value;
use thiserror::Error;

/// Failure of the point-to-point request transport.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The transport could not reach the server.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The round trip failed (I/O error, bad status, undecodable body).
    #[error("transport failed: {0}")]
    Failed(String),

    /// The server answered the whole batch with a top-level `{error}`
    /// (malformed batch, invalid session, ...).
    #[error("batch rejected: {0}")]
    Rejected(Value),
}

/// The reply did not have the expected shape.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProtocolError {
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Error reported by the server for a single request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServerError {
    /// Plain string error.
    #[error("{0}")]
    Message(String),

    /// Structured error payload not matching any declared exception.
    #[error("server error: {0}")]
    Payload(Value),

    /// One of the method's declared exceptions.
    #[error("{exception_type} exception raised as '{field}': {payload}")]
    Declared {
        field: String,
        exception_type: String,
        payload: Value,
    },
}

impl ServerError {
    /// Classify a raw error payload without schema knowledge.
    pub fn from_payload(payload: Value) -> Self {
        match payload {
            Value::String(message) => Self::Message(message),
            other => Self::Payload(other),
        }
    }

    /// Raw payload as received.
    pub fn payload(&self) -> Value {
        match self {
            Self::Message(message) => Value::String(message.clone()),
            Self::Payload(payload) => payload.clone(),
            Self::Declared { field, payload, .. } => {
                let mut map = serde_json::Map::new();
                map.insert(field.clone(), payload.clone());
                Value::Object(map)
            }
        }
    }
}

/// Everything that can be handed to an `on_error` callback.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Rejected locally before dispatch because the params failed validation.
    #[error("invalid params: {0}")]
    Invalid(String),
}

impl RequestError {
    /// Shorthand for a plain server message.
    pub fn server_message(message: impl Into<String>) -> Self {
        Self::Server(ServerError::Message(message.into()))
    }
}
