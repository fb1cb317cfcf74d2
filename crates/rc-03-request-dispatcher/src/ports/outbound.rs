//! # Outbound Ports
//!
//! What the dispatcher needs from the outside: a request transport and a
//! place to report failures nobody else will see.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{CallRequest, RequestError, SessionId, TransportError};
use std::fmt;

/// Point-to-point request transport: send a batch, get one reply.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Send `batch` and return the raw reply.
    ///
    /// `session` is attached to the request when present (for example as a
    /// header). A reply of `{error}` or an array is returned as-is; only
    /// failures to complete the round trip are errors.
    async fn send_batch(
        &self,
        session: Option<&SessionId>,
        batch: &[CallRequest],
    ) -> Result<Value, TransportError>;
}

/// Which callback a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Success,
    Error,
    Status,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "on_success",
            Self::Error => "on_error",
            Self::Status => "on_status",
        })
    }
}

/// A failure that could not be delivered to caller code.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A user callback returned `Err` or panicked.
    CallbackFailed {
        target: String,
        callback: CallbackKind,
        reason: String,
    },
    /// An error outcome for an envelope with no error callback.
    UnhandledError { target: String, error: RequestError },
    /// A push payload that could not be interpreted.
    MalformedPush { reason: String, payload: Value },
}

/// Sink for [`Diagnostic`]s.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}
