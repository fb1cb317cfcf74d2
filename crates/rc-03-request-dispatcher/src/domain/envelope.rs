//! # Request Envelope
//!
//! One call as the caller builds it: target, params, optional context and
//! the callbacks its outcome is delivered to.

use serde_json::Value;
use shared_types::{CallRequest, CorrelationId, RequestError};
use std::fmt;
use std::sync::Arc;

/// Receives the result of a successful call.
pub type SuccessCallback =
    Arc<dyn Fn(&RequestEnvelope, &Value) -> anyhow::Result<()> + Send + Sync>;

/// Receives the error of a failed call.
pub type ErrorCallback =
    Arc<dyn Fn(&RequestEnvelope, &RequestError) -> anyhow::Result<()> + Send + Sync>;

/// Receives interim status of a pending call.
pub type StatusCallback =
    Arc<dyn Fn(&RequestEnvelope, &Value) -> anyhow::Result<()> + Send + Sync>;

/// A call and its outcome handlers.
#[derive(Clone)]
pub struct RequestEnvelope {
    pub service: String,
    pub method: String,
    pub params: Value,
    /// Opaque caller data, sent with the call and echoed to callbacks.
    pub context: Option<Value>,
    /// Set once the server answered with a correlation id.
    pub pending: bool,
    pub id: Option<CorrelationId>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
    on_status: Option<StatusCallback>,
}

impl RequestEnvelope {
    pub fn new(service: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            params,
            context: None,
            pending: false,
            id: None,
            on_success: None,
            on_error: None,
            on_status: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestEnvelope, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestEnvelope, &RequestError) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestEnvelope, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(callback));
        self
    }

    pub fn success_callback(&self) -> Option<&SuccessCallback> {
        self.on_success.as_ref()
    }

    pub fn error_callback(&self) -> Option<&ErrorCallback> {
        self.on_error.as_ref()
    }

    pub fn status_callback(&self) -> Option<&StatusCallback> {
        self.on_status.as_ref()
    }

    /// Rebuild a completed envelope: target and params as the server echoed
    /// them, context and callbacks from the tracked envelope.
    pub fn reconstruct(
        tracked: &RequestEnvelope,
        service: impl Into<String>,
        method: impl Into<String>,
        params: Value,
    ) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            params,
            context: tracked.context.clone(),
            pending: false,
            id: tracked.id.clone(),
            on_success: tracked.on_success.clone(),
            on_error: tracked.on_error.clone(),
            on_status: tracked.on_status.clone(),
        }
    }

    /// Wire form of the call.
    pub fn to_call_request(&self) -> CallRequest {
        CallRequest {
            service: self.service.clone(),
            method: self.method.clone(),
            params: self.params.clone(),
            context: self.context.clone(),
        }
    }

    /// `Service.method`, for logging.
    pub fn target(&self) -> String {
        format!("{}.{}", self.service, self.method)
    }
}

impl fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("service", &self.service)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("context", &self.context)
            .field("pending", &self.pending)
            .field("id", &self.id)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_status", &self.on_status.is_some())
            .finish()
    }
}
