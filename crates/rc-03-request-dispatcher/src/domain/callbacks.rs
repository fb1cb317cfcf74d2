//! Callback delivery.
//!
//! Every user callback runs behind this boundary: an `Err` return or a panic
//! is reported to the diagnostic sink and never reaches the caller's loop.

use crate::domain::envelope::{ErrorCallback, RequestEnvelope, StatusCallback, SuccessCallback};
use crate::ports::outbound::{CallbackKind, Diagnostic, DiagnosticSink};
use serde_json::Value;
use shared_types::RequestError;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

fn guarded<F>(sink: &dyn DiagnosticSink, envelope: &RequestEnvelope, kind: CallbackKind, f: F)
where
    F: FnOnce() -> anyhow::Result<()>,
{
    let reason = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{:#}", e),
        Err(payload) => panic_message(payload),
    };
    sink.report(Diagnostic::CallbackFailed {
        target: envelope.target(),
        callback: kind,
        reason,
    });
}

/// Deliver a result. Without a callback the result is dropped.
pub fn deliver_success(
    sink: &dyn DiagnosticSink,
    envelope: &RequestEnvelope,
    callback: Option<&SuccessCallback>,
    result: &Value,
) {
    match callback {
        Some(callback) => guarded(sink, envelope, CallbackKind::Success, || {
            callback(envelope, result)
        }),
        None => debug!(call = %envelope.target(), "No success callback, result dropped"),
    }
}

/// Deliver an error. Without a callback the error goes to the sink.
pub fn deliver_error(
    sink: &dyn DiagnosticSink,
    envelope: &RequestEnvelope,
    callback: Option<&ErrorCallback>,
    error: &RequestError,
) {
    match callback {
        Some(callback) => guarded(sink, envelope, CallbackKind::Error, || {
            callback(envelope, error)
        }),
        None => sink.report(Diagnostic::UnhandledError {
            target: envelope.target(),
            error: error.clone(),
        }),
    }
}

/// Deliver interim status. Without a callback the status is dropped.
pub fn deliver_status(
    sink: &dyn DiagnosticSink,
    envelope: &RequestEnvelope,
    callback: Option<&StatusCallback>,
    status: &Value,
) {
    match callback {
        Some(callback) => guarded(sink, envelope, CallbackKind::Status, || {
            callback(envelope, status)
        }),
        None => debug!(call = %envelope.target(), "No status callback, status dropped"),
    }
}
