//! Diagnostic sinks.

use crate::ports::outbound::{Diagnostic, DiagnosticSink};
use parking_lot::Mutex;
use tracing::error;

/// Default sink: logs every diagnostic at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::CallbackFailed {
                target,
                callback,
                reason,
            } => error!(call = %target, callback = %callback, reason = %reason, "Callback failed"),
            Diagnostic::UnhandledError { target, error } => {
                error!(call = %target, error = %error, "Unhandled request error")
            }
            Diagnostic::MalformedPush { reason, payload } => {
                error!(reason = %reason, payload = %payload, "Malformed push message")
            }
        }
    }
}

/// Sink that keeps every diagnostic, for inspection.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    reported: Mutex<Vec<Diagnostic>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.reported.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reported.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.lock().is_empty()
    }
}

impl DiagnosticSink for MemoryDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.reported.lock().push(diagnostic);
    }
}
