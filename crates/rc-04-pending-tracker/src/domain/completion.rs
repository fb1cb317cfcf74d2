//! Completion records.

use rc_03_request_dispatcher::RequestEnvelope;
use serde_json::Value;
use shared_types::{CorrelationId, RequestError};

/// A pending request that reached its terminal state.
///
/// Built the same way whether the completion was pushed or polled.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub id: CorrelationId,
    /// Envelope rebuilt from the server's request snapshot.
    pub envelope: RequestEnvelope,
    /// Server-reported success flag.
    pub success: bool,
    /// Decoded result, or the error delivered to `on_error`.
    pub outcome: Result<Value, RequestError>,
}

impl CompletionRecord {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.outcome.as_ref().err()
    }
}

/// What a push message amounted to.
#[derive(Debug, Clone)]
pub enum MessageOutcome {
    /// Completions applied (duplicates excluded).
    Completed(Vec<CompletionRecord>),
    /// Interim status; `delivered` is false for an unknown id.
    Status { id: CorrelationId, delivered: bool },
    /// Not addressed to the tracker.
    Ignored,
    /// Could not be parsed; reported to the diagnostic sink.
    Malformed,
}
