//! # Client Session
//!
//! Session identity, the pending registry and the session-wide fallback
//! handlers for pending completions.

use crate::domain::envelope::{ErrorCallback, RequestEnvelope, StatusCallback, SuccessCallback};
use crate::domain::pending::PendingRequestRegistry;
use parking_lot::RwLock;
use serde_json::Value;
use shared_types::{RequestError, SessionId};
use std::sync::Arc;
use tracing::info;

/// Fallback callbacks for completions whose envelope has none.
#[derive(Clone, Default)]
pub struct PendingHandlers {
    pub on_pending_success: Option<SuccessCallback>,
    pub on_pending_error: Option<ErrorCallback>,
    pub on_pending_status: Option<StatusCallback>,
}

impl PendingHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_pending_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestEnvelope, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_pending_success = Some(Arc::new(callback));
        self
    }

    pub fn on_pending_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestEnvelope, &RequestError) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_pending_error = Some(Arc::new(callback));
        self
    }

    pub fn on_pending_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestEnvelope, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_pending_status = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for PendingHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingHandlers")
            .field("on_pending_success", &self.on_pending_success.is_some())
            .field("on_pending_error", &self.on_pending_error.is_some())
            .field("on_pending_status", &self.on_pending_status.is_some())
            .finish()
    }
}

/// Per-session client state.
#[derive(Debug, Default)]
pub struct ClientSession {
    session_id: RwLock<Option<SessionId>>,
    pending: PendingRequestRegistry,
    handlers: RwLock<PendingHandlers>,
}

impl ClientSession {
    /// A session without identity (calls are sent anonymously).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(session_id: SessionId) -> Self {
        let session = Self::new();
        session.set_session_id(session_id);
        session
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id.read().clone()
    }

    pub fn set_session_id(&self, session_id: SessionId) {
        info!(session_id = %session_id, "Session started");
        *self.session_id.write() = Some(session_id);
    }

    pub fn pending(&self) -> &PendingRequestRegistry {
        &self.pending
    }

    pub fn handlers(&self) -> PendingHandlers {
        self.handlers.read().clone()
    }

    pub fn set_handlers(&self, handlers: PendingHandlers) {
        *self.handlers.write() = handlers;
    }

    /// End the session: forget identity and every pending request.
    pub fn logout(&self) {
        let previous = self.session_id.write().take();
        let dropped = self.pending.clear();
        info!(
            session_id = ?previous.as_ref().map(SessionId::as_str),
            dropped_pending = dropped,
            "Session logged out"
        );
    }

    /// Forget pending requests but keep the identity.
    pub fn reset(&self) {
        let dropped = self.pending.clear();
        info!(dropped_pending = dropped, "Session pending requests reset");
    }
}
