//! In-memory request transport with scripted replies.

use crate::ports::outbound::RequestTransport;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{CallRequest, SessionId, TransportError};
use std::collections::VecDeque;
use tracing::debug;

/// A batch as the transport received it.
#[derive(Debug, Clone, PartialEq)]
pub struct SentBatch {
    pub session: Option<SessionId>,
    pub calls: Vec<CallRequest>,
}

/// Replies are handed out in the order they were scripted; every batch
/// sent is recorded. With nothing scripted the transport is unavailable.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    sent: Mutex<Vec<SentBatch>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: Value) {
        self.replies.lock().push_back(Ok(reply));
    }

    pub fn push_failure(&self, error: TransportError) {
        self.replies.lock().push_back(Err(error));
    }

    pub fn sent(&self) -> Vec<SentBatch> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl RequestTransport for ScriptedTransport {
    async fn send_batch(
        &self,
        session: Option<&SessionId>,
        batch: &[CallRequest],
    ) -> Result<Value, TransportError> {
        self.sent.lock().push(SentBatch {
            session: session.cloned(),
            calls: batch.to_vec(),
        });
        debug!(calls = batch.len(), "Scripted transport received batch");
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Unavailable("no scripted reply".into())))
    }
}
