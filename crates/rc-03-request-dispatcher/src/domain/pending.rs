//! Pending request registry: correlation id → envelope awaiting completion.
//!
//! Removal is atomic, so a completion arriving by push and by reconciliation
//! at the same time is delivered once.

use crate::domain::envelope::RequestEnvelope;
use dashmap::DashMap;
use shared_types::CorrelationId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Statistics for the pending registry
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Total requests completed
    pub total_completed: AtomicU64,
    /// Completions for ids no longer tracked
    pub total_duplicates: AtomicU64,
}

/// Point-in-time copy of [`PendingStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingStatsSnapshot {
    pub registered: u64,
    pub completed: u64,
    pub duplicates: u64,
}

impl PendingStats {
    pub fn snapshot(&self) -> PendingStatsSnapshot {
        PendingStatsSnapshot {
            registered: self.total_registered.load(Ordering::Relaxed),
            completed: self.total_completed.load(Ordering::Relaxed),
            duplicates: self.total_duplicates.load(Ordering::Relaxed),
        }
    }
}

/// Envelopes whose outcome will arrive later.
#[derive(Debug, Default)]
pub struct PendingRequestRegistry {
    pending: DashMap<CorrelationId, RequestEnvelope>,
    stats: Arc<PendingStats>,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an envelope. A second insert under the same id replaces the first.
    pub fn insert(&self, id: CorrelationId, envelope: RequestEnvelope) {
        let target = envelope.target();
        if self.pending.insert(id.clone(), envelope).is_some() {
            warn!(correlation_id = %id, call = %target, "Correlation id re-registered, replacing");
            return;
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        debug!(correlation_id = %id, call = %target, "Registered pending request");
    }

    /// Stop tracking an id. `None` if it was not tracked.
    pub fn remove(&self, id: &CorrelationId) -> Option<RequestEnvelope> {
        match self.pending.remove(id) {
            Some((_, envelope)) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %id, call = %envelope.target(), "Removed pending request");
                Some(envelope)
            }
            None => {
                self.stats.total_duplicates.fetch_add(1, Ordering::Relaxed);
                warn!(correlation_id = %id, "Completion for unknown or already completed request");
                None
            }
        }
    }

    pub fn get(&self, id: &CorrelationId) -> Option<RequestEnvelope> {
        self.pending.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.pending.contains_key(id)
    }

    /// Outstanding ids, sorted.
    pub fn ids(&self) -> Vec<CorrelationId> {
        let mut ids: Vec<_> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything. Returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            debug!(dropped = dropped, "Cleared pending requests");
        }
        dropped
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}
