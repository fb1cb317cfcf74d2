//! # Push Transport
//!
//! Defines the client side of the push channel and an in-memory bus.

use crate::events::{ChannelEvent, ConnectEvent};
use crate::subscriber::ChannelListener;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use serde_json::Value;
use shared_types::TransportError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Capabilities the client needs from the push transport.
///
/// Incoming messages and connect events are not pulled through this trait;
/// the transport surfaces them as a stream of [`ChannelEvent`]s.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Start receiving messages published on `channel`.
    async fn subscribe(&self, channel: &str) -> Result<(), TransportError>;

    /// Stop receiving messages published on `channel`.
    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError>;

    /// Publish `data` on `channel`.
    async fn publish(&self, channel: &str, data: Value) -> Result<(), TransportError>;
}

/// In-memory push bus.
///
/// Plays both roles: the client-facing [`PushTransport`], and a server side
/// that can emit connect events and deliver messages to subscribed channels.
/// Everything the client publishes is recorded for inspection.
///
/// Uses `tokio::sync::broadcast` to fan events out to listeners.
pub struct InMemoryPushBus {
    /// Broadcast sender for channel events.
    sender: broadcast::Sender<ChannelEvent>,

    /// Active subscription count by channel.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Messages published by the client, in order.
    published: RwLock<Vec<(String, Value)>>,

    subscribe_calls: AtomicU64,
    unsubscribe_calls: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryPushBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            published: RwLock::new(Vec::new()),
            subscribe_calls: AtomicU64::new(0),
            unsubscribe_calls: AtomicU64::new(0),
            capacity,
        }
    }

    /// Listen to the events this bus emits.
    #[must_use]
    pub fn listen(&self) -> ChannelListener {
        ChannelListener::new(self.sender.subscribe())
    }

    /// Emit a connect event.
    pub fn connect(&self, event: ConnectEvent) -> usize {
        debug!(client_id = %event.client_id, "Emitting connect event");
        self.emit(ChannelEvent::Connect(event))
    }

    /// Emit a disconnect event.
    pub fn disconnect(&self) -> usize {
        self.emit(ChannelEvent::Disconnected)
    }

    /// Deliver a server message on `channel`.
    ///
    /// Returns the number of listeners that received it; messages for a
    /// channel nobody subscribed to are dropped and 0 is returned.
    pub fn deliver(&self, channel: &str, data: Value) -> usize {
        if !self.is_subscribed(channel) {
            warn!(channel = channel, "Message dropped (channel not subscribed)");
            return 0;
        }
        self.emit(ChannelEvent::Message {
            channel: channel.to_string(),
            data,
        })
    }

    fn emit(&self, event: ChannelEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(kind = kind, receivers = receivers, "Channel event emitted");
                receivers
            }
            Err(e) => {
                warn!(kind = kind, error = %e, "Channel event dropped (no listeners)");
                0
            }
        }
    }

    /// Whether the client currently holds a subscription on `channel`.
    #[must_use]
    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscriptions.read().get(channel).copied().unwrap_or(0) > 0
    }

    /// Everything the client published, in order.
    #[must_use]
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.read().clone()
    }

    /// Messages published on one channel, in order.
    #[must_use]
    pub fn published_on(&self, channel: &str) -> Vec<Value> {
        self.published()
            .into_iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, data)| data)
            .collect()
    }

    /// Messages published with a given `action` tag, in order.
    #[must_use]
    pub fn published_actions(&self, action: &str) -> Vec<Value> {
        self.published()
            .into_iter()
            .map(|(_, data)| data)
            .filter(|data| data.get("action").and_then(Value::as_str) == Some(action))
            .collect()
    }

    #[must_use]
    pub fn subscribe_calls(&self) -> u64 {
        self.subscribe_calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn unsubscribe_calls(&self) -> u64 {
        self.unsubscribe_calls.load(Ordering::Relaxed)
    }

    /// Get the number of active listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryPushBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushTransport for InMemoryPushBus {
    async fn subscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.subscribe_calls.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscriptions.write();
        *subs.entry(channel.to_string()).or_insert(0) += 1;
        debug!(channel = channel, "Subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.unsubscribe_calls.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscriptions.write();
        if let Some(count) = subs.get_mut(channel) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                subs.remove(channel);
            }
        }
        debug!(channel = channel, "Unsubscribed");
        Ok(())
    }

    async fn publish(&self, channel: &str, data: Value) -> Result<(), TransportError> {
        debug!(channel = channel, "Client published message");
        self.published.write().push((channel.to_string(), data));
        Ok(())
    }
}
