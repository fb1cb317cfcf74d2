//! # Channel Lifecycle
//!
//! Tracks which private channel the client holds and for which transport
//! identity.
//!
//! ```text
//! connect(ok, id)       no subscription         → Subscribed
//! connect(ok, same id)  same channel            → Unchanged
//! connect(ok, new id)   stale subscription      → Resubscribed
//! connect(failed)                               → Ignored
//! disconnect                                    → state reset
//! ```

use shared_bus::ConnectEvent;
use shared_types::ClientId;

/// What a connect event did to the subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Not a successful connect, or no session to subscribe for.
    Ignored,
    /// Same identity and channel as before.
    Unchanged,
    /// First subscription since start or since the last disconnect.
    Subscribed { channel: String },
    /// Identity changed; the stale subscription was replaced.
    Resubscribed { stale: String, channel: String },
}

impl ConnectOutcome {
    /// Whether a subscription was (re)established.
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Subscribed { .. } | Self::Resubscribed { .. })
    }
}

/// Current subscription state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelState {
    client_id: Option<ClientId>,
    channel: Option<String>,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what `event` requires, for a session whose channel is `channel`.
    pub fn plan(&self, event: &ConnectEvent, channel: &str) -> ConnectOutcome {
        if !event.is_established() {
            return ConnectOutcome::Ignored;
        }
        let same_identity = self.client_id.as_ref() == Some(&event.client_id);
        match &self.channel {
            Some(current) if same_identity && current == channel => ConnectOutcome::Unchanged,
            Some(stale) => ConnectOutcome::Resubscribed {
                stale: stale.clone(),
                channel: channel.to_string(),
            },
            None => ConnectOutcome::Subscribed {
                channel: channel.to_string(),
            },
        }
    }

    /// Record an established subscription.
    pub fn established(&mut self, client_id: ClientId, channel: String) {
        self.client_id = Some(client_id);
        self.channel = Some(channel);
    }

    /// Forget the subscription. Returns the channel that was held.
    pub fn reset(&mut self) -> Option<String> {
        self.client_id = None;
        self.channel.take()
    }

    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }
}
