//! # Channel Events
//!
//! Events surfaced by the push transport to the client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::ClientId;

/// Connection state reported with a connect event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Meta event emitted by the push transport after each connect attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectEvent {
    /// Whether the attempt succeeded.
    pub successful: bool,
    /// Resulting connection state.
    pub state: ConnectionState,
    /// Identity assigned by the transport for this connection.
    pub client_id: ClientId,
}

impl ConnectEvent {
    /// A successful connect with the given client identity.
    pub fn connected(client_id: impl Into<String>) -> Self {
        Self {
            successful: true,
            state: ConnectionState::Connected,
            client_id: ClientId::new(client_id),
        }
    }

    /// A failed connect attempt.
    pub fn failed(client_id: impl Into<String>) -> Self {
        Self {
            successful: false,
            state: ConnectionState::Disconnected,
            client_id: ClientId::new(client_id),
        }
    }

    /// Only successful, connected-state events can (re)establish a subscription.
    pub fn is_established(&self) -> bool {
        self.successful && self.state == ConnectionState::Connected
    }
}

/// Everything the push transport can deliver to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Connect meta event.
    Connect(ConnectEvent),
    /// The transport dropped the connection.
    Disconnected,
    /// A message published on a channel the client subscribed to.
    Message { channel: String, data: Value },
}

impl ChannelEvent {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Disconnected => "disconnected",
            Self::Message { .. } => "message",
        }
    }
}
