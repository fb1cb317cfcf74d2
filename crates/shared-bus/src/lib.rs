//! # Shared Bus - Push Channel
//!
//! The client's view of the push transport: a server-to-client delivery path
//! independent of the request/response transport, used to announce request
//! completions and interim status.
//!
//! ```text
//! ┌──────────────┐   subscribe / publish    ┌──────────────┐
//! │   Client     │ ───────────────────────→ │ Push server  │
//! │  (tracker)   │ ←─────────────────────── │              │
//! └──────────────┘   ChannelEvent stream    └──────────────┘
//! ```
//!
//! - [`PushTransport`] is the outbound port (subscribe, unsubscribe, publish).
//! - Inbound traffic (connect events, messages) is a stream of
//!   [`ChannelEvent`]s.
//! - [`InMemoryPushBus`] implements both sides for tests and embedding.
//!
//! Delivery is not guaranteed by this layer.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{ChannelEvent, ConnectEvent, ConnectionState};
pub use publisher::{InMemoryPushBus, PushTransport};
pub use subscriber::{ChannelListener, ListenerError};

/// Maximum events to buffer per listener before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Default prefix of the session-scoped private channel.
pub const PRIVATE_CHANNEL_PREFIX: &str = "/private/";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }

    #[test]
    fn test_private_prefix() {
        assert!(PRIVATE_CHANNEL_PREFIX.starts_with('/'));
        assert!(PRIVATE_CHANNEL_PREFIX.ends_with('/'));
    }
}
