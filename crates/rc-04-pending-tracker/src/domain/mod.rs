//! # Domain Layer
//!
//! Subscription state, completion records and tracker settings.

pub mod channel;
pub mod completion;
pub mod config;

pub use channel::{ChannelState, ConnectOutcome};
pub use completion::{CompletionRecord, MessageOutcome};
pub use config::TrackerConfig;
