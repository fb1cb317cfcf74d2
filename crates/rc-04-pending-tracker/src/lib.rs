//! # Pending Request Tracker
//!
//! Completes requests that the dispatcher left pending, from two sources:
//!
//! | Source | Trigger | Acknowledged |
//! |--------|---------|--------------|
//! | Push | `requests_completed` on the private channel | yes, once per notification |
//! | Poll | [`PendingRequestTracker::reconcile`] | no |
//!
//! Both sources remove the id from the session's registry before any
//! callback runs, so each request completes at most once.
//!
//! ## Channel lifecycle
//!
//! The tracker subscribes to `<prefix><session-id>` on the first successful
//! connect. A connect with a different transport identity means the server
//! forgot the subscription: the tracker resubscribes and publishes
//! `requests_status` with every outstanding id.

#![warn(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod service;

pub use domain::{ChannelState, CompletionRecord, ConnectOutcome, MessageOutcome, TrackerConfig};
pub use service::PendingRequestTracker;
