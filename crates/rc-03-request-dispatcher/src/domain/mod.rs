//! # Domain Layer
//!
//! Envelopes, session state, the pending registry and callback delivery.

pub mod callbacks;
pub mod envelope;
pub mod pending;
pub mod session;

pub use callbacks::{deliver_error, deliver_status, deliver_success};
pub use envelope::*;
pub use pending::*;
pub use session::*;
