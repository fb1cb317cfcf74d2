//! # Ports
//!
//! Outbound traits implemented by transports and diagnostic sinks.

pub mod outbound;

pub use outbound::*;
