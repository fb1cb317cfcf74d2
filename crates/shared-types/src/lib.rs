//! # Shared Types Crate
//!
//! Wire shapes, identifiers and error types shared across the client crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every JSON shape exchanged with the request
//!   transport or the push channel is defined here.
//! - **Opaque identifiers**: correlation ids and session tokens are never
//!   interpreted, only compared and echoed back.
//! - **Errors are values**: transport, server and protocol failures are
//!   delivered to callbacks, never thrown into caller code.

pub mod errors;
pub mod ids;
pub mod wire;

pub use errors::*;
pub use ids::{ClientId, CorrelationId, SessionId};
pub use wire::*;
