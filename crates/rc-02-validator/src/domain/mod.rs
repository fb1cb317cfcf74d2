//! # Domain Layer
//!
//! Validation errors and the pure per-value rules. The recursive walk over
//! descriptors lives in [`crate::service`].

pub mod errors;
pub mod rules;

pub use errors::*;
pub use rules::*;
