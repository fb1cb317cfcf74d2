//! # Domain Layer
//!
//! Descriptors, constraints and schema errors. No I/O.

pub mod constraints;
pub mod descriptors;
pub mod errors;

pub use constraints::*;
pub use descriptors::*;
pub use errors::*;
