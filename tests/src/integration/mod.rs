//! Cross-crate integration scenarios.

pub mod fixtures;
pub mod flows;
pub mod validation;
