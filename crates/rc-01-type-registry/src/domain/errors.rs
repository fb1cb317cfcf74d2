//! # Schema Errors
//!
//! Errors raised while building, loading or querying the registry. These are
//! integration bugs (a document that does not hang together, a lookup for a
//! name nobody registered) rather than bad caller data.

use thiserror::Error;

/// Schema-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// No custom, generated or primitive type has this name.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Struct or method has no field with this name or index.
    #[error("Unknown field '{field}' on {owner}")]
    UnknownField { owner: String, field: String },

    #[error("Unknown method: {service}.{method}")]
    UnknownMethod { service: String, method: String },

    #[error("Unknown service: {0}")]
    UnknownService(String),

    /// A custom type's base chain leads back to itself.
    #[error("Cyclic type chain: {}", chain.join(" -> "))]
    CyclicType { chain: Vec<String> },

    /// A different descriptor is already registered under this name.
    #[error("Duplicate type: {0}")]
    DuplicateType(String),

    /// A regex constraint does not compile.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The schema document is structurally wrong.
    #[error("Invalid schema document: {0}")]
    InvalidDocument(String),
}

impl SchemaError {
    pub fn unknown_field(owner: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            owner: owner.into(),
            field: field.into(),
        }
    }

    pub fn unknown_method(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            service: service.into(),
            method: method.into(),
        }
    }
}
