//! # Validation Errors

use rc_01_type_registry::SchemaError;
use thiserror::Error;

/// Why a value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingRequiredField(String),

    /// Keys present in the value but not declared, sorted.
    #[error("unexpected fields: {}", .0.join(", "))]
    UnexpectedFields(Vec<String>),

    #[error("value {value} out of range ({reason})")]
    OutOfRange { value: String, reason: String },

    #[error("length {length} below minimum {min}")]
    TooShort { length: usize, min: usize },

    #[error("length {length} above maximum {max}")]
    TooLong { length: usize, max: usize },

    #[error("value does not match {pattern}")]
    PatternMismatch { pattern: String },

    #[error("non-ASCII characters not allowed")]
    NonAscii,

    #[error("{value} is not a value of enum {enum_name}")]
    UnknownEnumValue { enum_name: String, value: String },

    #[error("null value")]
    NullValue,

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

impl ValidationError {
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn out_of_range(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Result of a `check*` call that did not pass.
///
/// `Invalid` is a verdict on the value; `Schema` means the schema itself
/// could not be used (unknown or cyclic type).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("{path}: {error}")]
    Invalid {
        /// Where in the value the failure was found, e.g. `account.id`.
        path: String,
        error: ValidationError,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ValidationFailure {
    pub fn invalid(path: impl Into<String>, error: ValidationError) -> Self {
        Self::Invalid {
            path: path.into(),
            error,
        }
    }

    /// The validation verdict, if this is one.
    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Invalid { error, .. } => Some(error),
            Self::Schema(_) => None,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Invalid { path, .. } => Some(path),
            Self::Schema(_) => None,
        }
    }
}
