//! # Constraints
//!
//! Declarative checks attached to custom types and struct fields.
//!
//! | Kind | Applies to | Meaning |
//! |------|------------|---------|
//! | `range` | numeric reading | `low <= v <= high` |
//! | `length` | string chars, array elements, object entries | `low <= len <= high` |
//! | `regex` | textual value | slash-delimited pattern, case-sensitive |
//! | `utf8` | string values | lifts the ASCII-only policy |
//!
//! Absent bounds are unbounded. Unknown kinds are kept so documents
//! round-trip, but never evaluated.

use crate::domain::errors::SchemaError;
use regex::Regex;
use tracing::debug;

/// A regex constraint, compiled once at load.
///
/// Only the `/.../` form is honoured. Anything else is kept for display and
/// treated as always matching.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Option<Regex>,
}

impl Pattern {
    /// Compile a pattern as written in the schema document.
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        let delimited = raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/');
        if !delimited {
            debug!(pattern = raw, "Regex constraint is not slash-delimited, ignoring");
            return Ok(Self {
                source: raw.to_string(),
                compiled: None,
            });
        }

        let body = &raw[1..raw.len() - 1];
        let compiled = Regex::new(body).map_err(|e| SchemaError::InvalidPattern {
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: raw.to_string(),
            compiled: Some(compiled),
        })
    }

    /// Pattern text as written in the document.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the pattern takes part in validation.
    pub fn is_active(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.as_ref().map_or(true, |re| re.is_match(text))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// One declarative constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Range {
        low: Option<f64>,
        high: Option<f64>,
    },
    Length {
        low: Option<usize>,
        high: Option<usize>,
    },
    Regex(Pattern),
    /// Permits code points above U+007F.
    Utf8,
    /// Unrecognised kind, ignored during validation.
    Unknown(String),
}

impl Constraint {
    pub fn range(low: Option<f64>, high: Option<f64>) -> Self {
        Self::Range { low, high }
    }

    pub fn length(low: Option<usize>, high: Option<usize>) -> Self {
        Self::Length { low, high }
    }

    pub fn regex(raw: &str) -> Result<Self, SchemaError> {
        Pattern::parse(raw).map(Self::Regex)
    }

    /// Kind tag as it appears in the document.
    pub fn kind(&self) -> &str {
        match self {
            Self::Range { .. } => "range",
            Self::Length { .. } => "length",
            Self::Regex(_) => "regex",
            Self::Utf8 => "utf8",
            Self::Unknown(kind) => kind,
        }
    }
}

/// Whether a constraint list lifts the ASCII-only policy.
pub fn allows_unicode(constraints: &[Constraint]) -> bool {
    constraints.iter().any(|c| matches!(c, Constraint::Utf8))
}
