//! # Value Rules
//!
//! Checks on a single JSON value against a primitive kind or a constraint.
//! Nothing here recurses or touches the registry.

use crate::domain::errors::ValidationError;
use rc_01_type_registry::{Constraint, EnumDescriptor, PrimitiveKind};
use serde_json::Value;

/// JSON kind name used in mismatch messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Textual form of a scalar, as used by integral and regex checks.
///
/// Whole-valued floats print without a fractional part.
pub fn textual(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some(n.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 {
                        format!("{:.0}", f)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Numeric reading of a number or numeric string.
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// `^-?\d+$` over ASCII digits.
pub fn is_integer_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Check a value against a primitive kind.
pub fn check_primitive(kind: PrimitiveKind, value: &Value) -> Result<(), ValidationError> {
    if value.is_null() {
        return match kind {
            PrimitiveKind::Void => Ok(()),
            _ => Err(ValidationError::NullValue),
        };
    }

    match kind {
        PrimitiveKind::Bool => match value {
            Value::Bool(_) => Ok(()),
            other => Err(ValidationError::type_mismatch("bool", json_kind(other))),
        },
        PrimitiveKind::Byte | PrimitiveKind::I16 | PrimitiveKind::I32 | PrimitiveKind::I64 => {
            check_integral(kind, value)
        }
        PrimitiveKind::Double => match numeric(value) {
            Some(_) => Ok(()),
            None => Err(ValidationError::type_mismatch("double", json_kind(value))),
        },
        PrimitiveKind::String => Ok(()),
        PrimitiveKind::Binary => match value {
            Value::String(_) => Ok(()),
            other => Err(ValidationError::type_mismatch("binary", json_kind(other))),
        },
        PrimitiveKind::Void => Err(ValidationError::type_mismatch("void", json_kind(value))),
    }
}

fn check_integral(kind: PrimitiveKind, value: &Value) -> Result<(), ValidationError> {
    let text = match value {
        Value::Number(_) | Value::String(_) => textual(value),
        _ => None,
    }
    .filter(|t| is_integer_text(t))
    .ok_or_else(|| ValidationError::type_mismatch(kind.name(), json_kind(value)))?;

    let Some(max) = kind.max_magnitude() else {
        return Ok(());
    };

    let digits = text.trim_start_matches('-').trim_start_matches('0');
    let magnitude = if digits.len() > 20 {
        None
    } else if digits.is_empty() {
        Some(0)
    } else {
        digits.parse::<u128>().ok()
    };

    match magnitude {
        Some(m) if m <= u128::from(max) => Ok(()),
        _ => Err(ValidationError::out_of_range(
            text,
            format!("{} magnitude above {}", kind.name(), max),
        )),
    }
}

/// Check an enum value: a number or integer string equal to a declared ordinal.
pub fn check_enum(descriptor: &EnumDescriptor, value: &Value) -> Result<(), ValidationError> {
    let ordinal = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if is_integer_text(s) => s.parse::<i64>().ok(),
        _ => None,
    };

    match ordinal {
        Some(o) if descriptor.contains_ordinal(o) => Ok(()),
        _ => Err(ValidationError::UnknownEnumValue {
            enum_name: descriptor.name.clone(),
            value: textual(value).unwrap_or_else(|| json_kind(value).to_string()),
        }),
    }
}

/// Evaluate one constraint. `utf8` and unknown kinds never fail here.
pub fn check_constraint(constraint: &Constraint, value: &Value) -> Result<(), ValidationError> {
    match constraint {
        Constraint::Range { low, high } => {
            let shown = || textual(value).unwrap_or_else(|| json_kind(value).to_string());
            let n = numeric(value)
                .ok_or_else(|| ValidationError::out_of_range(shown(), "not numeric"))?;
            if let Some(low) = low {
                if n < *low {
                    return Err(ValidationError::out_of_range(shown(), format!("below {}", low)));
                }
            }
            if let Some(high) = high {
                if n > *high {
                    return Err(ValidationError::out_of_range(shown(), format!("above {}", high)));
                }
            }
            Ok(())
        }
        Constraint::Length { low, high } => {
            let length = match value {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(entries) => entries.len(),
                _ => return Ok(()),
            };
            if let Some(min) = low {
                if length < *min {
                    return Err(ValidationError::TooShort { length, min: *min });
                }
            }
            if let Some(max) = high {
                if length > *max {
                    return Err(ValidationError::TooLong { length, max: *max });
                }
            }
            Ok(())
        }
        Constraint::Regex(pattern) => match textual(value) {
            Some(text) if !pattern.is_match(&text) => Err(ValidationError::PatternMismatch {
                pattern: pattern.source().to_string(),
            }),
            _ => Ok(()),
        },
        Constraint::Utf8 | Constraint::Unknown(_) => Ok(()),
    }
}

/// ASCII-only policy for string values.
pub fn check_ascii(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::String(s) if !s.is_ascii() => Err(ValidationError::NonAscii),
        _ => Ok(()),
    }
}
