//! # Validator (rc-02)
//!
//! Checks caller-supplied JSON values against the descriptors held by a
//! [`TypeRegistry`](rc_01_type_registry::TypeRegistry).
//!
//! ## Rules
//!
//! | Descriptor | Accepts |
//! |------------|---------|
//! | `bool` | `true` / `false` only |
//! | `byte`, `i16`, `i32`, `i64` | number or string matching `^-?\d+$`, magnitude within bound |
//! | `double` | number or numeric string |
//! | `string`, `binary` | any string (`string` is ASCII-only unless `utf8`) |
//! | `void` | null |
//! | custom | base rules, then constraints in order |
//! | list / set / map | array / object, every element and key checked |
//! | struct / exception | object, declared fields only |
//! | enum | a declared ordinal |
//!
//! The first failure short-circuits. Struct fields that are absent, null, or
//! (for string fields) empty are missing; a missing required field fails.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod domain;
pub mod service;

pub use domain::{ValidationError, ValidationFailure};
pub use service::Validator;
