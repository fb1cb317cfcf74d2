//! # Type Registry (rc-01)
//!
//! Runtime descriptions of the types, methods and services an interface
//! schema defines, and the table that resolves names to them.
//!
//! ```text
//! schema document (JSON) ──from_document──→ TypeRegistry ──verify()──→ ready
//!                                               │
//!                     lookup / resolve / resolve_base / method / service
//!                                               ↓
//!                                 Validator, RequestDispatcher
//! ```
//!
//! ## Descriptors
//!
//! | Variant | Carries |
//! |---------|---------|
//! | `Primitive` | bool, byte, i16, i32, i64, double, string, binary, void |
//! | `Custom` | base reference + constraints |
//! | `Container` | list / set / map of type references |
//! | `Struct`, `Exception` | ordered field list |
//! | `Enum` | symbol → ordinal |
//!
//! Methods are an implicit struct over their parameters, plus declared
//! exception fields and a return type.
//!
//! ## Load-time guarantees
//!
//! [`TypeRegistry::verify`] runs as part of loading and rejects dangling
//! references, cyclic custom chains, duplicate field names, unregistered
//! service methods and regex constraints that do not compile.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod document;
pub mod domain;
pub mod registry;
pub mod test_utils;

pub use document::SchemaDocument;
pub use domain::{
    allows_unicode, Constraint, ContainerDescriptor, ContainerKind, CustomDescriptor,
    EnumDescriptor, FieldDescriptor, MethodDescriptor, Pattern, PrimitiveKind, SchemaError,
    ServiceDescriptor, StructDescriptor, TypeDescriptor, TypeRef,
};
pub use registry::{ResolvedType, TypeRegistry};
