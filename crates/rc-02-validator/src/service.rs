//! # Validator Service
//!
//! Recursive validation of JSON values against registry descriptors.
//!
//! Every `validate*` call returns the verdict as a boolean and records the
//! failure (or clears it on success) in a per-instance slot readable with
//! [`Validator::last_error`]. The `check*` forms return the failure directly.
//! Schema problems are never folded into the verdict.

use crate::domain::{
    check_ascii, check_constraint, check_enum, check_primitive, json_kind, ValidationError,
    ValidationFailure,
};
use parking_lot::Mutex;
use rc_01_type_registry::{
    allows_unicode, Constraint, ContainerKind, FieldDescriptor, MethodDescriptor, PrimitiveKind,
    SchemaError, StructDescriptor, TypeDescriptor, TypeRef, TypeRegistry,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

type CheckResult = Result<(), ValidationFailure>;

/// Schema validator bound to one registry.
pub struct Validator {
    registry: Arc<TypeRegistry>,
    last_error: Mutex<Option<ValidationFailure>>,
}

impl Validator {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            last_error: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Failure recorded by the most recent `validate*` call, if it failed.
    pub fn last_error(&self) -> Option<ValidationFailure> {
        self.last_error.lock().clone()
    }

    fn record(&self, result: CheckResult) -> Result<bool, SchemaError> {
        match result {
            Ok(()) => {
                *self.last_error.lock() = None;
                Ok(true)
            }
            Err(ValidationFailure::Schema(e)) => Err(e),
            Err(failure) => {
                debug!(reason = %failure, "Validation failed");
                *self.last_error.lock() = Some(failure);
                Ok(false)
            }
        }
    }

    // =========================================================================
    // VERDICT API
    // =========================================================================

    pub fn validate(&self, descriptor: &TypeDescriptor, value: &Value) -> Result<bool, SchemaError> {
        self.record(self.check(descriptor, value))
    }

    pub fn validate_ref(&self, type_ref: &TypeRef, value: &Value) -> Result<bool, SchemaError> {
        self.record(self.check_ref(type_ref, value))
    }

    pub fn validate_type(&self, name: &str, value: &Value) -> Result<bool, SchemaError> {
        self.record(self.check_type(name, value))
    }

    pub fn validate_field(
        &self,
        field: &FieldDescriptor,
        value: Option<&Value>,
    ) -> Result<bool, SchemaError> {
        self.record(self.check_field(field, value))
    }

    pub fn validate_params(
        &self,
        method: &MethodDescriptor,
        params: &Value,
    ) -> Result<bool, SchemaError> {
        self.record(self.check_params(method, params))
    }

    /// Look the method up, then [`validate_params`](Self::validate_params).
    pub fn validate_call(
        &self,
        service: &str,
        method: &str,
        params: &Value,
    ) -> Result<bool, SchemaError> {
        self.record(self.check_call(service, method, params))
    }

    pub fn validate_result(
        &self,
        method: &MethodDescriptor,
        value: &Value,
    ) -> Result<bool, SchemaError> {
        self.record(self.check_result(method, value))
    }

    pub fn validate_exception(
        &self,
        method: &MethodDescriptor,
        field: &str,
        value: &Value,
    ) -> Result<bool, SchemaError> {
        self.record(self.check_exception(method, field, value))
    }

    // =========================================================================
    // CHECK API
    // =========================================================================

    pub fn check(&self, descriptor: &TypeDescriptor, value: &Value) -> CheckResult {
        self.check_value(descriptor, value, &descriptor.name(), &[])
    }

    pub fn check_ref(&self, type_ref: &TypeRef, value: &Value) -> CheckResult {
        let descriptor = self.registry.resolve(type_ref)?;
        self.check_value(&descriptor, value, &type_ref.to_string(), &[])
    }

    pub fn check_type(&self, name: &str, value: &Value) -> CheckResult {
        let descriptor = self.registry.lookup(name)?;
        self.check_value(descriptor, value, name, &[])
    }

    /// Check a field value; `None` means the key is absent.
    pub fn check_field(&self, field: &FieldDescriptor, value: Option<&Value>) -> CheckResult {
        self.check_member(field, value, &field.name)
    }

    /// Params are checked as a struct over the method's parameter fields.
    pub fn check_params(&self, method: &MethodDescriptor, params: &Value) -> CheckResult {
        self.check_struct(&method.params, params, method.qualified_name())
    }

    pub fn check_call(&self, service: &str, method: &str, params: &Value) -> CheckResult {
        let descriptor = self.registry.method(service, method)?;
        self.check_params(descriptor, params)
    }

    /// `void` returns accept only null.
    pub fn check_result(&self, method: &MethodDescriptor, value: &Value) -> CheckResult {
        let descriptor = self.registry.resolve(&method.returns)?;
        let path = format!("{}.<return>", method.qualified_name());
        self.check_value(&descriptor, value, &path, &[])
    }

    /// Check the payload of the exception declared under `field`.
    pub fn check_exception(
        &self,
        method: &MethodDescriptor,
        field: &str,
        value: &Value,
    ) -> CheckResult {
        let declared = method.exception(field)?;
        let descriptor = self.registry.resolve(&declared.type_ref)?;
        let path = format!("{}.<{}>", method.qualified_name(), field);
        self.check_value(&descriptor, value, &path, &declared.constraints)
    }

    // =========================================================================
    // RECURSIVE WALK
    // =========================================================================

    /// Validate against the resolved base, then the effective constraint list
    /// (`leading` first, then the custom chain's), then the ASCII policy.
    fn check_value(
        &self,
        descriptor: &TypeDescriptor,
        value: &Value,
        path: &str,
        leading: &[Constraint],
    ) -> CheckResult {
        let resolved = self.registry.resolve_base(descriptor)?;
        let base = resolved.base.as_ref();

        self.check_base(base, value, path)?;

        let effective: Vec<Constraint> = leading
            .iter()
            .chain(resolved.constraints.iter())
            .cloned()
            .collect();
        for constraint in &effective {
            check_constraint(constraint, value).map_err(|e| ValidationFailure::invalid(path, e))?;
        }

        if matches!(base, TypeDescriptor::Primitive(PrimitiveKind::String))
            && !allows_unicode(&effective)
        {
            check_ascii(value).map_err(|e| ValidationFailure::invalid(path, e))?;
        }
        Ok(())
    }

    fn check_base(&self, base: &TypeDescriptor, value: &Value, path: &str) -> CheckResult {
        match base {
            TypeDescriptor::Primitive(kind) => {
                check_primitive(*kind, value).map_err(|e| ValidationFailure::invalid(path, e))
            }
            TypeDescriptor::Enum(e) => {
                check_enum(e, value).map_err(|err| ValidationFailure::invalid(path, err))
            }
            TypeDescriptor::Struct(s) | TypeDescriptor::Exception(s) => {
                self.check_struct(s, value, path)
            }
            TypeDescriptor::Container(container) => {
                let value_type = self.registry.resolve(&container.value)?;
                match (container.kind, value) {
                    (_, Value::Null) => Err(ValidationFailure::invalid(path, ValidationError::NullValue)),
                    (ContainerKind::List | ContainerKind::Set, Value::Array(items)) => {
                        for (i, item) in items.iter().enumerate() {
                            self.check_value(&value_type, item, &format!("{}[{}]", path, i), &[])?;
                        }
                        Ok(())
                    }
                    (ContainerKind::Map, Value::Object(entries)) => {
                        let key_ref = container
                            .key
                            .clone()
                            .unwrap_or_else(|| TypeRef::named(PrimitiveKind::String.name()));
                        let key_type = self.registry.resolve(&key_ref)?;
                        for (key, item) in entries {
                            let entry_path = format!("{}{{{}}}", path, key);
                            self.check_value(&key_type, &Value::String(key.clone()), &entry_path, &[])?;
                            self.check_value(&value_type, item, &entry_path, &[])?;
                        }
                        Ok(())
                    }
                    (ContainerKind::Map, other) => Err(ValidationFailure::invalid(
                        path,
                        ValidationError::type_mismatch("map", json_kind(other)),
                    )),
                    (_, other) => Err(ValidationFailure::invalid(
                        path,
                        ValidationError::type_mismatch("list", json_kind(other)),
                    )),
                }
            }
            // resolve_base never yields a custom descriptor
            TypeDescriptor::Custom(_) => Ok(()),
        }
    }

    fn check_struct(&self, descriptor: &StructDescriptor, value: &Value, path: &str) -> CheckResult {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Err(ValidationFailure::invalid(path, ValidationError::NullValue)),
            other => {
                return Err(ValidationFailure::invalid(
                    path,
                    ValidationError::type_mismatch(descriptor.name.clone(), json_kind(other)),
                ))
            }
        };

        let mut remaining = object.clone();
        for field in descriptor.fields() {
            let member = remaining.remove(&field.name);
            let field_path = format!("{}.{}", path, field.name);
            self.check_member(field, member.as_ref(), &field_path)?;
        }

        if !remaining.is_empty() {
            let mut extras: Vec<String> = remaining.keys().cloned().collect();
            extras.sort();
            return Err(ValidationFailure::invalid(
                path,
                ValidationError::UnexpectedFields(extras),
            ));
        }
        Ok(())
    }

    /// Missing means absent, null, or the empty string for a string field.
    fn check_member(&self, field: &FieldDescriptor, value: Option<&Value>, path: &str) -> CheckResult {
        let descriptor = self.registry.resolve(&field.type_ref)?;

        let missing = match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) if s.is_empty() => self.registry.is_string_like(&descriptor)?,
            Some(_) => false,
        };

        match value {
            _ if missing && field.optional => Ok(()),
            _ if missing => Err(ValidationFailure::invalid(
                path,
                ValidationError::MissingRequiredField(field.name.clone()),
            )),
            Some(present) => self.check_value(&descriptor, present, path, &field.constraints),
            None => Ok(()),
        }
    }
}
