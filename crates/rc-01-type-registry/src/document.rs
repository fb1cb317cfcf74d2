//! # Schema Document
//!
//! The IDL compiler's output, already resolved, as JSON:
//!
//! ```json
//! {
//!   "types":    [{"name": "account_id", "type": "i32",
//!                 "validateSpec": [{"type": "range", "low": "1", "high": "10000"}]}],
//!   "enums":    [{"name": "Color", "values": {"RED": 1, "BLUE": 4}}],
//!   "structs":  [{"name": "account", "exception": false, "fields": [
//!                 {"index": 1, "name": "id", "optional": false, "type": "account_id"}]}],
//!   "services": [{"name": "Accounts", "methods": [
//!                 {"name": "getAccount", "fields": [], "exceptions": [], "returns": "account"}]}]
//! }
//! ```
//!
//! Type references are names, or `{"type": "list"|"set", "valType": T}` /
//! `{"type": "map", "keyType": K, "valType": V}`. Numeric bounds and field
//! indexes may be written as numbers or numeric strings.

use crate::domain::{
    Constraint, CustomDescriptor, EnumDescriptor, FieldDescriptor, MethodDescriptor,
    SchemaError, ServiceDescriptor, StructDescriptor, TypeDescriptor, TypeRef,
};
use crate::registry::TypeRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Root of a schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub types: Vec<CustomTypeDef>,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub services: Vec<ServiceDef>,
}

impl SchemaDocument {
    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(raw).map_err(|e| SchemaError::InvalidDocument(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SchemaError::InvalidDocument(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTypeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub base: TypeRefDef,
    #[serde(rename = "validateSpec", default)]
    pub validate_spec: Vec<ConstraintDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub values: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    #[serde(default)]
    pub exception: bool,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub index: NumericDef,
    pub name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(rename = "type")]
    pub type_ref: TypeRefDef,
    #[serde(rename = "validateSpec", default)]
    pub validate_spec: Vec<ConstraintDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDef {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub exceptions: Vec<FieldDef>,
    #[serde(default = "void_ref")]
    pub returns: TypeRefDef,
}

fn void_ref() -> TypeRefDef {
    TypeRefDef::Name("void".to_string())
}

/// A type reference as written in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeRefDef {
    Name(String),
    Container {
        #[serde(rename = "type")]
        kind: String,
        #[serde(rename = "keyType", default, skip_serializing_if = "Option::is_none")]
        key_type: Option<Box<TypeRefDef>>,
        #[serde(rename = "valType")]
        val_type: Box<TypeRefDef>,
    },
}

/// A number that may be written as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericDef {
    Number(f64),
    Text(String),
}

impl NumericDef {
    /// Numeric reading; an empty string means "no value".
    fn as_f64(&self) -> Result<Option<f64>, SchemaError> {
        match self {
            Self::Number(n) => Ok(Some(*n)),
            Self::Text(text) if text.trim().is_empty() => Ok(None),
            Self::Text(text) => text.trim().parse::<f64>().map(Some).map_err(|_| {
                SchemaError::InvalidDocument(format!("'{}' is not a number", text))
            }),
        }
    }
}

/// One `validateSpec` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<NumericDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<NumericDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

// =============================================================================
// CONVERSION
// =============================================================================

impl TypeRefDef {
    pub fn to_type_ref(&self) -> Result<TypeRef, SchemaError> {
        match self {
            Self::Name(name) => Ok(TypeRef::named(name.clone())),
            Self::Container {
                kind,
                key_type,
                val_type,
            } => {
                let value = val_type.to_type_ref()?;
                match kind.as_str() {
                    "list" => Ok(TypeRef::list(value)),
                    "set" => Ok(TypeRef::set(value)),
                    "map" => {
                        let key = key_type.as_ref().ok_or_else(|| {
                            SchemaError::InvalidDocument("map reference without keyType".into())
                        })?;
                        Ok(TypeRef::map(key.to_type_ref()?, value))
                    }
                    other => Err(SchemaError::InvalidDocument(format!(
                        "unknown container kind '{}'",
                        other
                    ))),
                }
            }
        }
    }
}

impl ConstraintDef {
    pub fn to_constraint(&self) -> Result<Constraint, SchemaError> {
        match self.kind.as_str() {
            "range" => Ok(Constraint::range(
                bound(&self.low)?,
                bound(&self.high)?,
            )),
            "length" => Ok(Constraint::length(
                length_bound(&self.low)?,
                length_bound(&self.high)?,
            )),
            "regex" => {
                let pattern = self.pattern.as_deref().ok_or_else(|| {
                    SchemaError::InvalidDocument("regex constraint without pattern".into())
                })?;
                Constraint::regex(pattern)
            }
            "utf8" => Ok(Constraint::Utf8),
            other => Ok(Constraint::Unknown(other.to_string())),
        }
    }
}

fn bound(value: &Option<NumericDef>) -> Result<Option<f64>, SchemaError> {
    match value {
        Some(n) => n.as_f64(),
        None => Ok(None),
    }
}

fn length_bound(value: &Option<NumericDef>) -> Result<Option<usize>, SchemaError> {
    match bound(value)? {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(Some(n as usize)),
        Some(n) => Err(SchemaError::InvalidDocument(format!(
            "length bound {} is not a non-negative integer",
            n
        ))),
        None => Ok(None),
    }
}

fn constraints(defs: &[ConstraintDef]) -> Result<Vec<Constraint>, SchemaError> {
    defs.iter().map(ConstraintDef::to_constraint).collect()
}

impl FieldDef {
    pub fn to_field(&self) -> Result<FieldDescriptor, SchemaError> {
        let index = match self.index.as_f64()? {
            Some(n) if n >= 1.0 && n.fract() == 0.0 && n <= f64::from(u16::MAX) => n as u16,
            _ => {
                return Err(SchemaError::InvalidDocument(format!(
                    "field '{}' has invalid index {:?}",
                    self.name, self.index
                )))
            }
        };
        Ok(FieldDescriptor {
            index,
            name: self.name.clone(),
            optional: self.optional,
            type_ref: self.type_ref.to_type_ref()?,
            constraints: constraints(&self.validate_spec)?,
        })
    }
}

fn fields(defs: &[FieldDef]) -> Result<Vec<FieldDescriptor>, SchemaError> {
    defs.iter().map(FieldDef::to_field).collect()
}

// =============================================================================
// LOADING
// =============================================================================

impl TypeRegistry {
    /// Build a registry from a schema document and verify it.
    pub fn from_document(document: &SchemaDocument) -> Result<Self, SchemaError> {
        let mut registry = Self::new();

        for def in &document.types {
            registry.register_type(
                def.name.clone(),
                TypeDescriptor::Custom(CustomDescriptor {
                    name: def.name.clone(),
                    base: def.base.to_type_ref()?,
                    constraints: constraints(&def.validate_spec)?,
                }),
            )?;
        }

        for def in &document.enums {
            registry.register_type(
                def.name.clone(),
                TypeDescriptor::Enum(EnumDescriptor::new(def.name.clone(), def.values.clone())),
            )?;
        }

        for def in &document.structs {
            let descriptor = StructDescriptor::new(def.name.clone(), fields(&def.fields)?);
            let descriptor = if def.exception {
                TypeDescriptor::Exception(descriptor)
            } else {
                TypeDescriptor::Struct(descriptor)
            };
            registry.register_type(def.name.clone(), descriptor)?;
        }

        for service in &document.services {
            for method in &service.methods {
                registry.register_method(MethodDescriptor::new(
                    service.name.clone(),
                    method.name.clone(),
                    fields(&method.fields)?,
                    fields(&method.exceptions)?,
                    method.returns.to_type_ref()?,
                ))?;
            }
            registry.register_service(ServiceDescriptor::new(
                service.name.clone(),
                service.methods.iter().map(|m| m.name.clone()).collect(),
            ))?;
        }

        registry.verify()?;
        info!(
            types = registry.type_count(),
            methods = registry.method_count(),
            "Schema document loaded"
        );
        Ok(registry)
    }

    /// Parse and load a JSON schema document.
    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        Self::from_document(&SchemaDocument::from_json_str(raw)?)
    }
}
