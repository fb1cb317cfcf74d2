//! # Type Descriptors
//!
//! Immutable runtime descriptions of schema types. Every descriptor is one
//! tagged variant of [`TypeDescriptor`]; capabilities are answered by
//! matching on the tag rather than by a type hierarchy.

use crate::domain::constraints::Constraint;
use crate::domain::errors::SchemaError;
use std::collections::BTreeMap;
use std::fmt;

/// Built-in scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Void,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 9] = [
        Self::Bool,
        Self::Byte,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::Double,
        Self::String,
        Self::Binary,
        Self::Void,
    ];

    /// Schema name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Double => "double",
            Self::String => "string",
            Self::Binary => "binary",
            Self::Void => "void",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Largest absolute value an integral kind accepts.
    ///
    /// The bound itself is accepted, so `i16` takes `-32768..=32768`.
    pub fn max_magnitude(&self) -> Option<u64> {
        match self {
            Self::Byte => Some(1 << 7),
            Self::I16 => Some(1 << 15),
            Self::I32 => Some(1 << 31),
            Self::I64 => Some(1 << 63),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        self.max_magnitude().is_some()
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a type: a name, or an inline container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    Set(Box<TypeRef>),
    Map {
        key: Box<TypeRef>,
        value: Box<TypeRef>,
    },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn list(value: TypeRef) -> Self {
        Self::List(Box::new(value))
    }

    pub fn set(value: TypeRef) -> Self {
        Self::Set(Box::new(value))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Every type name this reference mentions, depth first.
    pub fn referenced_names(&self) -> Vec<&str> {
        match self {
            Self::Named(name) => vec![name.as_str()],
            Self::List(value) | Self::Set(value) => value.referenced_names(),
            Self::Map { key, value } => {
                let mut names = key.referenced_names();
                names.extend(value.referenced_names());
                names
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(value) => write!(f, "list<{}>", value),
            Self::Set(value) => write!(f, "set<{}>", value),
            Self::Map { key, value } => write!(f, "map<{},{}>", key, value),
        }
    }
}

/// Custom type: a named base plus constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomDescriptor {
    pub name: String,
    pub base: TypeRef,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    List,
    Set,
    Map,
}

/// Container descriptor. Only maps carry a key type.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerDescriptor {
    pub kind: ContainerKind,
    pub key: Option<TypeRef>,
    pub value: TypeRef,
}

impl ContainerDescriptor {
    /// Descriptor for an inline container reference; `None` for names.
    pub fn from_ref(type_ref: &TypeRef) -> Option<Self> {
        match type_ref {
            TypeRef::Named(_) => None,
            TypeRef::List(value) => Some(Self {
                kind: ContainerKind::List,
                key: None,
                value: (**value).clone(),
            }),
            TypeRef::Set(value) => Some(Self {
                kind: ContainerKind::Set,
                key: None,
                value: (**value).clone(),
            }),
            TypeRef::Map { key, value } => Some(Self {
                kind: ContainerKind::Map,
                key: Some((**key).clone()),
                value: (**value).clone(),
            }),
        }
    }

    pub fn to_ref(&self) -> TypeRef {
        match self.kind {
            ContainerKind::List => TypeRef::list(self.value.clone()),
            ContainerKind::Set => TypeRef::set(self.value.clone()),
            ContainerKind::Map => TypeRef::map(
                self.key
                    .clone()
                    .unwrap_or_else(|| TypeRef::named(PrimitiveKind::String.name())),
                self.value.clone(),
            ),
        }
    }
}

/// A struct field or method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// 1-based position.
    pub index: u16,
    pub name: String,
    pub optional: bool,
    pub type_ref: TypeRef,
    /// Field-level constraints, applied before the referenced type's own.
    pub constraints: Vec<Constraint>,
}

impl FieldDescriptor {
    pub fn new(index: u16, name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            index,
            name: name.into(),
            optional: false,
            type_ref,
            constraints: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Ordered field list shared by structs, exceptions and method params.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDescriptor {
    pub name: String,
    fields: Vec<FieldDescriptor>,
}

impl StructDescriptor {
    /// Fields are kept in index order.
    pub fn new(name: impl Into<String>, mut fields: Vec<FieldDescriptor>) -> Self {
        fields.sort_by_key(|f| f.index);
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Result<&FieldDescriptor, SchemaError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SchemaError::unknown_field(&self.name, name))
    }

    pub fn field_at(&self, index: u16) -> Result<&FieldDescriptor, SchemaError> {
        self.fields
            .iter()
            .find(|f| f.index == index)
            .ok_or_else(|| SchemaError::unknown_field(&self.name, format!("#{}", index)))
    }
}

/// Enumeration: symbolic name to ordinal. Ordinals need not be contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    pub name: String,
    pub values: BTreeMap<String, i64>,
}

impl EnumDescriptor {
    pub fn new(name: impl Into<String>, values: BTreeMap<String, i64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn contains_ordinal(&self, ordinal: i64) -> bool {
        self.values.values().any(|v| *v == ordinal)
    }

    pub fn ordinal_of(&self, symbol: &str) -> Option<i64> {
        self.values.get(symbol).copied()
    }
}

/// A schema type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Custom(CustomDescriptor),
    Container(ContainerDescriptor),
    Struct(StructDescriptor),
    /// A struct that may be raised as a method error.
    Exception(StructDescriptor),
    Enum(EnumDescriptor),
}

impl TypeDescriptor {
    /// Name the descriptor is known by.
    pub fn name(&self) -> String {
        match self {
            Self::Primitive(kind) => kind.name().to_string(),
            Self::Custom(custom) => custom.name.clone(),
            Self::Container(container) => container.to_ref().to_string(),
            Self::Struct(s) | Self::Exception(s) => s.name.clone(),
            Self::Enum(e) => e.name.clone(),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Integral primitive. Use the registry to see through custom chains.
    pub fn is_integral(&self) -> bool {
        matches!(self, Self::Primitive(kind) if kind.is_integral())
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception(_))
    }

    /// Field list for structs and exceptions.
    pub fn as_struct(&self) -> Option<&StructDescriptor> {
        match self {
            Self::Struct(s) | Self::Exception(s) => Some(s),
            _ => None,
        }
    }

    /// Type names this descriptor refers to directly.
    pub fn referenced_names(&self) -> Vec<&str> {
        match self {
            Self::Primitive(_) | Self::Enum(_) => Vec::new(),
            Self::Custom(custom) => custom.base.referenced_names(),
            Self::Container(container) => {
                let mut names = container
                    .key
                    .as_ref()
                    .map(TypeRef::referenced_names)
                    .unwrap_or_default();
                names.extend(container.value.referenced_names());
                names
            }
            Self::Struct(s) | Self::Exception(s) => s
                .fields()
                .iter()
                .flat_map(|f| f.type_ref.referenced_names())
                .collect(),
        }
    }
}

/// A remote method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub service: String,
    pub name: String,
    /// Parameters, as an implicit struct.
    pub params: StructDescriptor,
    /// Declared exceptions, keyed by the field they are raised under.
    pub exceptions: Vec<FieldDescriptor>,
    pub returns: TypeRef,
}

impl MethodDescriptor {
    pub fn new(
        service: impl Into<String>,
        name: impl Into<String>,
        params: Vec<FieldDescriptor>,
        exceptions: Vec<FieldDescriptor>,
        returns: TypeRef,
    ) -> Self {
        let service = service.into();
        let name = name.into();
        let params = StructDescriptor::new(format!("{}.{}", service, name), params);
        Self {
            service,
            name,
            params,
            exceptions,
            returns,
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.params.name
    }

    pub fn field(&self, name: &str) -> Result<&FieldDescriptor, SchemaError> {
        self.params.field(name)
    }

    pub fn field_at(&self, index: u16) -> Result<&FieldDescriptor, SchemaError> {
        self.params.field_at(index)
    }

    /// Declared exception raised under `field`.
    pub fn exception(&self, field: &str) -> Result<&FieldDescriptor, SchemaError> {
        self.exceptions
            .iter()
            .find(|f| f.name == field)
            .ok_or_else(|| SchemaError::unknown_field(format!("{} exceptions", self.qualified_name()), field))
    }

    /// Every type name the signature mentions.
    pub fn referenced_names(&self) -> Vec<&str> {
        self.params
            .fields()
            .iter()
            .chain(self.exceptions.iter())
            .flat_map(|f| f.type_ref.referenced_names())
            .chain(self.returns.referenced_names())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub name: String,
    /// Method names in declaration order.
    pub methods: Vec<String>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, methods: Vec<String>) -> Self {
        Self {
            name: name.into(),
            methods,
        }
    }
}
