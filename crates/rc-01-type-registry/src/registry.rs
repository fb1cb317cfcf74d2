//! # Type Registry
//!
//! Name → descriptor table for one schema. Built once at startup (by hand
//! or with [`TypeRegistry::from_document`]), then shared read-only.
//!
//! Lookup is two-tier: registered custom and generated types first, then
//! the built-in primitives.

use crate::domain::{
    Constraint, ContainerDescriptor, MethodDescriptor, PrimitiveKind, SchemaError, ServiceDescriptor, TypeDescriptor,
    TypeRef,
};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::{debug, info};

static PRIMITIVES: [TypeDescriptor; 9] = [
    TypeDescriptor::Primitive(PrimitiveKind::Bool),
    TypeDescriptor::Primitive(PrimitiveKind::Byte),
    TypeDescriptor::Primitive(PrimitiveKind::I16),
    TypeDescriptor::Primitive(PrimitiveKind::I32),
    TypeDescriptor::Primitive(PrimitiveKind::I64),
    TypeDescriptor::Primitive(PrimitiveKind::Double),
    TypeDescriptor::Primitive(PrimitiveKind::String),
    TypeDescriptor::Primitive(PrimitiveKind::Binary),
    TypeDescriptor::Primitive(PrimitiveKind::Void),
];

fn primitive(name: &str) -> Option<&'static TypeDescriptor> {
    let kind = PrimitiveKind::from_name(name)?;
    PRIMITIVES
        .iter()
        .find(|desc| matches!(desc, TypeDescriptor::Primitive(k) if *k == kind))
}

/// A descriptor with its custom chain peeled off.
#[derive(Debug, Clone)]
pub struct ResolvedType<'a> {
    /// First non-custom descriptor in the chain.
    pub base: Cow<'a, TypeDescriptor>,
    /// Constraints collected along the chain, nearest custom type first.
    pub constraints: Vec<Constraint>,
    /// Custom type names walked, in order.
    pub chain: Vec<String>,
}

/// Registry of types, methods and services for one schema.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
    methods: HashMap<(String, String), MethodDescriptor>,
    services: HashMap<String, ServiceDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Register a named type.
    ///
    /// Registering the same descriptor twice is a no-op; a different
    /// descriptor under a taken name fails with `DuplicateType`.
    pub fn register_type(
        &mut self,
        name: impl Into<String>,
        descriptor: TypeDescriptor,
    ) -> Result<(), SchemaError> {
        let name = name.into();
        match self.types.get(&name) {
            Some(existing) if *existing == descriptor => {
                debug!(type_name = %name, "Type already registered");
                Ok(())
            }
            Some(_) => Err(SchemaError::DuplicateType(name)),
            None => {
                debug!(type_name = %name, "Registered type");
                self.types.insert(name, descriptor);
                Ok(())
            }
        }
    }

    /// Register a method under its owning service.
    pub fn register_method(&mut self, method: MethodDescriptor) -> Result<(), SchemaError> {
        let key = (method.service.clone(), method.name.clone());
        match self.methods.get(&key) {
            Some(existing) if *existing == method => Ok(()),
            Some(_) => Err(SchemaError::DuplicateType(method.qualified_name().to_string())),
            None => {
                debug!(method = method.qualified_name(), "Registered method");
                self.methods.insert(key, method);
                Ok(())
            }
        }
    }

    pub fn register_service(&mut self, service: ServiceDescriptor) -> Result<(), SchemaError> {
        match self.services.get(&service.name) {
            Some(existing) if *existing == service => Ok(()),
            Some(_) => Err(SchemaError::DuplicateType(service.name)),
            None => {
                debug!(service = %service.name, methods = service.methods.len(), "Registered service");
                self.services.insert(service.name.clone(), service);
                Ok(())
            }
        }
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Look a type up by name: registered types first, then primitives.
    pub fn lookup(&self, name: &str) -> Result<&TypeDescriptor, SchemaError> {
        self.types
            .get(name)
            .or_else(|| primitive(name))
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Descriptor for a type reference. Inline containers are built on the fly.
    pub fn resolve(&self, type_ref: &TypeRef) -> Result<Cow<'_, TypeDescriptor>, SchemaError> {
        match type_ref {
            TypeRef::Named(name) => self.lookup(name).map(Cow::Borrowed),
            other => ContainerDescriptor::from_ref(other)
                .map(|c| Cow::Owned(TypeDescriptor::Container(c)))
                .ok_or_else(|| SchemaError::UnknownType(other.to_string())),
        }
    }

    /// Follow custom base references down to a non-custom descriptor.
    ///
    /// Fails with `CyclicType` if a name comes round twice.
    pub fn resolve_base<'a>(
        &'a self,
        descriptor: &'a TypeDescriptor,
    ) -> Result<ResolvedType<'a>, SchemaError> {
        let mut chain: Vec<String> = Vec::new();
        let mut constraints = Vec::new();
        let mut current = Cow::Borrowed(descriptor);

        loop {
            let custom = match current.as_ref() {
                TypeDescriptor::Custom(custom) => custom,
                _ => break,
            };
            let seen = chain.contains(&custom.name);
            chain.push(custom.name.clone());
            if seen {
                return Err(SchemaError::CyclicType { chain });
            }
            constraints.extend(custom.constraints.iter().cloned());
            let next = self.resolve(&custom.base)?;
            current = next;
        }

        Ok(ResolvedType {
            base: current,
            constraints,
            chain,
        })
    }

    /// [`resolve`](Self::resolve) then [`resolve_base`](Self::resolve_base).
    pub fn resolve_ref_base(&self, type_ref: &TypeRef) -> Result<ResolvedType<'_>, SchemaError> {
        match self.resolve(type_ref)? {
            Cow::Borrowed(descriptor) => self.resolve_base(descriptor),
            Cow::Owned(container) => Ok(ResolvedType {
                base: Cow::Owned(container),
                constraints: Vec::new(),
                chain: Vec::new(),
            }),
        }
    }

    // =========================================================================
    // CAPABILITIES
    // =========================================================================

    /// Resolved base is `string`.
    pub fn is_string_like(&self, descriptor: &TypeDescriptor) -> Result<bool, SchemaError> {
        let resolved = self.resolve_base(descriptor)?;
        Ok(matches!(
            resolved.base.as_ref(),
            TypeDescriptor::Primitive(PrimitiveKind::String)
        ))
    }

    /// Resolved base is an integral primitive.
    pub fn is_integral(&self, descriptor: &TypeDescriptor) -> Result<bool, SchemaError> {
        Ok(self.resolve_base(descriptor)?.base.is_integral())
    }

    /// `descriptor` is a custom type whose chain passes through `base_name`.
    pub fn is_custom_of(
        &self,
        descriptor: &TypeDescriptor,
        base_name: &str,
    ) -> Result<bool, SchemaError> {
        if !descriptor.is_custom() {
            return Ok(false);
        }
        let resolved = self.resolve_base(descriptor)?;
        Ok(resolved.chain.iter().skip(1).any(|name| name == base_name)
            || resolved.base.name() == base_name)
    }

    // =========================================================================
    // METHODS & SERVICES
    // =========================================================================

    pub fn method(&self, service: &str, name: &str) -> Result<&MethodDescriptor, SchemaError> {
        if let Some(method) = self.methods.get(&(service.to_string(), name.to_string())) {
            return Ok(method);
        }
        let service_known = self.services.contains_key(service)
            || self.methods.keys().any(|(s, _)| s == service);
        if service_known {
            Err(SchemaError::unknown_method(service, name))
        } else {
            Err(SchemaError::UnknownService(service.to_string()))
        }
    }

    pub fn service(&self, name: &str) -> Result<&ServiceDescriptor, SchemaError> {
        self.services
            .get(name)
            .ok_or_else(|| SchemaError::UnknownService(name.to_string()))
    }

    /// Method descriptors of a service, in declaration order.
    pub fn service_methods(&self, name: &str) -> Result<Vec<&MethodDescriptor>, SchemaError> {
        self.service(name)?
            .methods
            .iter()
            .map(|method| self.method(name, method))
            .collect()
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    // =========================================================================
    // VERIFICATION
    // =========================================================================

    /// Load-time integrity check.
    ///
    /// Every referenced name resolves, no custom chain is cyclic, field
    /// names are unique per struct, and every service method is registered.
    /// Regex constraints are compiled when they are built, so a registry
    /// holding one has already proven it compiles.
    pub fn verify(&self) -> Result<(), SchemaError> {
        for name in self.type_names() {
            let descriptor = self.lookup(name)?;
            for referenced in descriptor.referenced_names() {
                self.lookup(referenced)?;
            }
            if descriptor.is_custom() {
                self.resolve_base(descriptor)?;
            }
            if let Some(s) = descriptor.as_struct() {
                check_unique_fields(&s.name, s.fields().iter().map(|f| f.name.as_str()))?;
            }
        }

        let mut methods: Vec<_> = self.methods.values().collect();
        methods.sort_by(|a, b| a.qualified_name().cmp(b.qualified_name()));
        for method in methods {
            for referenced in method.referenced_names() {
                self.lookup(referenced)?;
            }
            check_unique_fields(
                method.qualified_name(),
                method.params.fields().iter().map(|f| f.name.as_str()),
            )?;
        }

        for name in self.service_names() {
            self.service_methods(name)?;
        }

        info!(
            types = self.types.len(),
            methods = self.methods.len(),
            services = self.services.len(),
            "Schema verified"
        );
        Ok(())
    }
}

fn check_unique_fields<'a>(
    owner: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), SchemaError> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SchemaError::InvalidDocument(format!(
                "field '{}' declared twice on {}",
                name, owner
            )));
        }
    }
    Ok(())
}
