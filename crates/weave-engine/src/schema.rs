//! Type schemas and invokable method descriptors
//!
//! A `TypeSchema` is a named capability set: the methods a conforming object
//! can answer, plus the supertypes it extends. `MethodDesc` is the engine's
//! invokable abstraction — name, declaring type, parameter/return slots, and
//! an optional attached body for interface default methods. `MethodKey` is
//! the erased identity used for advice lookup.
//!
//! Schemas replace runtime class synthesis: where a reflective runtime would
//! generate a subclass, the engine builds a schema with `SchemaBuilder` and
//! backs it with closure tables on instances and proxies.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::CallResult;
use crate::value::{ObjRef, TypeDesc, TypeTag, Value};

/// A method implementation: a closure receiving the object it is bound to
/// (`self`) and the argument slice
pub type MethodBody = Arc<dyn Fn(&ObjRef, &[Value]) -> CallResult + Send + Sync>;

/// Identity of a logical method: name plus erased parameter types.
///
/// The declaring type is deliberately excluded so inherited and overridden
/// forms of the same logical method collapse to a single advice entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodKey {
    name: String,
    params: Vec<TypeTag>,
}

impl MethodKey {
    /// Build a key from a name and erased parameter tags
    pub fn new(name: impl Into<String>, params: Vec<TypeTag>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// An invokable member: the engine's view of "a method that can be called"
#[derive(Clone)]
pub struct MethodDesc {
    name: String,
    params: Vec<TypeDesc>,
    ret: TypeDesc,
    declaring: String,
    body: Option<MethodBody>,
}

impl MethodDesc {
    /// Create a descriptor with no attached body (abstract member)
    pub fn new(
        name: impl Into<String>,
        params: Vec<TypeDesc>,
        ret: TypeDesc,
        declaring: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            declaring: declaring.into(),
            body: None,
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter slots
    pub fn params(&self) -> &[TypeDesc] {
        &self.params
    }

    /// Declared return slot
    pub fn ret(&self) -> &TypeDesc {
        &self.ret
    }

    /// Name of the schema this member was declared on
    pub fn declaring(&self) -> &str {
        &self.declaring
    }

    /// True if the declaring schema attached a default body
    pub fn is_default(&self) -> bool {
        self.body.is_some()
    }

    /// The attached default body, if any
    pub fn body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }

    /// Erased advice-lookup key for this member
    pub fn key(&self) -> MethodKey {
        MethodKey::new(
            self.name.clone(),
            self.params.iter().map(TypeDesc::erased).collect(),
        )
    }
}

impl fmt::Debug for MethodDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDesc")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("ret", &self.ret)
            .field("declaring", &self.declaring)
            .field("default", &self.body.is_some())
            .finish()
    }
}

/// A named capability set: declared methods plus extended supertypes
pub struct TypeSchema {
    name: String,
    supertypes: Vec<Arc<TypeSchema>>,
    methods: Vec<MethodDesc>,
    by_key: FxHashMap<MethodKey, usize>,
}

impl TypeSchema {
    /// Schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directly extended supertypes, in declaration order
    pub fn supertypes(&self) -> &[Arc<TypeSchema>] {
        &self.supertypes
    }

    /// Methods declared directly on this schema
    pub fn methods(&self) -> &[MethodDesc] {
        &self.methods
    }

    /// Find a declared method by key: exact match first, then a same-name,
    /// same-arity match (erasure tolerance), own methods before supertypes.
    pub fn find_method(&self, key: &MethodKey) -> Option<&MethodDesc> {
        if let Some(&idx) = self.by_key.get(key) {
            return Some(&self.methods[idx]);
        }
        if let Some(m) = self
            .methods
            .iter()
            .find(|m| m.name() == key.name() && m.params.len() == key.arity())
        {
            return Some(m);
        }
        self.supertypes.iter().find_map(|s| s.find_method(key))
    }

    /// Find the first declared method with the given name, own methods
    /// before supertypes in declaration order. Overloads must be
    /// disambiguated with `find_method`.
    pub fn find_by_name(&self, name: &str) -> Option<&MethodDesc> {
        self.methods
            .iter()
            .find(|m| m.name() == name)
            .or_else(|| self.supertypes.iter().find_map(|s| s.find_by_name(name)))
    }

    /// Resolve the default body for a method, bound to the exact schema that
    /// declared it. The walk visits own declarations before supertypes so a
    /// re-entrant default-method invocation never re-binds to an override.
    pub fn resolve_default(&self, key: &MethodKey) -> Option<&MethodDesc> {
        if let Some(m) = self.methods.iter().find(|m| {
            m.body.is_some() && m.name() == key.name() && m.params.len() == key.arity()
        }) {
            return Some(m);
        }
        self.supertypes.iter().find_map(|s| s.resolve_default(key))
    }

    /// True if this schema (or a supertype) attaches a concrete body for the
    /// method — used to decide whether identity methods get normal routing.
    pub fn declares_concrete(&self, key: &MethodKey) -> bool {
        self.resolve_default(key).is_some()
    }

    /// Capability-set inclusion: does this schema conform to `other`?
    /// Name-based walk over the supertype graph; a schema implements itself.
    pub fn implements(&self, other: &TypeSchema) -> bool {
        if self.name == other.name {
            return true;
        }
        self.supertypes.iter().any(|s| s.implements(other))
    }

    /// Locate a schema by name within `root`'s capability set (`root` itself
    /// or any transitive supertype).
    pub fn named(root: &Arc<TypeSchema>, name: &str) -> Option<Arc<TypeSchema>> {
        if root.name == name {
            return Some(root.clone());
        }
        root.supertypes.iter().find_map(|s| TypeSchema::named(s, name))
    }
}

impl fmt::Debug for TypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSchema")
            .field("name", &self.name)
            .field(
                "supertypes",
                &self.supertypes.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("methods", &self.methods)
            .finish()
    }
}

/// Fluent builder for `TypeSchema`
pub struct SchemaBuilder {
    name: String,
    supertypes: Vec<Arc<TypeSchema>>,
    methods: Vec<MethodDesc>,
}

impl SchemaBuilder {
    /// Start a schema with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Extend a supertype schema
    pub fn extends(mut self, schema: &Arc<TypeSchema>) -> Self {
        self.supertypes.push(schema.clone());
        self
    }

    /// Declare an abstract method
    pub fn method(mut self, name: impl Into<String>, params: Vec<TypeDesc>, ret: TypeDesc) -> Self {
        let declaring = self.name.clone();
        self.methods.push(MethodDesc::new(name, params, ret, declaring));
        self
    }

    /// Declare a method with an attached default body
    pub fn default_method(
        mut self,
        name: impl Into<String>,
        params: Vec<TypeDesc>,
        ret: TypeDesc,
        body: impl Fn(&ObjRef, &[Value]) -> CallResult + Send + Sync + 'static,
    ) -> Self {
        let declaring = self.name.clone();
        let mut desc = MethodDesc::new(name, params, ret, declaring);
        desc.body = Some(Arc::new(body));
        self.methods.push(desc);
        self
    }

    /// Finish the schema
    pub fn build(self) -> Arc<TypeSchema> {
        let by_key = self
            .methods
            .iter()
            .enumerate()
            .map(|(i, m)| (m.key(), i))
            .collect();
        Arc::new(TypeSchema {
            name: self.name,
            supertypes: self.supertypes,
            methods: self.methods,
            by_key,
        })
    }
}
