//! Call targets and concrete instances
//!
//! `CallTarget` is the seam that replaces runtime class synthesis: anything
//! that can stand behind an `ObjRef` — a concrete `Instance` or a
//! `ProxyObject` — implements it. `Instance` is a dynamic object backed by a
//! table of method-name → closure entries, built with `InstanceBuilder`;
//! unresolved names fail at build time, not at call time.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;

use crate::error::{CallResult, EngineError};
use crate::schema::{MethodBody, MethodDesc, MethodKey, TypeSchema};
use crate::value::{ObjRef, Value};

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh object identity
pub(crate) fn next_identity() -> u64 {
    NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed)
}

/// An object the engine can invoke methods on
pub trait CallTarget: Send + Sync {
    /// Declared capability set of the object
    fn schema(&self) -> &Arc<TypeSchema>;

    /// Stable identity, unique per object
    fn identity(&self) -> u64;

    /// Whether the object can answer the given method
    fn responds_to(&self, key: &MethodKey) -> bool;

    /// Invoke a method on the object
    fn invoke(&self, method: &MethodDesc, args: &[Value]) -> CallResult;

    /// Downcast seam so the dispatcher can recognize proxies
    fn as_any(&self) -> &dyn Any;
}

/// A concrete dynamic object: schema plus a table of method bodies
pub struct Instance {
    schema: Arc<TypeSchema>,
    methods: FxHashMap<MethodKey, MethodBody>,
    id: u64,
    self_ref: Weak<Instance>,
}

impl Instance {
    /// The concrete body for a key: exact match first, then a same-name,
    /// same-arity match.
    fn concrete_body(&self, key: &MethodKey) -> Option<MethodBody> {
        if let Some(body) = self.methods.get(key) {
            return Some(body.clone());
        }
        self.methods
            .iter()
            .find(|(k, _)| k.name() == key.name() && k.arity() == key.arity())
            .map(|(_, body)| body.clone())
    }

    fn self_obj(&self) -> Result<ObjRef, EngineError> {
        let arc = self.self_ref.upgrade().ok_or_else(|| {
            EngineError::NativeExecution(format!(
                "instance of `{}` dropped during invocation",
                self.schema.name()
            ))
        })?;
        Ok(ObjRef::from_arc(arc))
    }
}

impl CallTarget for Instance {
    fn schema(&self) -> &Arc<TypeSchema> {
        &self.schema
    }

    fn identity(&self) -> u64 {
        self.id
    }

    fn responds_to(&self, key: &MethodKey) -> bool {
        self.concrete_body(key).is_some() || self.schema.resolve_default(key).is_some()
    }

    fn invoke(&self, method: &MethodDesc, args: &[Value]) -> CallResult {
        let key = method.key();
        let me = self.self_obj()?;
        if let Some(body) = self.concrete_body(&key) {
            return body(&me, args);
        }
        if let Some(default) = self.schema.resolve_default(&key) {
            // resolve_default only returns descriptors with a body attached
            if let Some(body) = default.body() {
                return body(&me, args);
            }
        }
        Err(EngineError::NativeExecution(format!(
            "`{}` has no implementation of `{}`",
            self.schema.name(),
            method.name()
        )))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance({}@{:x})", self.schema.name(), self.id)
    }
}

/// Builder for `Instance`: a schema plus method-name → closure entries
pub struct InstanceBuilder {
    schema: Arc<TypeSchema>,
    methods: Vec<(String, MethodBody)>,
}

impl InstanceBuilder {
    /// Start an instance of the given schema
    pub fn new(schema: &Arc<TypeSchema>) -> Self {
        Self {
            schema: schema.clone(),
            methods: Vec::new(),
        }
    }

    /// Attach a concrete method body by name
    pub fn method(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&ObjRef, &[Value]) -> CallResult + Send + Sync + 'static,
    ) -> Self {
        self.methods.push((name.into(), Arc::new(body)));
        self
    }

    /// Resolve every attached name against the schema and build the object.
    ///
    /// A name the schema (or the built-in identity methods) does not declare
    /// is a configuration error — surfaced here, never at call time.
    pub fn build(self) -> Result<ObjRef, EngineError> {
        let mut methods = FxHashMap::default();
        for (name, body) in self.methods {
            let desc = self
                .schema
                .find_by_name(&name)
                .cloned()
                .or_else(|| crate::identity::builtin_desc(&name))
                .ok_or_else(|| {
                    EngineError::Configuration(format!(
                        "schema `{}` declares no method `{}`",
                        self.schema.name(),
                        name
                    ))
                })?;
            methods.insert(desc.key(), body);
        }
        let schema = self.schema;
        let arc: Arc<Instance> = Arc::new_cyclic(|weak| Instance {
            schema,
            methods,
            id: next_identity(),
            self_ref: weak.clone(),
        });
        Ok(ObjRef::from_arc(arc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use crate::value::TypeDesc;

    fn greeter() -> Arc<TypeSchema> {
        SchemaBuilder::new("Greeter")
            .method("name", vec![], TypeDesc::Str)
            .method("count", vec![], TypeDesc::Int)
            .default_method("greeting", vec![], TypeDesc::Str, |me, _| {
                let name = me.invoke("name", &[])?;
                match name.as_str() {
                    Some(n) => Ok(Value::str(format!("hello {n}"))),
                    None => Ok(Value::str("hello")),
                }
            })
            .build()
    }

    #[test]
    fn test_invoke_concrete_method() {
        let obj = InstanceBuilder::new(&greeter())
            .method("name", |_, _| Ok(Value::str("ada")))
            .build()
            .unwrap();

        assert_eq!(obj.invoke("name", &[]).unwrap(), Value::str("ada"));
    }

    #[test]
    fn test_default_body_sees_self() {
        let obj = InstanceBuilder::new(&greeter())
            .method("name", |_, _| Ok(Value::str("ada")))
            .build()
            .unwrap();

        assert_eq!(obj.invoke("greeting", &[]).unwrap(), Value::str("hello ada"));
    }

    #[test]
    fn test_missing_implementation_is_native_failure() {
        let obj = InstanceBuilder::new(&greeter()).build().unwrap();

        let err = obj.invoke("count", &[]).unwrap_err();
        assert!(matches!(err, EngineError::NativeExecution(_)));
    }

    #[test]
    fn test_unknown_name_fails_at_build_time() {
        let err = InstanceBuilder::new(&greeter())
            .method("nope", |_, _| Ok(Value::Null))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_responds_to() {
        let obj = InstanceBuilder::new(&greeter())
            .method("name", |_, _| Ok(Value::str("ada")))
            .build()
            .unwrap();

        assert!(obj.responds_to(&MethodKey::new("name", vec![])));
        assert!(obj.responds_to(&MethodKey::new("greeting", vec![]))); // default body
        assert!(!obj.responds_to(&MethodKey::new("count", vec![])));
    }

    #[test]
    fn test_identities_are_unique() {
        let a = InstanceBuilder::new(&greeter()).build().unwrap();
        let b = InstanceBuilder::new(&greeter()).build().unwrap();
        assert_ne!(a.identity(), b.identity());
        assert!(a.ptr_eq(&a));
        assert!(!a.ptr_eq(&b));
    }
}
