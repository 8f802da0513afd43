//! Invocation paths
//!
//! The invoker performs the actual call the dispatcher routed: a dynamic
//! call on a delegate, the proxy's own real/default path, or the configured
//! stub. Default-method resolution walks the schema's supertype graph; the
//! per-factory `HandleTable` memoizes that walk with insert-if-absent
//! semantics so it is shared safely across all of a factory's proxies.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::CallResult;
use crate::proxy::ProxyObject;
use crate::schema::{MethodBody, MethodDesc, MethodKey, TypeSchema};
use crate::value::{ObjRef, Value};

/// Append-only cache of resolved default-method bodies, keyed by schema name
/// and method identity.
///
/// Owned by the `ProxyFactory` and shared by reference with the proxies it
/// builds — never process-global. Safe for concurrent population: entries
/// are pure function pointers, not per-instance state.
pub struct HandleTable {
    handles: DashMap<(String, MethodKey), MethodBody>,
}

impl HandleTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            handles: DashMap::new(),
        }
    }

    /// Resolve the default body for `key` within `schema`'s capability set,
    /// caching the result of the supertype walk.
    pub fn resolve(&self, schema: &Arc<TypeSchema>, key: &MethodKey) -> Option<MethodBody> {
        let cache_key = (schema.name().to_string(), key.clone());
        if let Some(body) = self.handles.get(&cache_key) {
            return Some(body.clone());
        }
        let resolved = schema.resolve_default(key)?.body()?.clone();
        let body = self
            .handles
            .entry(cache_key)
            .or_insert(resolved)
            .clone();
        Some(body)
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True if nothing has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleTable")
            .field("cached", &self.handles.len())
            .finish()
    }
}

/// Dynamic call on a registered delegate. Errors from the delegate surface
/// directly as the original cause.
pub fn invoke_delegate(delegate: &ObjRef, method: &MethodDesc, args: &[Value]) -> CallResult {
    delegate.invoke_method(method, args)
}

/// The real/default path of a proxy: the proxy's own backing body if one was
/// supplied, else the interface default body resolved through the factory's
/// handle table, else the registry stub.
pub fn invoke_real(
    proxy: &ProxyObject,
    self_ref: &ObjRef,
    method: &MethodDesc,
    args: &[Value],
) -> CallResult {
    let key = method.key();
    if let Some(body) = proxy.real_body(&key) {
        return body(self_ref, args);
    }
    if let Some(body) = proxy.handles().resolve(proxy.manager().target_schema(), &key) {
        return body(self_ref, args);
    }
    let stub = proxy.manager().advisor().default_stub();
    stub(method, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use crate::value::TypeDesc;

    #[test]
    fn test_handle_table_caches_resolution() {
        let schema = SchemaBuilder::new("Greeter")
            .default_method("greet", vec![], TypeDesc::Str, |_, _| Ok(Value::str("hi")))
            .build();
        let table = HandleTable::new();
        let key = MethodKey::new("greet", vec![]);

        assert!(table.is_empty());
        let first = table.resolve(&schema, &key).unwrap();
        assert_eq!(table.len(), 1);
        let second = table.resolve(&schema, &key).unwrap();
        assert_eq!(table.len(), 1);
        // Same cached handle, not a re-resolution.
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_handle_table_misses_on_abstract_methods() {
        let schema = SchemaBuilder::new("Greeter")
            .method("greet", vec![], TypeDesc::Str)
            .build();
        let table = HandleTable::new();

        assert!(table.resolve(&schema, &MethodKey::new("greet", vec![])).is_none());
        assert!(table.is_empty());
    }
}
