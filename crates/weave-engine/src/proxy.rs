//! Proxy construction
//!
//! `ProxyObject` is the synthetic stand-in: an object whose every invocation
//! enters the dispatcher. `ProxyManager` is its per-instance record (target
//! and synthetic schema, advisor registry, delegate). `ProxyFactory` owns
//! the shared default-method handle table and hands out `ProxyBuilder`s —
//! the explicit replacement for runtime class generation: a synthetic
//! `{Name}$Proxy` schema plus tables of closures instead of bytecode.

use std::any::Any;
use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;

use crate::advisor::{AdvisorRegistry, Interceptor, StubFn, Wrapper};
use crate::dispatch;
use crate::error::{CallResult, EngineError};
use crate::invoke::HandleTable;
use crate::object::{next_identity, CallTarget};
use crate::schema::{MethodBody, MethodDesc, MethodKey, SchemaBuilder, TypeSchema};
use crate::value::{ObjRef, Value};

/// Per-proxy-instance record, immutable after construction except for the
/// registry contents (which may be extended before the proxy is first
/// invoked).
pub struct ProxyManager {
    target_schema: Arc<TypeSchema>,
    proxy_schema: Arc<TypeSchema>,
    advisor: Arc<AdvisorRegistry>,
}

impl ProxyManager {
    /// The advised (declared) type
    pub fn target_schema(&self) -> &Arc<TypeSchema> {
        &self.target_schema
    }

    /// The synthetic proxy type (`{Name}$Proxy`, extending the target)
    pub fn proxy_schema(&self) -> &Arc<TypeSchema> {
        &self.proxy_schema
    }

    /// The advisor registry consulted on every dispatch
    pub fn advisor(&self) -> &Arc<AdvisorRegistry> {
        &self.advisor
    }

    /// The proxy's delegate instance, if one was configured
    pub fn delegate(&self) -> Option<ObjRef> {
        self.advisor.primary_delegate()
    }
}

impl std::fmt::Debug for ProxyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyManager")
            .field("target", &self.target_schema.name())
            .field("proxy", &self.proxy_schema.name())
            .finish()
    }
}

/// The synthetic stand-in object; every invocation enters the dispatcher
pub struct ProxyObject {
    manager: ProxyManager,
    real: FxHashMap<MethodKey, MethodBody>,
    handles: Arc<HandleTable>,
    id: u64,
    self_ref: Weak<ProxyObject>,
}

impl ProxyObject {
    /// The proxy's per-instance record
    pub fn manager(&self) -> &ProxyManager {
        &self.manager
    }

    /// The backing body supplied for a method at build time, if any
    pub(crate) fn real_body(&self, key: &MethodKey) -> Option<MethodBody> {
        self.real.get(key).cloned()
    }

    /// The factory's shared default-method handle table
    pub(crate) fn handles(&self) -> &HandleTable {
        &self.handles
    }

    fn self_obj(&self) -> Result<ObjRef, EngineError> {
        let arc = self.self_ref.upgrade().ok_or_else(|| {
            EngineError::NativeExecution(format!(
                "proxy for `{}` dropped during invocation",
                self.manager.target_schema.name()
            ))
        })?;
        Ok(ObjRef::from_arc(arc))
    }
}

impl CallTarget for ProxyObject {
    fn schema(&self) -> &Arc<TypeSchema> {
        &self.manager.proxy_schema
    }

    fn identity(&self) -> u64 {
        self.id
    }

    fn responds_to(&self, key: &MethodKey) -> bool {
        self.real.contains_key(key)
            || self.manager.target_schema.declares_concrete(key)
            || self.manager.target_schema.find_method(key).is_some()
    }

    fn invoke(&self, method: &MethodDesc, args: &[Value]) -> CallResult {
        let me = self.self_obj()?;
        dispatch::intercept(self, &me, method, args)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for ProxyObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ProxyObject({}@{:x})",
            self.manager.proxy_schema.name(),
            self.id
        )
    }
}

/// Builds proxies and owns the state they share: the default-method handle
/// table, passed to each proxy by explicit reference.
pub struct ProxyFactory {
    handles: Arc<HandleTable>,
}

impl ProxyFactory {
    /// Create a factory with an empty handle table
    pub fn new() -> Self {
        Self {
            handles: Arc::new(HandleTable::new()),
        }
    }

    /// The factory's shared handle table
    pub fn handles(&self) -> &Arc<HandleTable> {
        &self.handles
    }

    /// Start building a proxy for the given advised schema
    pub fn builder(&self, schema: &Arc<TypeSchema>) -> ProxyBuilder {
        ProxyBuilder {
            schema: schema.clone(),
            handles: self.handles.clone(),
            delegates: Vec::new(),
            interceptors: Vec::new(),
            wrappers: Vec::new(),
            stub: None,
            real: Vec::new(),
        }
    }
}

impl Default for ProxyFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration collected for one proxy; applied in order at `build`,
/// failing fast on the first configuration error.
pub struct ProxyBuilder {
    schema: Arc<TypeSchema>,
    handles: Arc<HandleTable>,
    delegates: Vec<(Arc<TypeSchema>, ObjRef)>,
    interceptors: Vec<(String, Arc<dyn Interceptor>)>,
    wrappers: Vec<(String, Arc<dyn Wrapper>)>,
    stub: Option<StubFn>,
    real: Vec<(String, MethodBody)>,
}

impl ProxyBuilder {
    /// Register a delegate for the advised type itself
    pub fn delegate(self, obj: ObjRef) -> Self {
        let ty = self.schema.clone();
        self.delegate_as(&ty, obj)
    }

    /// Register a delegate scoped to one type in the advised capability set
    pub fn delegate_as(mut self, ty: &Arc<TypeSchema>, obj: ObjRef) -> Self {
        self.delegates.push((ty.clone(), obj));
        self
    }

    /// Register a method-scoped interceptor by method name
    pub fn intercept(mut self, name: impl Into<String>, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push((name.into(), Arc::new(interceptor)));
        self
    }

    /// Append a wrapper to a method's chain by method name
    pub fn wrap_around(mut self, name: impl Into<String>, wrapper: impl Wrapper + 'static) -> Self {
        self.wrappers.push((name.into(), Arc::new(wrapper)));
        self
    }

    /// Replace the fallback stub
    pub fn default_stub(
        mut self,
        stub: impl Fn(&MethodDesc, &[Value]) -> CallResult + Send + Sync + 'static,
    ) -> Self {
        self.stub = Some(Arc::new(stub));
        self
    }

    /// Supply a concrete backing body for a method (the "real"
    /// implementation the proxy falls through to)
    pub fn real_method(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&ObjRef, &[Value]) -> CallResult + Send + Sync + 'static,
    ) -> Self {
        self.real.push((name.into(), Arc::new(body)));
        self
    }

    /// Construct the proxy, applying the collected configuration in order.
    /// The first error (unknown method, inapplicable delegate type) aborts
    /// the build — configuration problems never defer to call time.
    pub fn build(self) -> Result<ObjRef, EngineError> {
        let mut real = FxHashMap::default();
        for (name, body) in self.real {
            let desc = self
                .schema
                .find_by_name(&name)
                .cloned()
                .or_else(|| crate::identity::builtin_desc(&name))
                .ok_or_else(|| {
                    EngineError::Configuration(format!(
                        "advised type `{}` declares no method `{}`",
                        self.schema.name(),
                        name
                    ))
                })?;
            real.insert(desc.key(), body);
        }

        let proxy_schema = SchemaBuilder::new(format!("{}$Proxy", self.schema.name()))
            .extends(&self.schema)
            .build();
        let advisor = Arc::new(AdvisorRegistry::new(self.schema.clone()));

        for (ty, obj) in self.delegates {
            advisor.set_delegate(ty, obj)?;
        }
        for (name, interceptor) in self.interceptors {
            advisor.set_interceptor_by_name(&name, interceptor)?;
        }
        for (name, wrapper) in self.wrappers {
            advisor.add_wrapper_by_name(&name, wrapper)?;
        }
        if let Some(stub) = self.stub {
            advisor.set_stub(stub);
        }

        let manager = ProxyManager {
            target_schema: self.schema,
            proxy_schema,
            advisor,
        };
        let handles = self.handles;
        let arc: Arc<ProxyObject> = Arc::new_cyclic(|weak| ProxyObject {
            manager,
            real,
            handles,
            id: next_identity(),
            self_ref: weak.clone(),
        });
        Ok(ObjRef::from_arc(arc))
    }
}
