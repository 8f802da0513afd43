//! Advisor registry: per-type advice configuration
//!
//! The registry stores everything the dispatcher consults when routing a
//! call: type-scoped delegates, method-scoped interceptors, ordered wrapper
//! lists, and the fallback stub. Reads are lock-cheap and concurrent
//! (`parking_lot::RwLock`, read-mostly); writes are the configuration
//! surface and fail fast on advice that targets a method or type the advised
//! schema does not declare.
//!
//! The registry is expected to be configured before concurrent dispatch
//! begins. Concurrent reads during dispatch are safe; interleaving writes
//! with active dispatch is a documented precondition violation, not a
//! guarded invariant.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::context::{CallInfo, InvocationContext};
use crate::error::{CallResult, EngineError, HookResult};
use crate::schema::{MethodDesc, MethodKey, TypeSchema};
use crate::value::{ObjRef, Value};

/// Method-scoped advice that fully controls a method's outcome
pub trait Interceptor: Send + Sync {
    /// Decide the call's result, optionally reaching the non-intercepted
    /// path through `cx.invoke_default()`
    fn intercept(&self, cx: &mut InvocationContext<'_>) -> CallResult;
}

impl<F> Interceptor for F
where
    F: Fn(&mut InvocationContext<'_>) -> CallResult + Send + Sync,
{
    fn intercept(&self, cx: &mut InvocationContext<'_>) -> CallResult {
        self(cx)
    }
}

/// Before/after/error observer attached to a method.
///
/// Wrappers observe, they do not route: `before` runs ahead of the chosen
/// path, `after` on its success, `on_error` on its failure (receiving the
/// caught error, which is then rethrown unchanged). A hook's own error
/// propagates immediately and is never fed to `on_error`.
pub trait Wrapper: Send + Sync {
    /// Runs before the routed call
    fn before(&self, _call: &CallInfo<'_>) -> HookResult {
        Ok(())
    }

    /// Runs after a successful routed call, observing the raw result
    fn after(&self, _call: &CallInfo<'_>, _result: &Value) -> HookResult {
        Ok(())
    }

    /// Runs after a failed routed call, observing the caught error
    fn on_error(&self, _call: &CallInfo<'_>, _error: &EngineError) -> HookResult {
        Ok(())
    }
}

type BeforeFn = Box<dyn Fn(&CallInfo<'_>) -> HookResult + Send + Sync>;
type AfterFn = Box<dyn Fn(&CallInfo<'_>, &Value) -> HookResult + Send + Sync>;
type ErrorFn = Box<dyn Fn(&CallInfo<'_>, &EngineError) -> HookResult + Send + Sync>;

/// Closure-backed `Wrapper` for callers that do not want a named type
#[derive(Default)]
pub struct CallbackWrapper {
    before: Option<BeforeFn>,
    after: Option<AfterFn>,
    error: Option<ErrorFn>,
}

impl CallbackWrapper {
    /// An observer with no hooks attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a before hook
    pub fn before_hook(mut self, f: impl Fn(&CallInfo<'_>) -> HookResult + Send + Sync + 'static) -> Self {
        self.before = Some(Box::new(f));
        self
    }

    /// Attach an after hook
    pub fn after_hook(
        mut self,
        f: impl Fn(&CallInfo<'_>, &Value) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.after = Some(Box::new(f));
        self
    }

    /// Attach an error hook
    pub fn error_hook(
        mut self,
        f: impl Fn(&CallInfo<'_>, &EngineError) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl Wrapper for CallbackWrapper {
    fn before(&self, call: &CallInfo<'_>) -> HookResult {
        match &self.before {
            Some(f) => f(call),
            None => Ok(()),
        }
    }

    fn after(&self, call: &CallInfo<'_>, result: &Value) -> HookResult {
        match &self.after {
            Some(f) => f(call, result),
            None => Ok(()),
        }
    }

    fn on_error(&self, call: &CallInfo<'_>, error: &EngineError) -> HookResult {
        match &self.error {
            Some(f) => f(call, error),
            None => Ok(()),
        }
    }
}

/// Fallback behavior for calls with no interceptor, delegate, or body
pub type StubFn = Arc<dyn Fn(&MethodDesc, &[Value]) -> CallResult + Send + Sync>;

/// The initial stub: the return type's default value (`0`, `0.0`, `false`,
/// `Null`, `Void`)
pub fn zero_value_stub() -> StubFn {
    Arc::new(|method: &MethodDesc, _args: &[Value]| Ok(method.ret().default_value()))
}

struct AdviceTable {
    delegates: Vec<(Arc<TypeSchema>, ObjRef)>,
    interceptors: FxHashMap<MethodKey, Arc<dyn Interceptor>>,
    wrappers: FxHashMap<MethodKey, Vec<Arc<dyn Wrapper>>>,
    stub: StubFn,
}

/// Per-proxy-type advice store consulted by the dispatcher
pub struct AdvisorRegistry {
    schema: Arc<TypeSchema>,
    table: RwLock<AdviceTable>,
}

impl AdvisorRegistry {
    /// Create an empty registry for the advised schema
    pub fn new(schema: Arc<TypeSchema>) -> Self {
        Self {
            schema,
            table: RwLock::new(AdviceTable {
                delegates: Vec::new(),
                interceptors: FxHashMap::default(),
                wrappers: FxHashMap::default(),
                stub: zero_value_stub(),
            }),
        }
    }

    /// The advised schema
    pub fn schema(&self) -> &Arc<TypeSchema> {
        &self.schema
    }

    // ========================================================================
    // Reads (dispatch path)
    // ========================================================================

    /// The most specific registered delegate whose capability set includes
    /// `declaring`; absent if none configured.
    pub fn delegate_for(&self, declaring: &TypeSchema) -> Option<ObjRef> {
        let table = self.table.read();
        let mut best: Option<&(Arc<TypeSchema>, ObjRef)> = None;
        for entry in table.delegates.iter().filter(|(ty, _)| ty.implements(declaring)) {
            best = match best {
                Some(current) if !entry.0.implements(&current.0) => Some(current),
                _ => Some(entry),
            };
        }
        best.map(|(_, obj)| obj.clone())
    }

    /// The first registered delegate, if any (the proxy's "own" delegate)
    pub fn primary_delegate(&self) -> Option<ObjRef> {
        self.table.read().delegates.first().map(|(_, obj)| obj.clone())
    }

    /// The method-scoped interceptor, if any
    pub fn interceptor_for(&self, key: &MethodKey) -> Option<Arc<dyn Interceptor>> {
        self.table.read().interceptors.get(key).cloned()
    }

    /// Wrappers in registration order; empty if none. Registering the same
    /// wrapper twice makes it fire twice (ordered multiset, not a set).
    pub fn wrappers_for(&self, key: &MethodKey) -> Vec<Arc<dyn Wrapper>> {
        self.table
            .read()
            .wrappers
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// The fallback stub
    pub fn default_stub(&self) -> StubFn {
        self.table.read().stub.clone()
    }

    // ========================================================================
    // Writes (configuration surface, fail-fast)
    // ========================================================================

    /// Register a type-scoped delegate: `obj` handles every method declared
    /// by `ty` (and its supertypes). `ty` must be in the advised schema's
    /// capability set and `obj` must implement it.
    pub fn set_delegate(&self, ty: Arc<TypeSchema>, obj: ObjRef) -> Result<(), EngineError> {
        if !self.schema.implements(&ty) {
            return Err(EngineError::Configuration(format!(
                "`{}` is not in the capability set of advised type `{}`",
                ty.name(),
                self.schema.name()
            )));
        }
        if !obj.schema().implements(&ty) {
            return Err(EngineError::Configuration(format!(
                "delegate `{}` does not implement `{}`",
                obj.schema().name(),
                ty.name()
            )));
        }
        self.table.write().delegates.push((ty, obj));
        Ok(())
    }

    /// Register a method-scoped interceptor; replaces any previous one (at
    /// most one active interceptor per method).
    pub fn set_interceptor(
        &self,
        key: MethodKey,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<(), EngineError> {
        self.require_method(&key)?;
        self.table.write().interceptors.insert(key, interceptor);
        Ok(())
    }

    /// Register an interceptor against the first method with this name
    pub fn set_interceptor_by_name(
        &self,
        name: &str,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<(), EngineError> {
        let key = self.key_for_name(name)?;
        self.table.write().interceptors.insert(key, interceptor);
        Ok(())
    }

    /// Append a wrapper to the method's chain (registration order preserved)
    pub fn add_wrapper(&self, key: MethodKey, wrapper: Arc<dyn Wrapper>) -> Result<(), EngineError> {
        self.require_method(&key)?;
        self.table.write().wrappers.entry(key).or_default().push(wrapper);
        Ok(())
    }

    /// Append a wrapper against the first method with this name
    pub fn add_wrapper_by_name(
        &self,
        name: &str,
        wrapper: Arc<dyn Wrapper>,
    ) -> Result<(), EngineError> {
        let key = self.key_for_name(name)?;
        self.table.write().wrappers.entry(key).or_default().push(wrapper);
        Ok(())
    }

    /// Replace the fallback stub
    pub fn set_stub(&self, stub: StubFn) {
        self.table.write().stub = stub;
    }

    fn require_method(&self, key: &MethodKey) -> Result<(), EngineError> {
        if self.schema.find_method(key).is_none() {
            return Err(EngineError::Configuration(format!(
                "advised type `{}` declares no method `{}`",
                self.schema.name(),
                key.name()
            )));
        }
        Ok(())
    }

    fn key_for_name(&self, name: &str) -> Result<MethodKey, EngineError> {
        self.schema
            .find_by_name(name)
            .map(MethodDesc::key)
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "advised type `{}` declares no method `{}`",
                    self.schema.name(),
                    name
                ))
            })
    }
}

impl std::fmt::Debug for AdvisorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read();
        f.debug_struct("AdvisorRegistry")
            .field("schema", &self.schema.name())
            .field("delegates", &table.delegates.len())
            .field("interceptors", &table.interceptors.len())
            .field("wrapped_methods", &table.wrappers.len())
            .finish()
    }
}
