//! Method dispatcher
//!
//! The core state machine, run once per intercepted call:
//!
//! ```text
//! Start -> ResolveRoute -> WrapBefore -> Execute -> WrapAfterOrError -> Validate -> Return
//! ```
//!
//! Identity methods are special-cased ahead of `ResolveRoute` unless the
//! advised type declares its own concrete override. Routing precedence is
//! method-scoped interceptor, then type-scoped delegate (by the method's
//! declaring schema), then the real/default/stub path. Wrapper `before`
//! hooks run in registration order ahead of the routed call; on success the
//! `after` hooks run in registration order and the result is validated; on
//! failure the `on_error` hooks observe the caught error and it is returned
//! unchanged. Business errors are never swallowed or rewrapped here.

use std::sync::Arc;

use crate::advisor::Interceptor;
use crate::context::{CallInfo, InvocationContext};
use crate::error::CallResult;
use crate::identity;
use crate::invoke;
use crate::proxy::ProxyObject;
use crate::schema::{MethodDesc, TypeSchema};
use crate::validate;
use crate::value::{ObjRef, Value};

/// Dispatch one method call on a proxy.
pub fn intercept(
    proxy: &ProxyObject,
    self_ref: &ObjRef,
    method: &MethodDesc,
    args: &[Value],
) -> CallResult {
    let manager = proxy.manager();
    let key = method.key();

    // Identity methods bypass the pipeline unless the advised type overrides
    // them (schema default body or a supplied backing body).
    if identity::is_identity_method(&key)
        && proxy.real_body(&key).is_none()
        && !manager.target_schema().declares_concrete(&key)
    {
        return identity::handle(manager, self_ref, method, args);
    }

    let advisor = manager.advisor();
    let interceptor = advisor.interceptor_for(&key);
    let declaring = TypeSchema::named(manager.target_schema(), method.declaring())
        .unwrap_or_else(|| manager.target_schema().clone());
    let delegate = advisor.delegate_for(&declaring);
    let wrappers = advisor.wrappers_for(&key);

    let call = CallInfo::new(method, args, self_ref);
    for wrapper in &wrappers {
        wrapper.before(&call)?;
    }

    match execute(proxy, self_ref, method, args, interceptor, delegate.as_ref()) {
        Ok(raw) => {
            for wrapper in &wrappers {
                wrapper.after(&call, &raw)?;
            }
            let raw = fixup_self_reference(raw, delegate.as_ref(), self_ref);
            validate::validate(method, raw)
        }
        Err(err) => {
            for wrapper in &wrappers {
                wrapper.on_error(&call, &err)?;
            }
            Err(err)
        }
    }
}

/// Run the routed call: interceptor, delegate, or real/default/stub.
fn execute(
    proxy: &ProxyObject,
    self_ref: &ObjRef,
    method: &MethodDesc,
    args: &[Value],
    interceptor: Option<Arc<dyn Interceptor>>,
    delegate: Option<&ObjRef>,
) -> CallResult {
    if let Some(interceptor) = interceptor {
        let fallback = |fargs: &[Value]| -> CallResult {
            match delegate {
                Some(d) => invoke::invoke_delegate(d, method, fargs),
                None => invoke::invoke_real(proxy, self_ref, method, fargs),
            }
        };
        let target = delegate.unwrap_or(self_ref);
        let mut cx = InvocationContext::new(method, args, self_ref, target, &fallback);
        return interceptor.intercept(&mut cx);
    }
    if let Some(d) = delegate {
        return invoke::invoke_delegate(d, method, args);
    }
    invoke::invoke_real(proxy, self_ref, method, args)
}

/// A delegate method returning the delegate instance itself yields the proxy
/// instead, so the raw delegate never leaks through its proxy. Applied only
/// to the directly registered delegate, not transitively.
fn fixup_self_reference(raw: Value, delegate: Option<&ObjRef>, self_ref: &ObjRef) -> Value {
    match (&raw, delegate) {
        (Value::Object(obj), Some(d)) if obj.ptr_eq(d) => Value::Object(self_ref.clone()),
        _ => raw,
    }
}
