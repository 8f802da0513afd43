//! Identity methods
//!
//! Every object answers `equals`, `hash_code`, and `to_display`, whether or
//! not its schema declares them. For proxies these three are answered here,
//! ahead of normal routing, so a proxy has well-defined identity semantics
//! instead of whatever a synthetic stand-in would inherit:
//!
//! - no delegate: reference identity (a proxy equals only itself)
//! - delegate whose type defines `equals`: the delegate's equality is
//!   honored, and a proxy operand carrying a delegate is compared by that
//!   delegate — two proxies over equal delegates are equal
//!
//! If the advised schema itself declares a concrete override of one of the
//! three, the dispatcher skips this module and routes normally.

use crate::error::{CallResult, EngineError};
use crate::proxy::{ProxyManager, ProxyObject};
use crate::schema::{MethodDesc, MethodKey};
use crate::value::{ObjRef, TypeDesc, Value};

/// Name of the equality method
pub const EQUALS: &str = "equals";
/// Name of the hash method
pub const HASH_CODE: &str = "hash_code";
/// Name of the display method
pub const TO_DISPLAY: &str = "to_display";

const DECLARING: &str = "object";

/// Descriptor for `equals(other) -> bool`
pub fn equals_desc() -> MethodDesc {
    MethodDesc::new(EQUALS, vec![TypeDesc::Any], TypeDesc::Bool, DECLARING)
}

/// Descriptor for `hash_code() -> int`
pub fn hash_code_desc() -> MethodDesc {
    MethodDesc::new(HASH_CODE, vec![], TypeDesc::Int, DECLARING)
}

/// Descriptor for `to_display() -> str`
pub fn to_display_desc() -> MethodDesc {
    MethodDesc::new(TO_DISPLAY, vec![], TypeDesc::Str, DECLARING)
}

/// The built-in descriptor for an identity method name, if it is one
pub fn builtin_desc(name: &str) -> Option<MethodDesc> {
    match name {
        EQUALS => Some(equals_desc()),
        HASH_CODE => Some(hash_code_desc()),
        TO_DISPLAY => Some(to_display_desc()),
        _ => None,
    }
}

/// True if the key names an identity method with the right arity
pub fn is_identity_method(key: &MethodKey) -> bool {
    match key.name() {
        EQUALS => key.arity() == 1,
        HASH_CODE | TO_DISPLAY => key.arity() == 0,
        _ => false,
    }
}

/// Answer an identity method on behalf of a proxy
pub fn handle(
    manager: &ProxyManager,
    self_ref: &ObjRef,
    method: &MethodDesc,
    args: &[Value],
) -> CallResult {
    match method.name() {
        EQUALS => equals(manager, self_ref, args),
        HASH_CODE => hash_code(manager, self_ref),
        TO_DISPLAY => to_display(manager, self_ref),
        other => Err(EngineError::NativeExecution(format!(
            "`{other}` is not an identity method"
        ))),
    }
}

fn equals(manager: &ProxyManager, self_ref: &ObjRef, args: &[Value]) -> CallResult {
    let other = args.first().ok_or_else(|| {
        EngineError::NativeExecution("`equals` expects one argument".to_string())
    })?;

    if let Some(delegate) = manager.delegate() {
        if delegate.responds_to(&equals_desc().key()) {
            // Compare delegate-carrying proxies by their delegates, not by
            // proxy identity.
            let operand = match other {
                Value::Object(obj) => match proxy_delegate(obj) {
                    Some(inner) => Value::Object(inner),
                    None => other.clone(),
                },
                _ => other.clone(),
            };
            let desc = delegate
                .schema()
                .find_by_name(EQUALS)
                .cloned()
                .unwrap_or_else(equals_desc);
            return delegate.invoke_method(&desc, &[operand]);
        }
    }

    let eq = match other {
        Value::Object(obj) => obj.ptr_eq(self_ref),
        _ => false,
    };
    Ok(Value::Bool(eq))
}

fn hash_code(manager: &ProxyManager, self_ref: &ObjRef) -> CallResult {
    if let Some(delegate) = manager.delegate() {
        if delegate.responds_to(&hash_code_desc().key()) {
            let desc = delegate
                .schema()
                .find_by_name(HASH_CODE)
                .cloned()
                .unwrap_or_else(hash_code_desc);
            return delegate.invoke_method(&desc, &[]);
        }
    }
    Ok(Value::Int(self_ref.identity() as i64))
}

fn to_display(manager: &ProxyManager, self_ref: &ObjRef) -> CallResult {
    if let Some(delegate) = manager.delegate() {
        if delegate.responds_to(&to_display_desc().key()) {
            let desc = delegate
                .schema()
                .find_by_name(TO_DISPLAY)
                .cloned()
                .unwrap_or_else(to_display_desc);
            return delegate.invoke_method(&desc, &[]);
        }
    }
    Ok(Value::str(format!(
        "{}$Proxy@{:x}",
        manager.target_schema().name(),
        self_ref.identity()
    )))
}

fn proxy_delegate(obj: &ObjRef) -> Option<ObjRef> {
    obj.downcast::<ProxyObject>()
        .and_then(|p| p.manager().delegate())
}
