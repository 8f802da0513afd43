//! Per-invocation context
//!
//! One `InvocationContext` is built per intercepted call and lives only for
//! that call. It carries the method metadata, the argument slice (immutable
//! for the call's duration), the proxy instance (`instance`), the callback
//! target (delegate if present, else the proxy), a callable reaching the
//! non-intercepted path, and the current result — seeded with the return
//! type's default until overwritten.

use crate::error::CallResult;
use crate::schema::MethodDesc;
use crate::value::{ObjRef, Value};

/// Read-only view of a call handed to wrapper hooks
pub struct CallInfo<'a> {
    method: &'a MethodDesc,
    args: &'a [Value],
    instance: &'a ObjRef,
}

impl<'a> CallInfo<'a> {
    pub(crate) fn new(method: &'a MethodDesc, args: &'a [Value], instance: &'a ObjRef) -> Self {
        Self {
            method,
            args,
            instance,
        }
    }

    /// The invoked method
    pub fn method(&self) -> &MethodDesc {
        self.method
    }

    /// Arguments of the call
    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// The proxy instance the call arrived on
    pub fn instance(&self) -> &ObjRef {
        self.instance
    }
}

/// Ephemeral state handed to an interceptor for one call
pub struct InvocationContext<'a> {
    method: &'a MethodDesc,
    args: &'a [Value],
    instance: &'a ObjRef,
    target: &'a ObjRef,
    fallback: &'a dyn Fn(&[Value]) -> CallResult,
    result: Value,
}

impl<'a> InvocationContext<'a> {
    pub(crate) fn new(
        method: &'a MethodDesc,
        args: &'a [Value],
        instance: &'a ObjRef,
        target: &'a ObjRef,
        fallback: &'a dyn Fn(&[Value]) -> CallResult,
    ) -> Self {
        let result = method.ret().default_value();
        Self {
            method,
            args,
            instance,
            target,
            fallback,
            result,
        }
    }

    /// The invoked method
    pub fn method(&self) -> &MethodDesc {
        self.method
    }

    /// Arguments of the call, immutable for the call's duration
    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// The proxy instance (`self` of the call)
    pub fn instance(&self) -> &ObjRef {
        self.instance
    }

    /// The callback target: the delegate if one is present, else the proxy
    pub fn target(&self) -> &ObjRef {
        self.target
    }

    /// The current result: the return type's default until overwritten by
    /// `invoke_default`
    pub fn result(&self) -> &Value {
        &self.result
    }

    /// Call through to the non-intercepted path (delegate, real/default
    /// body, or stub) with the original arguments, recording its value as
    /// the current result.
    pub fn invoke_default(&mut self) -> CallResult {
        let args = self.args;
        self.invoke_default_with(args)
    }

    /// Call through to the non-intercepted path with substitute arguments
    pub fn invoke_default_with(&mut self, args: &[Value]) -> CallResult {
        let value = (self.fallback)(args)?;
        self.result = value.clone();
        Ok(value)
    }
}
