use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use weave_engine::{
    CallResult, EngineError, InstanceBuilder, InvocationContext, ObjRef, ProxyFactory,
    SchemaBuilder, TypeDesc, TypeSchema, Value,
};

fn account_schema() -> Arc<TypeSchema> {
    SchemaBuilder::new("Account")
        .method("owner", vec![], TypeDesc::Str)
        .method("balance", vec![], TypeDesc::Int)
        .method("open", vec![], TypeDesc::Bool)
        .method("count", vec![], TypeDesc::Int)
        .method("this_account", vec![], TypeDesc::Any)
        .build()
}

// ============================================================================
// Pass-Through Tests
// ============================================================================

#[test]
fn test_unadvised_call_matches_real_implementation() {
    let schema = account_schema();
    let proxy = ProxyFactory::new()
        .builder(&schema)
        .real_method("owner", |_, _| Ok(Value::str("ada")))
        .real_method("balance", |_, _| Ok(Value::Int(100)))
        .build()
        .unwrap();

    assert_eq!(proxy.invoke("owner", &[]).unwrap(), Value::str("ada"));
    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::Int(100));
}

#[test]
fn test_default_method_reached_through_proxy() {
    let schema = SchemaBuilder::new("Greeter")
        .method("name", vec![], TypeDesc::Str)
        .default_method("greet", vec![], TypeDesc::Str, |me, _| {
            let name = me.invoke("name", &[])?;
            Ok(Value::str(format!("hello {}", name.as_str().unwrap_or("?"))))
        })
        .build();
    let proxy = ProxyFactory::new()
        .builder(&schema)
        .real_method("name", |_, _| Ok(Value::str("ada")))
        .build()
        .unwrap();

    assert_eq!(proxy.invoke("greet", &[]).unwrap(), Value::str("hello ada"));
}

// ============================================================================
// Stub Tests
// ============================================================================

#[test]
fn test_unimplemented_primitive_returns_zero_value() {
    let schema = account_schema();
    let proxy = ProxyFactory::new().builder(&schema).build().unwrap();

    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::Int(0));
    assert_eq!(proxy.invoke("open", &[]).unwrap(), Value::Bool(false));
    assert_eq!(proxy.invoke("owner", &[]).unwrap(), Value::Null);
}

#[test]
fn test_custom_stub_overrides_zero_values() {
    let schema = account_schema();
    let proxy = ProxyFactory::new()
        .builder(&schema)
        .default_stub(|method, _| match method.ret() {
            TypeDesc::Int => Ok(Value::Int(-1)),
            other => Ok(other.default_value()),
        })
        .build()
        .unwrap();

    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::Int(-1));
    assert_eq!(proxy.invoke("owner", &[]).unwrap(), Value::Null);
}

// ============================================================================
// Delegate Tests
// ============================================================================

#[test]
fn test_delegate_handles_unintercepted_methods() {
    let schema = account_schema();
    let delegate = InstanceBuilder::new(&schema)
        .method("owner", |_, _| Ok(Value::str("delegate")))
        .method("balance", |_, _| Ok(Value::Int(42)))
        .build()
        .unwrap();

    let proxy = ProxyFactory::new()
        .builder(&schema)
        .delegate(delegate)
        .build()
        .unwrap();

    assert_eq!(proxy.invoke("owner", &[]).unwrap(), Value::str("delegate"));
    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::Int(42));
}

#[test]
fn test_delegate_returning_itself_yields_the_proxy() {
    let schema = account_schema();
    let delegate = InstanceBuilder::new(&schema)
        .method("this_account", |me, _| Ok(Value::Object(me.clone())))
        .build()
        .unwrap();

    let proxy = ProxyFactory::new()
        .builder(&schema)
        .delegate(delegate.clone())
        .build()
        .unwrap();

    let result = proxy.invoke("this_account", &[]).unwrap();
    let returned = result.as_object().unwrap();
    assert!(returned.ptr_eq(&proxy), "raw delegate leaked through proxy");
    assert!(!returned.ptr_eq(&delegate));
}

#[test]
fn test_interceptor_overrides_delegate() {
    let schema = account_schema();
    let delegate = InstanceBuilder::new(&schema)
        .method("balance", |_, _| Ok(Value::Int(42)))
        .build()
        .unwrap();

    let proxy = ProxyFactory::new()
        .builder(&schema)
        .delegate(delegate)
        .intercept("balance", |_cx: &mut InvocationContext<'_>| -> CallResult {
            Ok(Value::Int(7))
        })
        .build()
        .unwrap();

    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::Int(7));
}

// ============================================================================
// Interceptor Tests
// ============================================================================

#[test]
fn test_invoke_default_reaches_delegate() {
    let schema = account_schema();
    let delegate = InstanceBuilder::new(&schema)
        .method("balance", |_, _| Ok(Value::Int(42)))
        .build()
        .unwrap();

    let proxy = ProxyFactory::new()
        .builder(&schema)
        .delegate(delegate)
        .intercept("balance", |cx: &mut InvocationContext<'_>| -> CallResult {
            let v = cx.invoke_default()?;
            Ok(Value::Int(v.as_int().unwrap() + 1))
        })
        .build()
        .unwrap();

    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::Int(43));
}

#[test]
fn test_invoke_default_reaches_real_implementation() {
    let schema = account_schema();
    let proxy = ProxyFactory::new()
        .builder(&schema)
        .real_method("balance", |_, _| Ok(Value::Int(10)))
        .intercept("balance", |cx: &mut InvocationContext<'_>| -> CallResult {
            let v = cx.invoke_default()?;
            Ok(Value::Int(v.as_int().unwrap() * 2))
        })
        .build()
        .unwrap();

    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::Int(20));
}

#[test]
fn test_interceptor_context_exposes_self_and_target() {
    let schema = account_schema();
    let delegate = InstanceBuilder::new(&schema).build().unwrap();
    let delegate_id = delegate.identity();

    let proxy = ProxyFactory::new()
        .builder(&schema)
        .delegate(delegate)
        .intercept("owner", move |cx: &mut InvocationContext<'_>| -> CallResult {
            assert_eq!(cx.target().identity(), delegate_id);
            assert_ne!(cx.instance().identity(), delegate_id);
            Ok(Value::str("checked"))
        })
        .build()
        .unwrap();

    assert_eq!(proxy.invoke("owner", &[]).unwrap(), Value::str("checked"));
}

#[test]
fn test_stateful_interceptor_counts_one_two_three() {
    let schema = account_schema();
    let counter = Arc::new(AtomicI64::new(0));
    let proxy = ProxyFactory::new()
        .builder(&schema)
        .intercept("count", {
            let counter = counter.clone();
            move |_cx: &mut InvocationContext<'_>| -> CallResult {
                Ok(Value::Int(counter.fetch_add(1, Ordering::SeqCst) + 1))
            }
        })
        .build()
        .unwrap();

    assert_eq!(proxy.invoke("count", &[]).unwrap(), Value::Int(1));
    assert_eq!(proxy.invoke("count", &[]).unwrap(), Value::Int(2));
    assert_eq!(proxy.invoke("count", &[]).unwrap(), Value::Int(3));
}

// ============================================================================
// Error Propagation Tests
// ============================================================================

#[test]
fn test_business_exception_passes_through_unmodified() {
    let schema = account_schema();
    let proxy = ProxyFactory::new()
        .builder(&schema)
        .intercept("owner", |_cx: &mut InvocationContext<'_>| -> CallResult {
            Err(EngineError::thrown("IllegalState", "x"))
        })
        .build()
        .unwrap();

    let err = proxy.invoke("owner", &[]).unwrap_err();
    let thrown = err.as_thrown().expect("expected a business exception");
    assert_eq!(thrown.kind, "IllegalState");
    assert_eq!(thrown.message, "x");
}

#[test]
fn test_result_type_mismatch_is_fatal() {
    let schema = account_schema();
    let proxy = ProxyFactory::new()
        .builder(&schema)
        .intercept("balance", |_cx: &mut InvocationContext<'_>| -> CallResult {
            Ok(Value::str("not an int"))
        })
        .build()
        .unwrap();

    let err = proxy.invoke("balance", &[]).unwrap_err();
    assert!(matches!(err, EngineError::ResultTypeMismatch { .. }));
}

// ============================================================================
// Nested Proxy Tests
// ============================================================================

#[test]
fn test_delegate_may_itself_be_a_proxy() {
    let schema = account_schema();
    let factory = ProxyFactory::new();

    let inner = factory
        .builder(&schema)
        .real_method("balance", |_, _| Ok(Value::Int(5)))
        .build()
        .unwrap();
    let outer = factory
        .builder(&schema)
        .delegate(inner)
        .intercept("balance", |cx: &mut InvocationContext<'_>| -> CallResult {
            let v = cx.invoke_default()?;
            Ok(Value::Int(v.as_int().unwrap() + 100))
        })
        .build()
        .unwrap();

    assert_eq!(outer.invoke("balance", &[]).unwrap(), Value::Int(105));
}

// ============================================================================
// Registry Extension Tests
// ============================================================================

#[test]
fn test_registry_may_be_extended_after_build() {
    use weave_engine::{Interceptor, ProxyObject};

    let schema = account_schema();
    let proxy = ProxyFactory::new().builder(&schema).build().unwrap();

    let advisor = proxy
        .downcast::<ProxyObject>()
        .unwrap()
        .manager()
        .advisor()
        .clone();
    let interceptor: Arc<dyn Interceptor> =
        Arc::new(|_cx: &mut InvocationContext<'_>| -> CallResult { Ok(Value::Int(9)) });
    advisor.set_interceptor_by_name("balance", interceptor).unwrap();

    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::Int(9));
}

// ============================================================================
// Consumer Surface Tests
// ============================================================================

#[test]
fn test_unknown_method_name_is_native_failure() {
    let schema = account_schema();
    let proxy = ProxyFactory::new().builder(&schema).build().unwrap();

    let err = proxy.invoke("frobnicate", &[]).unwrap_err();
    assert!(matches!(err, EngineError::NativeExecution(_)));
}

#[test]
fn test_objref_invoke_works_on_plain_instances_too() {
    let schema = account_schema();
    let obj: ObjRef = InstanceBuilder::new(&schema)
        .method("owner", |_, _| Ok(Value::str("direct")))
        .build()
        .unwrap();

    assert_eq!(obj.invoke("owner", &[]).unwrap(), Value::str("direct"));
}
