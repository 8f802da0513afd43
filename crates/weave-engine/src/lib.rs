//! Weave advice runtime
//!
//! A synchronous method-interception engine: callers obtain a synthetic
//! object (a proxy) that impersonates a declared type, and every method
//! invocation on it is routed through a configurable pipeline — delegate to
//! another object, run an interceptor, fall through to the real or default
//! implementation, observe the call with before/after/error wrappers, or
//! answer from a stub.
//!
//! # Example
//!
//! ```rust,ignore
//! use weave_engine::{ProxyFactory, SchemaBuilder, TypeDesc, Value};
//!
//! let schema = SchemaBuilder::new("Counter")
//!     .method("count", vec![], TypeDesc::Int)
//!     .build();
//!
//! let proxy = ProxyFactory::new()
//!     .builder(&schema)
//!     .intercept("count", |cx| cx.invoke_default())
//!     .build()?;
//!
//! let n = proxy.invoke("count", &[])?;
//! ```
//!
//! The engine is synchronous and reentrancy-safe per call: each invocation
//! gets its own context, and the only shared state is the read-mostly
//! advisor registry and the append-only default-method handle table.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Advisor registry: delegates, interceptors, wrappers, stub
pub mod advisor;

/// Per-invocation context handed to interceptors and wrappers
pub mod context;

/// Method dispatcher state machine
pub mod dispatch;

/// Engine error types
pub mod error;

/// Identity methods (`equals`, `hash_code`, `to_display`)
pub mod identity;

/// Invocation paths and the default-method handle table
pub mod invoke;

/// Call targets and concrete instances
pub mod object;

/// Proxy construction: manager, object, factory, builder
pub mod proxy;

/// Type schemas and method descriptors
pub mod schema;

/// Result validation and normalization
pub mod validate;

/// Dynamic value model
pub mod value;

pub use advisor::{AdvisorRegistry, CallbackWrapper, Interceptor, StubFn, Wrapper, zero_value_stub};
pub use context::{CallInfo, InvocationContext};
pub use error::{CallResult, EngineError, HookResult, Thrown};
pub use invoke::HandleTable;
pub use object::{CallTarget, Instance, InstanceBuilder};
pub use proxy::{ProxyBuilder, ProxyFactory, ProxyManager, ProxyObject};
pub use schema::{MethodBody, MethodDesc, MethodKey, SchemaBuilder, TypeSchema};
pub use validate::validate;
pub use value::{ObjRef, TypeDesc, TypeTag, Value};
