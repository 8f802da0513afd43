//! Engine error types
//!
//! One engine-wide error enum, `EngineError`, with four kinds:
//! - `Configuration` — raised at registration time, never deferred to call time
//! - `NativeExecution` — the engine could not perform a mechanical step
//! - `ResultTypeMismatch` — a produced value is incompatible with the declared
//!   return type
//! - `Thrown` — a business exception from a delegate, interceptor, wrapper, or
//!   real implementation; propagated unmodified
//!
//! The engine recovers nothing locally except substituting default values for
//! absent primitive results; everything else surfaces to the immediate caller.

use thiserror::Error;

use crate::value::Value;

/// A dynamic exception raised by business code running under the engine.
///
/// `kind` carries the logical exception type name (e.g. `IllegalState`) and
/// `message` the human-readable detail. The dispatcher passes `Thrown` values
/// through unmodified so the caller observes exactly what business code threw.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Thrown {
    /// Logical exception type name
    pub kind: String,
    /// Detail message
    pub message: String,
}

impl Thrown {
    /// Create a new business exception value
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by the proxy advisory engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Advice was registered against a method or type that does not exist on
    /// the advised schema. Always fatal to the configuration call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The engine itself could not perform a mechanical step (no resolvable
    /// method body, dropped self-reference, missing argument).
    #[error("native execution failure: {0}")]
    NativeExecution(String),

    /// A routed call produced a value incompatible with the method's declared
    /// return type. Signals a programming error in the interceptor/delegate.
    #[error("result of `{method}` does not match its return type: expected {expected}, got {actual}")]
    ResultTypeMismatch {
        /// Method whose result was rejected
        method: String,
        /// Declared return type
        expected: String,
        /// Kind of the offending value
        actual: String,
    },

    /// A business exception, propagated unmodified
    #[error(transparent)]
    Thrown(#[from] Thrown),
}

impl EngineError {
    /// Shorthand for raising a business exception
    pub fn thrown(kind: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Thrown(Thrown::new(kind, message))
    }

    /// The business exception carried by this error, if any
    pub fn as_thrown(&self) -> Option<&Thrown> {
        match self {
            EngineError::Thrown(t) => Some(t),
            _ => None,
        }
    }
}

/// Result of a routed method call
pub type CallResult = Result<Value, EngineError>;

/// Result of a wrapper hook
pub type HookResult = Result<(), EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrown_display() {
        let t = Thrown::new("IllegalState", "x");
        assert_eq!(t.to_string(), "IllegalState: x");
    }

    #[test]
    fn test_thrown_passes_through_engine_error() {
        let err = EngineError::thrown("IllegalState", "x");
        let t = err.as_thrown().unwrap();
        assert_eq!(t.kind, "IllegalState");
        assert_eq!(t.message, "x");
        assert_eq!(err.to_string(), "IllegalState: x");
    }

    #[test]
    fn test_configuration_is_not_thrown() {
        let err = EngineError::Configuration("no such method".into());
        assert!(err.as_thrown().is_none());
    }
}
