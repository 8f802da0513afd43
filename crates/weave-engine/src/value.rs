//! Dynamic value model
//!
//! The engine intercepts calls whose signatures are only known at runtime, so
//! arguments and results travel as tagged `Value`s rather than native Rust
//! types. `TypeDesc` is the declared type of a parameter or return slot and
//! carries the zero-value and assignability rules the result validator relies
//! on; `TypeTag` is its erased, hashable form used in method keys.

use std::fmt;
use std::sync::Arc;

use crate::error::{CallResult, EngineError};
use crate::object::CallTarget;
use crate::schema::{MethodDesc, MethodKey, TypeSchema};

/// A dynamic value flowing through the engine
#[derive(Clone)]
pub enum Value {
    /// No value (void returns)
    Void,
    /// Absent reference
    Null,
    /// Boolean primitive
    Bool(bool),
    /// Integer primitive (64-bit)
    Int(i64),
    /// Floating-point primitive (64-bit)
    Float(f64),
    /// String reference
    Str(Arc<str>),
    /// Object reference
    Object(ObjRef),
}

impl Value {
    /// Build a string value
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Build an object value
    pub fn object(obj: ObjRef) -> Self {
        Value::Object(obj)
    }

    /// True for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean payload, if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer payload, if this is an `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float payload, if this is a `Float`
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string payload, if this is a `Str`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The object payload, if this is an `Object`
    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Short kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "Void"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(o) => write!(f, "Object({o:?})"),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for scalars, reference identity for objects.
    ///
    /// Delegate-aware `equals` semantics live in the identity handler, not
    /// here; this comparison is what `==` means for raw values.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Shared handle to an invokable object (instance or proxy)
#[derive(Clone)]
pub struct ObjRef(Arc<dyn CallTarget>);

impl ObjRef {
    /// Wrap an already-shared call target
    pub fn from_arc(target: Arc<dyn CallTarget>) -> Self {
        ObjRef(target)
    }

    /// The object's declared capability set
    pub fn schema(&self) -> &Arc<TypeSchema> {
        self.0.schema()
    }

    /// Stable identity of the underlying object
    pub fn identity(&self) -> u64 {
        self.0.identity()
    }

    /// Reference identity: do both handles point at the same object?
    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        self.0.identity() == other.0.identity()
    }

    /// Whether the object can answer the given method
    pub fn responds_to(&self, key: &MethodKey) -> bool {
        self.0.responds_to(key)
    }

    /// Invoke a method by descriptor
    pub fn invoke_method(&self, method: &MethodDesc, args: &[Value]) -> CallResult {
        self.0.invoke(method, args)
    }

    /// Invoke a method by name, resolving the descriptor through the schema.
    ///
    /// The three identity methods (`equals`, `hash_code`, `to_display`) are
    /// answerable on every object even when the schema does not declare them.
    pub fn invoke(&self, name: &str, args: &[Value]) -> CallResult {
        let method = match self.schema().find_by_name(name) {
            Some(m) => m.clone(),
            None => crate::identity::builtin_desc(name).ok_or_else(|| {
                EngineError::NativeExecution(format!(
                    "no method `{}` on `{}`",
                    name,
                    self.schema().name()
                ))
            })?,
        };
        self.0.invoke(&method, args)
    }

    /// Downcast the underlying object to a concrete type
    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.0.schema().name(), self.0.identity())
    }
}

/// Declared type of a parameter or return slot
#[derive(Clone)]
pub enum TypeDesc {
    /// No return value
    Void,
    /// Boolean primitive
    Bool,
    /// Integer primitive
    Int,
    /// Floating-point primitive
    Float,
    /// String reference
    Str,
    /// Object reference conforming to a schema
    Object(Arc<TypeSchema>),
    /// Any non-void value (reference semantics)
    Any,
}

impl TypeDesc {
    /// True for the primitive slots (`Bool`, `Int`, `Float`)
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDesc::Bool | TypeDesc::Int | TypeDesc::Float)
    }

    /// The type-appropriate default: zero values for primitives, `Null` for
    /// references, `Void` for void
    pub fn default_value(&self) -> Value {
        match self {
            TypeDesc::Void => Value::Void,
            TypeDesc::Bool => Value::Bool(false),
            TypeDesc::Int => Value::Int(0),
            TypeDesc::Float => Value::Float(0.0),
            TypeDesc::Str | TypeDesc::Object(_) | TypeDesc::Any => Value::Null,
        }
    }

    /// Whether a non-null value conforms to this slot. Object slots accept
    /// covariant returns via the schema supertype walk.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeDesc::Void, Value::Void) => true,
            (TypeDesc::Bool, Value::Bool(_)) => true,
            (TypeDesc::Int, Value::Int(_)) => true,
            (TypeDesc::Float, Value::Float(_)) => true,
            (TypeDesc::Str, Value::Str(_)) => true,
            (TypeDesc::Object(schema), Value::Object(obj)) => obj.schema().implements(schema),
            (TypeDesc::Any, v) => !matches!(v, Value::Void),
            _ => false,
        }
    }

    /// Erase to the hashable tag used inside `MethodKey`
    pub fn erased(&self) -> TypeTag {
        match self {
            TypeDesc::Void => TypeTag::Void,
            TypeDesc::Bool => TypeTag::Bool,
            TypeDesc::Int => TypeTag::Int,
            TypeDesc::Float => TypeTag::Float,
            TypeDesc::Str => TypeTag::Str,
            TypeDesc::Object(schema) => TypeTag::Object(schema.name().to_string()),
            TypeDesc::Any => TypeTag::Any,
        }
    }

    /// Display name for error messages
    pub fn display_name(&self) -> String {
        match self {
            TypeDesc::Void => "void".to_string(),
            TypeDesc::Bool => "bool".to_string(),
            TypeDesc::Int => "int".to_string(),
            TypeDesc::Float => "float".to_string(),
            TypeDesc::Str => "str".to_string(),
            TypeDesc::Object(schema) => schema.name().to_string(),
            TypeDesc::Any => "any".to_string(),
        }
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Erased, hashable form of `TypeDesc`; object types erase to the schema name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// No value
    Void,
    /// Boolean primitive
    Bool,
    /// Integer primitive
    Int,
    /// Floating-point primitive
    Float,
    /// String reference
    Str,
    /// Named object type
    Object(String),
    /// Any value
    Any,
}
