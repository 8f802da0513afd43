//! Result validation and normalization
//!
//! The single point that guarantees a caller never observes a result
//! incompatible with the method's declared return type, regardless of which
//! route produced it. Void results are discarded, absent primitive results
//! are replaced with the type's zero value, and everything else must conform
//! to the declared slot (covariant object returns allowed).

use crate::error::{CallResult, EngineError};
use crate::schema::MethodDesc;
use crate::value::{TypeDesc, Value};

/// Check `raw` against `method`'s declared return type and normalize it.
pub fn validate(method: &MethodDesc, raw: Value) -> CallResult {
    let ret = method.ret();
    match ret {
        // Whatever the route produced, a void method yields no value.
        TypeDesc::Void => Ok(Value::Void),
        _ if ret.is_primitive() => match raw {
            Value::Null | Value::Void => Ok(ret.default_value()),
            v if ret.admits(&v) => Ok(v),
            v => Err(mismatch(method, &v)),
        },
        _ => match raw {
            Value::Null => Ok(Value::Null),
            v if ret.admits(&v) => Ok(v),
            v => Err(mismatch(method, &v)),
        },
    }
}

fn mismatch(method: &MethodDesc, value: &Value) -> EngineError {
    let actual = match value {
        Value::Object(obj) => obj.schema().name().to_string(),
        v => v.kind_name().to_string(),
    };
    EngineError::ResultTypeMismatch {
        method: method.name().to_string(),
        expected: method.ret().display_name(),
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::InstanceBuilder;
    use crate::schema::SchemaBuilder;

    fn method(ret: TypeDesc) -> MethodDesc {
        MethodDesc::new("m", vec![], ret, "T")
    }

    #[test]
    fn test_void_discards_result() {
        assert_eq!(validate(&method(TypeDesc::Void), Value::Int(5)).unwrap(), Value::Void);
        assert_eq!(validate(&method(TypeDesc::Void), Value::Null).unwrap(), Value::Void);
    }

    #[test]
    fn test_absent_primitive_becomes_zero_value() {
        assert_eq!(validate(&method(TypeDesc::Int), Value::Null).unwrap(), Value::Int(0));
        assert_eq!(
            validate(&method(TypeDesc::Bool), Value::Null).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            validate(&method(TypeDesc::Float), Value::Void).unwrap(),
            Value::Float(0.0)
        );
    }

    #[test]
    fn test_primitive_mismatch_is_fatal() {
        let err = validate(&method(TypeDesc::Int), Value::str("no")).unwrap_err();
        match err {
            EngineError::ResultTypeMismatch {
                method,
                expected,
                actual,
            } => {
                assert_eq!(method, "m");
                assert_eq!(expected, "int");
                assert_eq!(actual, "str");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reference_null_passes_through() {
        assert_eq!(validate(&method(TypeDesc::Str), Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_covariant_object_return() {
        let animal = SchemaBuilder::new("Animal").build();
        let dog = SchemaBuilder::new("Dog").extends(&animal).build();
        let pet = InstanceBuilder::new(&dog).build().unwrap();

        let m = method(TypeDesc::Object(animal.clone()));
        let validated = validate(&m, Value::object(pet.clone())).unwrap();
        assert_eq!(validated, Value::object(pet));

        let stranger = InstanceBuilder::new(&SchemaBuilder::new("Rock").build())
            .build()
            .unwrap();
        let err = validate(&m, Value::object(stranger)).unwrap_err();
        assert!(matches!(err, EngineError::ResultTypeMismatch { .. }));
    }
}
