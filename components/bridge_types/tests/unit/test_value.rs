//! Unit tests for Value, ValueTag and the numeric helpers

use bridge_types::{
    fits_safe_integer, parse_bigint, FunctionHandle, FunctionRef, Value, ValueTag,
    MAX_SAFE_INTEGER,
};

#[cfg(test)]
mod tag_tests {
    use super::*;

    #[test]
    fn test_every_variant_reports_its_tag() {
        let function = FunctionRef::new(FunctionHandle::from_raw(std::ptr::null_mut()), "f");
        let cases = vec![
            (Value::Undefined, ValueTag::Undefined),
            (Value::Null, ValueTag::Null),
            (Value::Boolean(true), ValueTag::Boolean),
            (Value::Number(1.5), ValueTag::Number),
            (Value::String("s".into()), ValueTag::String),
            (Value::Symbol(None), ValueTag::Symbol),
            (Value::Function(function), ValueTag::Function),
            (Value::Array(vec![]), ValueTag::Array),
            (Value::BigInt("1".into()), ValueTag::BigInt),
            (Value::Object(vec![]), ValueTag::Object),
            (Value::Unknown, ValueTag::Unknown),
        ];
        for (value, tag) in cases {
            assert_eq!(value.tag(), tag);
        }
    }

    #[test]
    fn test_abi_discriminants_are_stable() {
        assert_eq!(ValueTag::Undefined.as_raw(), 0);
        assert_eq!(ValueTag::Function.as_raw(), 6);
        assert_eq!(ValueTag::Object.as_raw(), 9);
        assert_eq!(ValueTag::Unknown.as_raw(), 10);
    }

    #[test]
    fn test_primitives_own_no_heap() {
        for tag in [ValueTag::Undefined, ValueTag::Null, ValueTag::Boolean, ValueTag::Number] {
            assert!(!tag.owns_heap(), "{} should not own heap memory", tag);
        }
    }
}

#[cfg(test)]
mod numeric_tests {
    use super::*;

    #[test]
    fn test_max_safe_integer_value() {
        assert_eq!(MAX_SAFE_INTEGER, 9_007_199_254_740_991);
        assert!(fits_safe_integer(MAX_SAFE_INTEGER as i128));
        assert!(!fits_safe_integer(9_007_199_254_740_992));
    }

    #[test]
    fn test_parse_large_bigint() {
        let n = parse_bigint("123456789012345678901234567890").unwrap();
        assert_eq!(n.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn test_parse_bigint_rejects_letters() {
        assert!(parse_bigint("abc").is_err());
        assert!(parse_bigint("12a").is_err());
    }
}

#[cfg(test)]
mod display_tests {
    use super::*;

    #[test]
    fn test_nullish_array_elements_render_empty() {
        let value = Value::Array(vec![Value::Number(1.0), Value::Null, Value::Number(3.0)]);
        assert_eq!(value.to_string(), "1,,3");
    }

    #[test]
    fn test_function_display() {
        let value = Value::Function(FunctionRef::new(
            FunctionHandle::from_raw(std::ptr::null_mut()),
            "readFile",
        ));
        assert_eq!(value.to_string(), "function readFile() { [native code] }");
    }

    #[test]
    fn test_symbol_display() {
        assert_eq!(Value::Symbol(Some("tag".into())).to_string(), "Symbol(tag)");
        assert_eq!(Value::Symbol(None).to_string(), "Symbol()");
    }
}
