//! Host → boundary → host round trips
//!
//! Values are encoded, pushed through the C layout, read back and decoded, so
//! the encoder, the FFI mirror and the decoder are exercised together.

use bridge_types::{Value, ValueTag};
use node_bridge::ffi::{self, HostValues};
use node_bridge::{decode, encode, Encode, HostValue};
use num_bigint::BigInt;
use std::collections::HashMap;

/// Encode, cross the boundary layout, decode
fn round_trip<T: Encode + ?Sized>(value: &T) -> HostValue {
    let encoded = encode(value).unwrap();
    let raw = HostValues::alloc(std::slice::from_ref(&encoded)).unwrap();
    let copy = unsafe { ffi::read(&raw.first().unwrap()) }.unwrap();
    assert_eq!(copy, encoded);
    decode(&copy).unwrap()
}

#[test]
fn test_absent_round_trip() {
    assert_eq!(round_trip(&None::<String>), HostValue::None);
}

#[test]
fn test_bool_round_trip() {
    assert_eq!(round_trip(&true), HostValue::Bool(true));
    assert_eq!(round_trip(&false), HostValue::Bool(false));
}

#[test]
fn test_in_range_integer_round_trip() {
    assert_eq!(round_trip(&-17i64), HostValue::Float(-17.0));
}

#[test]
fn test_out_of_range_integer_round_trip() {
    let n = -(1i128 << 70);
    assert_eq!(round_trip(&n), HostValue::Int(BigInt::from(n)));
}

#[test]
fn test_float_round_trip() {
    assert_eq!(round_trip(&0.1f64), HostValue::Float(0.1));
    assert!(round_trip(&f64::NAN).as_f64().unwrap().is_nan());
}

#[test]
fn test_string_round_trip() {
    assert_eq!(round_trip("héllo, wörld ✓"), HostValue::from("héllo, wörld ✓"));
}

#[test]
fn test_numeric_boundary() {
    let max_safe = (1i64 << 53) - 1;
    assert_eq!(encode(&max_safe).unwrap().tag(), ValueTag::Number);
    assert_eq!(
        encode(&(1i64 << 53)).unwrap(),
        Value::BigInt("9007199254740992".into())
    );
}

#[test]
fn test_bigint_decode() {
    let host = decode(&Value::BigInt("123456789012345678901234567890".into())).unwrap();
    let expected: BigInt = "123456789012345678901234567890".parse().unwrap();
    assert_eq!(host, HostValue::Int(expected));
    assert!(decode(&Value::BigInt("abc".into())).is_err());
}

#[test]
fn test_nested_array_fidelity() {
    let value: (i32, &str, [i32; 2]) = (1, "a", [2, 3]);
    let host = round_trip(&value);
    let items = host.as_list().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], HostValue::Float(1.0));
    assert_eq!(items[1], HostValue::from("a"));
    assert_eq!(
        items[2],
        HostValue::List(vec![HostValue::Float(2.0), HostValue::Float(3.0)])
    );
}

#[test]
fn test_mixed_list_of_host_values() {
    let value = vec![
        HostValue::from(1.5),
        HostValue::from("two"),
        HostValue::None,
        HostValue::Int(BigInt::from(u64::MAX)),
    ];
    assert_eq!(round_trip(&value), HostValue::List(value.clone()));
}

#[test]
fn test_mapping_with_coerced_keys() {
    let mut map = HashMap::new();
    map.insert(1, "one");
    map.insert(22, "twenty-two");
    let host = round_trip(&map);
    let entries = host.as_map().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["1"], HostValue::from("one"));
    assert_eq!(entries["22"], HostValue::from("twenty-two"));
}

#[test]
fn test_host_map_round_trip() {
    let mut map = HashMap::new();
    map.insert("flag".to_string(), HostValue::Bool(false));
    map.insert(
        "inner".to_string(),
        HostValue::List(vec![HostValue::from("x")]),
    );
    let host = HostValue::Map(map);
    assert_eq!(round_trip(&host), host);
}
