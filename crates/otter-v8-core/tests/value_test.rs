//! Integration tests for value construction and conversion

use num_bigint::BigInt;
use otter_v8_core::{Context, Isolate, V8Error, Value, ValueKind};

#[test]
fn test_primitives_from_host() {
    let iso = Isolate::new();

    let s = Value::new(&iso, "hello").unwrap();
    assert!(s.is_string());
    assert!(s.is_name());
    assert_eq!(s.to_string(), "hello");

    let n = Value::new(&iso, 42).unwrap();
    assert!(n.is_int32() && n.is_number());
    assert_eq!(n.int32(), 42);

    let u = Value::new(&iso, u32::MAX).unwrap();
    assert!(u.is_uint32());
    assert!(!u.is_int32());
    assert_eq!(u.uint32(), u32::MAX);

    let f = Value::new(&iso, 1.5).unwrap();
    assert_eq!(f.number(), 1.5);
    assert!(!f.is_int32());

    let b = Value::new(&iso, true).unwrap();
    assert!(b.is_boolean() && b.is_true());
    assert!(!b.is_false());

    assert!(s.context().is_none());
}

#[test]
fn test_64_bit_integers_become_numbers() {
    let iso = Isolate::new();
    let big = Value::new(&iso, 1i64 << 40).unwrap();
    assert!(big.is_number());
    assert!(!big.is_big_int());
    assert_eq!(big.int64(), 1i64 << 40);

    let neg = Value::new(&iso, -7i64).unwrap();
    assert_eq!(neg.int32(), -7);
    assert_eq!(Value::new(&iso, 9u64).unwrap().uint64(), 9);
}

#[test]
fn test_undefined_and_null() {
    let iso = Isolate::new();
    let undefined = Value::undefined(&iso).unwrap();
    let null = Value::null(&iso).unwrap();
    assert!(undefined.is_undefined() && undefined.is_null_or_undefined());
    assert!(null.is_null() && null.is_null_or_undefined());
    assert!(!null.is_undefined());
    assert_eq!(undefined.to_string(), "undefined");
    assert_eq!(null.to_string(), "null");
    assert!(matches!(null.to_object(), Err(V8Error::Js(_))));
}

#[test]
fn test_bigint_round_trip() {
    let iso = Isolate::new();
    let big: BigInt = (BigInt::from(1u8) << 80) - 3;
    let value = Value::new(&iso, big.clone()).unwrap();
    assert!(value.is_big_int());
    assert_eq!(value.big_int(), Some(big));

    let negative = Value::new(&iso, BigInt::from(-12)).unwrap();
    assert_eq!(negative.big_int(), Some(BigInt::from(-12)));
    assert_eq!(negative.to_string(), "-12");

    assert_eq!(Value::new(&iso, 5).unwrap().big_int(), None);
}

#[test]
fn test_bigint_from_script() {
    let ctx = Context::with_new_isolate().unwrap();
    let value = ctx.run_script("2n ** 100n", "big.js").unwrap();
    let expected = BigInt::from(1u8) << 100;
    assert_eq!(value.big_int(), Some(expected));
    assert_eq!(value.int64(), 0);
}

#[test]
fn test_kind_predicates_on_script_values() {
    let ctx = Context::with_new_isolate().unwrap();
    let cases: &[(&str, ValueKind)] = &[
        ("new Date()", ValueKind::Date),
        ("/a+/g", ValueKind::RegExp),
        ("new Map()", ValueKind::Map),
        ("new Set()", ValueKind::Set),
        ("new WeakMap()", ValueKind::WeakMap),
        ("[1, 2]", ValueKind::Array),
        ("new ArrayBuffer(4)", ValueKind::ArrayBuffer),
        ("new Uint8Array(2)", ValueKind::Uint8Array),
        ("new Float64Array(2)", ValueKind::Float64Array),
        ("new DataView(new ArrayBuffer(2))", ValueKind::DataView),
        ("Promise.resolve(1)", ValueKind::Promise),
        ("async () => 1", ValueKind::AsyncFunction),
        ("(function* () {})", ValueKind::GeneratorFunction),
        ("new Proxy({}, {})", ValueKind::Proxy),
        ("new TypeError('x')", ValueKind::NativeError),
        ("new String('x')", ValueKind::StringObject),
        ("Symbol('x')", ValueKind::Symbol),
        ("(function () { return arguments; })()", ValueKind::ArgumentsObject),
    ];
    for (source, kind) in cases {
        let value = ctx.run_script(source, "kinds.js").unwrap();
        assert!(value.is(*kind), "{source} should be {kind:?}");
    }

    let array = ctx.run_script("[1, 2]", "kinds.js").unwrap();
    assert!(array.is_object());
    assert!(!array.is_function());
    assert!(!array.is_typed_array());
}

#[test]
fn test_same_value_and_strict_equals() {
    let ctx = Context::with_new_isolate().unwrap();
    let nan = ctx.run_script("NaN", "eq.js").unwrap();
    let other_nan = ctx.run_script("0 / 0", "eq.js").unwrap();
    assert!(nan.same_value(&other_nan));
    assert!(!nan.strict_equals(&other_nan));

    let zero = ctx.run_script("0", "eq.js").unwrap();
    let neg_zero = ctx.run_script("-0", "eq.js").unwrap();
    assert!(zero.strict_equals(&neg_zero));
    assert!(!zero.same_value(&neg_zero));

    let obj = ctx.run_script("globalThis.o = {}; o", "eq.js").unwrap();
    let again = ctx.run_script("o", "eq.js").unwrap();
    assert!(obj.strict_equals(&again));
}

#[test]
fn test_uint8_array_bytes() {
    let iso = Isolate::new();
    let value = Value::new(&iso, vec![1u8, 2, 3]).unwrap();
    assert!(value.is_uint8_array());
    assert_eq!(value.uint8_array(), vec![1, 2, 3]);

    let not_bytes = Value::new(&iso, "abc").unwrap();
    assert!(not_bytes.uint8_array().is_empty());
}

#[test]
fn test_detail_string_and_display() {
    let ctx = Context::with_new_isolate().unwrap();
    let sym = ctx.run_script("Symbol('tag')", "detail.js").unwrap();
    assert_eq!(sym.detail_string(), "Symbol(tag)");
    assert_eq!(sym.to_string(), "Symbol(tag)");

    let obj = ctx.run_script("({})", "detail.js").unwrap();
    assert_eq!(obj.to_string(), "[object Object]");
    assert_eq!(format!("{obj:?}"), "Value([object Object])");
}

#[test]
fn test_typed_view_mismatch_is_type_error() {
    let iso = Isolate::new();
    let n = Value::new(&iso, 1).unwrap();
    match n.as_function() {
        Err(V8Error::TypeError { expected, actual }) => {
            assert_eq!(expected, "Function");
            assert_eq!(actual, "Number");
        }
        other => panic!("expected type error, got {other:?}"),
    }
}

#[test]
fn test_to_object_boxes_primitives() {
    let ctx = Context::with_new_isolate().unwrap();
    let s = ctx.run_script("'abc'", "box.js").unwrap();
    let boxed = s.to_object().unwrap();
    assert!(boxed.is_string_object());
    assert_eq!(boxed.get("length").unwrap().int32(), 3);
}

#[test]
fn test_clone_is_independent_reference() {
    let iso = Isolate::new();
    let a = Value::new(&iso, "shared").unwrap();
    let b = a.clone();
    drop(a);
    assert_eq!(b.to_string(), "shared");
}
