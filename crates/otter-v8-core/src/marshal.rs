//! Host primitives accepted by value constructors and property setters

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

/// A host value that converts into a JavaScript primitive.
///
/// | Rust | JavaScript |
/// |---|---|
/// | `&str`, `String` | string |
/// | `i32`, `u32`, `f64` | number |
/// | `i64`, `u64` | number (exact below 2^53, rounded beyond) |
/// | `bool` | boolean |
/// | `BigInt` | bigint |
/// | `Vec<u8>`, `&[u8]` | `Uint8Array` over a fresh buffer |
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    String(String),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Number(f64),
    Boolean(bool),
    BigInt(BigInt),
    Bytes(Vec<u8>),
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Primitive {
                fn from(v: $ty) -> Self {
                    Primitive::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_primitive! {
    &str => String,
    String => String,
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    f64 => Number,
    bool => Boolean,
    BigInt => BigInt,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
}

impl From<&String> for Primitive {
    fn from(v: &String) -> Self {
        Primitive::String(v.clone())
    }
}

/// Split a BigInt into a sign bit and little-endian 64-bit words.
pub(crate) fn bigint_to_words(value: &BigInt) -> (bool, Vec<u64>) {
    let negative = value.sign() == Sign::Minus;
    let mut words = value.magnitude().to_u64_digits();
    if words.is_empty() {
        words.push(0);
    }
    (negative, words)
}

/// Rebuild a BigInt from a sign bit and little-endian 64-bit words.
pub(crate) fn words_to_bigint(negative: bool, words: &[u64]) -> BigInt {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    let magnitude = BigUint::from_bytes_le(&bytes);
    if magnitude.is_zero() {
        return BigInt::zero();
    }
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    BigInt::from_biguint(sign, magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_bigint_is_one_word() {
        let (negative, words) = bigint_to_words(&BigInt::from(-42));
        assert!(negative);
        assert_eq!(words, vec![42]);
    }

    #[test]
    fn test_zero_has_one_word() {
        let (negative, words) = bigint_to_words(&BigInt::zero());
        assert!(!negative);
        assert_eq!(words, vec![0]);
    }

    #[test]
    fn test_multi_word_bigint() {
        // 2^64 + 5
        let value = (BigInt::from(1u8) << 64) + 5;
        let (negative, words) = bigint_to_words(&value);
        assert!(!negative);
        assert_eq!(words, vec![5, 1]);
        assert_eq!(words_to_bigint(negative, &words), value);
    }

    #[test]
    fn test_words_to_bigint_restores_sign() {
        let value = -(BigInt::from(u64::MAX) * 3u32);
        let (negative, words) = bigint_to_words(&value);
        assert_eq!(words_to_bigint(negative, &words), value);
    }

    #[test]
    fn test_negative_zero_words_normalize() {
        assert_eq!(words_to_bigint(true, &[0, 0]), BigInt::zero());
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Primitive::from("a"), Primitive::String("a".into()));
        assert_eq!(Primitive::from(7i64), Primitive::Int64(7));
        assert_eq!(Primitive::from(&[1u8, 2][..]), Primitive::Bytes(vec![1, 2]));
        assert_eq!(Primitive::from(true), Primitive::Boolean(true));
    }
}
