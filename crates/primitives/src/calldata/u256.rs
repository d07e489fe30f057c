use num_bigint::BigUint;
use num_traits::{Num, ToPrimitive};
use serde::{Deserialize, Serialize};

use super::CalldataError;
use crate::Felt;

/// The two 128-bit limbs of a Cairo `u256`, as decimal strings.
///
/// The original value is `high * 2^128 + low`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct U256Parts {
    pub low: String,
    pub high: String,
}

/// Splits a non-negative integer into its `u256` limbs.
pub fn format_u256(value: &BigUint) -> Result<U256Parts, CalldataError> {
    let (low, high) = limbs(value)?;
    Ok(U256Parts { low: low.to_string(), high: high.to_string() })
}

/// Split a `u256` value into its low and high 128-bit parts represented as [Felt]s. The first
/// element in the returned tuple is the low part, and the second element is the high part, which
/// is also the order in which they appear in calldata.
pub fn split_u256(value: &BigUint) -> Result<(Felt, Felt), CalldataError> {
    let (low, high) = limbs(value)?;
    Ok((Felt::from(low), Felt::from(high)))
}

/// Inverse of [`split_u256`]. Fails if either limb is wider than 128 bits.
pub fn join_u256(low: Felt, high: Felt) -> Result<BigUint, CalldataError> {
    let low = limb_from_felt(low)?;
    let high = limb_from_felt(high)?;
    Ok((BigUint::from(high) << 128u32) + BigUint::from(low))
}

/// Parses a decimal or `0x`-prefixed hexadecimal integer literal.
pub fn parse_integer(literal: &str) -> Result<BigUint, CalldataError> {
    let literal = literal.trim();
    let parsed = match literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X")) {
        Some(hex) => BigUint::from_str_radix(hex, 16),
        None => BigUint::from_str_radix(literal, 10),
    };
    parsed.map_err(|_| CalldataError::InvalidInteger(literal.to_string()))
}

fn limbs(value: &BigUint) -> Result<(u128, u128), CalldataError> {
    if value.bits() > 256 {
        return Err(CalldataError::U256Overflow(value.to_string()));
    }

    let mask = BigUint::from(u128::MAX);
    let low = (value & &mask).to_u128();
    let high = (value >> 128u32).to_u128();

    match (low, high) {
        (Some(low), Some(high)) => Ok((low, high)),
        _ => Err(CalldataError::U256Overflow(value.to_string())),
    }
}

fn limb_from_felt(limb: Felt) -> Result<u128, CalldataError> {
    let bytes = limb.to_bytes_be();
    let (high, low) = bytes.split_at(16);

    if high.iter().any(|b| *b != 0) {
        return Err(CalldataError::LimbOverflow(limb));
    }

    let mut buf = [0u8; 16];
    buf.copy_from_slice(low);
    Ok(u128::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rstest::rstest;

    use super::*;

    fn two_pow(exp: u32) -> BigUint {
        BigUint::from(1u8) << exp
    }

    #[test]
    fn zero_has_zero_limbs() {
        let parts = format_u256(&BigUint::from(0u8)).unwrap();
        assert_eq!(parts, U256Parts { low: "0".into(), high: "0".into() });
    }

    #[test]
    fn max_u256_splits_into_two_max_limbs() {
        let max = two_pow(256) - 1u8;
        let (low, high) = split_u256(&max).unwrap();
        assert_eq!(low, Felt::from(u128::MAX));
        assert_eq!(high, Felt::from(u128::MAX));
    }

    #[rstest]
    #[case::small(BigUint::from(1_000_000u64))]
    #[case::limb_boundary(two_pow(128))]
    #[case::below_boundary(two_pow(128) - 1u8)]
    #[case::mixed(two_pow(200) + BigUint::from(12345u64))]
    #[case::max(two_pow(256) - 1u8)]
    fn limbs_recompose_to_the_original_value(#[case] value: BigUint) {
        let parts = format_u256(&value).unwrap();
        let low: BigUint = parts.low.parse().unwrap();
        let high: BigUint = parts.high.parse().unwrap();
        assert_eq!(high * two_pow(128) + low, value);

        let (low, high) = split_u256(&value).unwrap();
        assert_eq!(join_u256(low, high).unwrap(), value);
    }

    #[test]
    fn values_wider_than_256_bits_are_rejected() {
        assert_matches!(format_u256(&two_pow(256)), Err(CalldataError::U256Overflow(_)));
    }

    #[test]
    fn join_rejects_wide_limbs() {
        let wide = Felt::from(u128::MAX) + Felt::ONE;
        assert_matches!(join_u256(wide, Felt::ZERO), Err(CalldataError::LimbOverflow(_)));
    }

    #[rstest]
    #[case("42", 42u64)]
    #[case("0x2a", 42u64)]
    #[case(" 1000 ", 1000u64)]
    fn parses_integer_literals(#[case] literal: &str, #[case] expected: u64) {
        assert_eq!(parse_integer(literal).unwrap(), BigUint::from(expected));
    }

    #[test]
    fn rejects_garbage_literals() {
        assert_matches!(parse_integer("-1"), Err(CalldataError::InvalidInteger(_)));
        assert_matches!(parse_integer("0xzz"), Err(CalldataError::InvalidInteger(_)));
    }
}
