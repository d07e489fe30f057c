//! Conversions from high level values into the felt sequences expected by Cairo contracts.
//!
//! Cairo's serialization of the core types is mechanical but easy to get subtly wrong at the
//! boundaries:
//!
//! - `u256` is serialized as two 128-bit limbs, **low first**.
//! - `ByteArray` is serialized as `[full_word_count, ...words, pending_word, pending_word_len]`
//!   where every full word carries exactly 31 bytes.
//! - Short strings are at most 31 ASCII bytes packed big-endian into a single felt.

use crate::Felt;

mod byte_array;
mod u256;

pub use byte_array::*;
pub use u256::*;

/// Maximum number of bytes that fit in a single felt word of a Cairo string.
pub const BYTES_PER_WORD: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalldataError {
    #[error("value {0} does not fit in a u256")]
    U256Overflow(String),

    #[error("limb {0:#x} does not fit in 128 bits")]
    LimbOverflow(Felt),

    #[error("invalid integer literal '{0}'")]
    InvalidInteger(String),

    #[error("short string '{0}' is longer than 31 bytes")]
    ShortStringTooLong(String),

    #[error("short string '{0}' contains non-ASCII characters")]
    ShortStringNotAscii(String),
}

/// Packs an ASCII string of at most 31 bytes into a single felt.
pub fn encode_short_string(value: &str) -> Result<Felt, CalldataError> {
    if !value.is_ascii() {
        return Err(CalldataError::ShortStringNotAscii(value.to_string()));
    }

    if value.len() > BYTES_PER_WORD {
        return Err(CalldataError::ShortStringTooLong(value.to_string()));
    }

    Ok(Felt::from_bytes_be_slice(value.as_bytes()))
}

/// Reads a felt as a `usize`, returning `None` if it doesn't fit.
pub(crate) fn felt_to_usize(value: &Felt) -> Option<usize> {
    let bytes = value.to_bytes_be();
    let (high, low) = bytes.split_at(24);

    if high.iter().any(|b| *b != 0) {
        return None;
    }

    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    usize::try_from(u64::from_be_bytes(buf)).ok()
}
