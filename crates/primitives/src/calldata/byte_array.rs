use super::{felt_to_usize, BYTES_PER_WORD};
use crate::Felt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ByteArrayError {
    #[error("byte array is truncated")]
    Truncated,

    #[error("expected {expected} felts for {words} full words, got {actual}")]
    LengthMismatch { words: usize, expected: usize, actual: usize },

    #[error("pending word length {0} must be less than 31")]
    InvalidPendingLength(usize),

    #[error("word {0:#x} does not fit in the declared number of bytes")]
    WordOverflow(Felt),

    #[error("byte array is not valid utf-8")]
    InvalidUtf8,
}

/// Serializes a string into the Cairo `ByteArray` calldata layout.
///
/// The layout is `[full_word_count, ...full_words, pending_word, pending_word_len]`. The pending
/// word and its length are always present, even when the input length is a multiple of 31.
pub fn encode_byte_array(value: &str) -> Vec<Felt> {
    encode_bytes(value.as_bytes())
}

/// Same as [`encode_byte_array`] but over raw bytes.
pub fn encode_bytes(bytes: &[u8]) -> Vec<Felt> {
    let words = bytes.chunks_exact(BYTES_PER_WORD);
    let pending = words.remainder();

    let mut felts = Vec::with_capacity(bytes.len() / BYTES_PER_WORD + 3);
    felts.push(Felt::from(bytes.len() / BYTES_PER_WORD));
    felts.extend(words.map(Felt::from_bytes_be_slice));
    felts.push(Felt::from_bytes_be_slice(pending));
    felts.push(Felt::from(pending.len()));
    felts
}

/// Number of felts [`encode_bytes`] produces for an input of `len` bytes.
pub fn encoded_byte_array_len(len: usize) -> usize {
    len / BYTES_PER_WORD + 3
}

/// Decodes a `ByteArray` calldata sequence back into raw bytes.
///
/// The input must contain exactly one serialized byte array.
pub fn decode_byte_array(felts: &[Felt]) -> Result<Vec<u8>, ByteArrayError> {
    let (count, rest) = felts.split_first().ok_or(ByteArrayError::Truncated)?;
    let words = felt_to_usize(count).ok_or(ByteArrayError::Truncated)?;

    let expected = words.checked_add(2).ok_or(ByteArrayError::Truncated)?;
    if rest.len() != expected {
        return Err(ByteArrayError::LengthMismatch {
            words,
            expected: expected + 1,
            actual: felts.len(),
        });
    }

    let (full, tail) = rest.split_at(words);
    let pending_word = tail[0];
    let pending_len = felt_to_usize(&tail[1]).unwrap_or(usize::MAX);
    if pending_len >= BYTES_PER_WORD {
        return Err(ByteArrayError::InvalidPendingLength(pending_len));
    }

    let mut bytes = Vec::with_capacity(words * BYTES_PER_WORD + pending_len);
    for word in full {
        bytes.extend(word_bytes(word, BYTES_PER_WORD)?);
    }
    bytes.extend(word_bytes(&pending_word, pending_len)?);

    Ok(bytes)
}

/// Decodes a `ByteArray` calldata sequence into a UTF-8 string.
pub fn decode_byte_array_string(felts: &[Felt]) -> Result<String, ByteArrayError> {
    String::from_utf8(decode_byte_array(felts)?).map_err(|_| ByteArrayError::InvalidUtf8)
}

fn word_bytes(word: &Felt, len: usize) -> Result<Vec<u8>, ByteArrayError> {
    let bytes = word.to_bytes_be();
    let (padding, content) = bytes.split_at(bytes.len() - len);

    if padding.iter().any(|b| *b != 0) {
        return Err(ByteArrayError::WordOverflow(*word));
    }

    Ok(content.to_vec())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rstest::rstest;

    use super::*;

    #[test]
    fn empty_string_is_three_zero_felts() {
        assert_eq!(encode_byte_array(""), vec![Felt::ZERO, Felt::ZERO, Felt::ZERO]);
    }

    #[test]
    fn thirty_bytes_fit_in_the_pending_word() {
        let input = "a".repeat(30);
        let felts = encode_byte_array(&input);

        assert_eq!(felts.len(), 3);
        assert_eq!(felts[0], Felt::ZERO);
        assert_eq!(felts[1], Felt::from_bytes_be_slice(input.as_bytes()));
        assert_eq!(felts[2], Felt::from(30u8));
    }

    #[test]
    fn thirty_one_bytes_fill_exactly_one_word() {
        let input = "b".repeat(31);
        let felts = encode_byte_array(&input);

        assert_eq!(felts.len(), 4);
        assert_eq!(felts[0], Felt::ONE);
        assert_eq!(felts[1], Felt::from_bytes_be_slice(input.as_bytes()));
        assert_eq!(felts[2], Felt::ZERO);
        assert_eq!(felts[3], Felt::ZERO);
    }

    #[test]
    fn thirty_two_bytes_spill_one_byte_into_the_pending_word() {
        let input = format!("{}z", "c".repeat(31));
        let felts = encode_byte_array(&input);

        assert_eq!(felts.len(), 4);
        assert_eq!(felts[0], Felt::ONE);
        assert_eq!(felts[2], Felt::from(b'z'));
        assert_eq!(felts[3], Felt::ONE);
    }

    #[test]
    fn sixty_one_bytes_leave_a_thirty_byte_pending_word() {
        let input = format!("{}{}", "d".repeat(31), "e".repeat(30));
        let felts = encode_byte_array(&input);

        assert_eq!(felts.len(), 4);
        assert_eq!(felts[0], Felt::ONE);
        assert_eq!(felts[2], Felt::from_bytes_be_slice("e".repeat(30).as_bytes()));
        assert_eq!(felts[3], Felt::from(30u8));
    }

    #[test]
    fn known_vector_matches_cairo_serialization() {
        // "hello" is a single pending word: 0x68656c6c6f with a length of 5.
        let felts = encode_byte_array("hello");
        let word = Felt::from_hex("0x68656c6c6f").unwrap();
        assert_eq!(felts, vec![Felt::ZERO, word, Felt::from(5u8)]);
    }

    #[rstest]
    #[case(0)]
    #[case(30)]
    #[case(31)]
    #[case(32)]
    #[case(61)]
    #[case(62)]
    #[case(100)]
    fn decoding_restores_the_input(#[case] len: usize) {
        let input: String = (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let felts = encode_byte_array(&input);

        assert_eq!(felts.len(), encoded_byte_array_len(len));
        assert_eq!(decode_byte_array_string(&felts).unwrap(), input);
    }

    #[test]
    fn multibyte_utf8_is_preserved() {
        let input = "café ☕ from the highlands of Costa Rica";
        assert_eq!(decode_byte_array_string(&encode_byte_array(input)).unwrap(), input);
    }

    #[test]
    fn decode_rejects_malformed_input() {
        assert_matches!(decode_byte_array(&[]), Err(ByteArrayError::Truncated));

        let missing_word = [Felt::ONE, Felt::ZERO, Felt::ZERO];
        assert_matches!(
            decode_byte_array(&missing_word),
            Err(ByteArrayError::LengthMismatch { words: 1, expected: 4, actual: 3 })
        );

        let bad_pending = [Felt::ZERO, Felt::ZERO, Felt::from(31u8)];
        assert_matches!(
            decode_byte_array(&bad_pending),
            Err(ByteArrayError::InvalidPendingLength(31))
        );

        let wide_pending = [Felt::ZERO, Felt::from(0x1234u16), Felt::ONE];
        assert_matches!(decode_byte_array(&wide_pending), Err(ByteArrayError::WordOverflow(_)));
    }
}
