//! RLP (Recursive Length Prefix) codec.
//!
//! Decodes a byte sequence into a tree of byte strings and lists, and
//! encodes such trees (or individual values) back into bytes. RLP frames
//! every Ethereum transaction and is also the payload that gets hashed for
//! signing.
//!
//! # Format
//!
//! RLP encoding rules:
//! - Single byte [0x00, 0x7f]: itself
//! - String [0x80, 0xb7]: 0x80 + len, then data
//! - String [0xb8, 0xbf]: 0xb7 + len_of_len, then len, then data
//! - List [0xc0, 0xf7]: 0xc0 + len, then items
//! - List [0xf8, 0xff]: 0xf7 + len_of_len, then len, then items
//!
//! # Security
//!
//! - Validates all length fields before access
//! - Rejects non-canonical encodings, so `encode(decode(b)) == b`
//! - Bounded recursion depth (max 16)
//! - Decoded strings borrow from the input; no copies

use core::fmt;

use ethtx_common::{EncodingError, TxError, U256Bytes};

/// Maximum RLP nesting depth.
const MAX_DEPTH: usize = 16;

/// Payloads up to this many bytes use the short form.
const SHORT_LIMIT: usize = 55;

/// RLP decoding errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlpError {
    /// Input is empty when data expected.
    EmptyInput,
    /// Input too short for declared length.
    UnexpectedEof,
    /// Non-canonical encoding (leading zeros in length, long form for short data).
    NonCanonical,
    /// Single byte should be encoded as itself.
    SingleByteMismatch,
    /// Length field is too large.
    LengthOverflow,
    /// Exceeded maximum nesting depth.
    TooDeep,
    /// Expected list but got string.
    ExpectedList,
    /// Expected string but got list.
    ExpectedString,
    /// Extra data after RLP item.
    TrailingData,
    /// Integer with a leading zero byte.
    LeadingZero,
    /// Integer wider than the requested type.
    IntegerOverflow,
}

impl From<RlpError> for EncodingError {
    fn from(e: RlpError) -> Self {
        match e {
            RlpError::EmptyInput => EncodingError::EmptyInput,
            RlpError::UnexpectedEof => EncodingError::Truncated,
            RlpError::NonCanonical => EncodingError::NonCanonicalLength,
            RlpError::SingleByteMismatch => EncodingError::NonCanonicalByte,
            RlpError::LengthOverflow => EncodingError::LengthOverflow,
            RlpError::TooDeep => EncodingError::TooDeep,
            RlpError::ExpectedList => EncodingError::ExpectedList,
            RlpError::ExpectedString => EncodingError::ExpectedString,
            RlpError::TrailingData => EncodingError::TrailingData,
            RlpError::LeadingZero => EncodingError::LeadingZero,
            RlpError::IntegerOverflow => EncodingError::IntegerOverflow,
        }
    }
}

impl From<RlpError> for TxError {
    fn from(e: RlpError) -> Self {
        TxError::InvalidEncoding(e.into())
    }
}

impl fmt::Display for RlpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        EncodingError::from(*self).fmt(f)
    }
}

/// A decoded RLP item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem<'a> {
    /// A byte string (may be empty).
    String(&'a [u8]),
    /// A list of items.
    List(Vec<RlpItem<'a>>),
}

impl<'a> RlpItem<'a> {
    /// Returns the string data if this is a string item.
    pub fn as_string(&self) -> Result<&'a [u8], RlpError> {
        match self {
            RlpItem::String(data) => Ok(data),
            RlpItem::List(_) => Err(RlpError::ExpectedString),
        }
    }

    /// Returns the list items if this is a list item.
    pub fn as_list(&self) -> Result<&[RlpItem<'a>], RlpError> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::String(_) => Err(RlpError::ExpectedList),
        }
    }

    /// Returns the big-endian magnitude of a canonical integer.
    ///
    /// Zero is the empty string; any other value must not start with 0x00.
    pub fn as_uint_bytes(&self) -> Result<&'a [u8], RlpError> {
        let data = self.as_string()?;
        if data.first() == Some(&0) {
            return Err(RlpError::LeadingZero);
        }
        Ok(data)
    }

    /// Converts string data to a u64 value (big-endian).
    pub fn as_u64(&self) -> Result<u64, RlpError> {
        let data = self.as_uint_bytes()?;
        if data.len() > 8 {
            return Err(RlpError::IntegerOverflow);
        }
        Ok(data.iter().fold(0u64, |acc, &byte| acc << 8 | byte as u64))
    }

    /// Converts string data to a 256-bit value (right-aligned).
    pub fn as_u256(&self) -> Result<U256Bytes, RlpError> {
        let data = self.as_uint_bytes()?;
        if data.len() > 32 {
            return Err(RlpError::IntegerOverflow);
        }
        let mut result = [0u8; 32];
        result[32 - data.len()..].copy_from_slice(data);
        Ok(result)
    }
}

/// Decodes one RLP item from the front of the input, returning the rest.
pub fn decode(input: &[u8]) -> Result<(RlpItem<'_>, &[u8]), RlpError> {
    decode_internal(input, 0)
}

/// Decodes a complete RLP item, rejecting trailing data.
pub fn decode_exact(input: &[u8]) -> Result<RlpItem<'_>, RlpError> {
    let (item, rest) = decode(input)?;
    if !rest.is_empty() {
        return Err(RlpError::TrailingData);
    }
    Ok(item)
}

/// Internal decode with depth tracking.
fn decode_internal(input: &[u8], depth: usize) -> Result<(RlpItem<'_>, &[u8]), RlpError> {
    if depth > MAX_DEPTH {
        return Err(RlpError::TooDeep);
    }

    let first = *input.first().ok_or(RlpError::EmptyInput)?;

    match first {
        // Single byte
        0x00..=0x7f => Ok((RlpItem::String(&input[..1]), &input[1..])),

        // Short string (0-55 bytes)
        0x80..=0xb7 => {
            let (data, rest) = split_payload(input, 1, (first - 0x80) as usize)?;

            if data.len() == 1 && data[0] < 0x80 {
                return Err(RlpError::SingleByteMismatch);
            }

            Ok((RlpItem::String(data), rest))
        }

        // Long string (56+ bytes)
        0xb8..=0xbf => {
            let (len, header) = decode_long_length(input, (first - 0xb7) as usize)?;
            let (data, rest) = split_payload(input, header, len)?;
            Ok((RlpItem::String(data), rest))
        }

        // Short list (0-55 bytes total)
        0xc0..=0xf7 => {
            let (payload, rest) = split_payload(input, 1, (first - 0xc0) as usize)?;
            let items = decode_list_items(payload, depth + 1)?;
            Ok((RlpItem::List(items), rest))
        }

        // Long list (56+ bytes total)
        0xf8..=0xff => {
            let (len, header) = decode_long_length(input, (first - 0xf7) as usize)?;
            let (payload, rest) = split_payload(input, header, len)?;
            let items = decode_list_items(payload, depth + 1)?;
            Ok((RlpItem::List(items), rest))
        }
    }
}

/// Reads the length-of-length bytes that follow a long-form prefix.
///
/// Returns the payload length and the total header size.
fn decode_long_length(input: &[u8], len_of_len: usize) -> Result<(usize, usize), RlpError> {
    let len_bytes = input.get(1..1 + len_of_len).ok_or(RlpError::UnexpectedEof)?;

    if len_bytes[0] == 0 {
        return Err(RlpError::NonCanonical);
    }

    let len = decode_length(len_bytes)?;

    // Long form is only valid for payloads that do not fit the short form
    if len <= SHORT_LIMIT {
        return Err(RlpError::NonCanonical);
    }

    Ok((len, 1 + len_of_len))
}

/// Splits `len` payload bytes after a `header`-byte prefix from the remainder.
fn split_payload(input: &[u8], header: usize, len: usize) -> Result<(&[u8], &[u8]), RlpError> {
    let end = header.checked_add(len).ok_or(RlpError::LengthOverflow)?;
    if input.len() < end {
        return Err(RlpError::UnexpectedEof);
    }
    Ok((&input[header..end], &input[end..]))
}

/// Decodes a big-endian length value.
fn decode_length(bytes: &[u8]) -> Result<usize, RlpError> {
    if bytes.len() > core::mem::size_of::<usize>() {
        return Err(RlpError::LengthOverflow);
    }

    let mut len = 0usize;
    for &byte in bytes {
        len = len.checked_mul(256).ok_or(RlpError::LengthOverflow)?;
        len = len.checked_add(byte as usize).ok_or(RlpError::LengthOverflow)?;
    }

    Ok(len)
}

/// Decodes all items in a list payload, which must be consumed exactly.
fn decode_list_items(mut data: &[u8], depth: usize) -> Result<Vec<RlpItem<'_>>, RlpError> {
    let mut items = Vec::new();

    while !data.is_empty() {
        let (item, rest) = decode_internal(data, depth)?;
        items.push(item);
        data = rest;
    }

    Ok(items)
}

// =============================================================================
// Encoding
// =============================================================================

/// Encodes a decoded item back into its canonical bytes.
pub fn encode(item: &RlpItem<'_>) -> Vec<u8> {
    match item {
        RlpItem::String(data) => encode_bytes(data),
        RlpItem::List(items) => {
            let payload: Vec<u8> = items.iter().flat_map(|item| encode(item)).collect();
            encode_list(&payload)
        }
    }
}

/// Encodes a u64 as RLP bytes.
pub fn encode_u64(value: u64) -> Vec<u8> {
    encode_uint(&value.to_be_bytes())
}

/// Encodes a big-endian unsigned integer, dropping leading zero bytes.
pub fn encode_uint(be_bytes: &[u8]) -> Vec<u8> {
    let start = be_bytes.iter().position(|&b| b != 0).unwrap_or(be_bytes.len());
    encode_bytes(&be_bytes[start..])
}

/// Encodes a byte slice as RLP.
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }

    let mut result = encode_header(0x80, data.len());
    result.extend_from_slice(data);
    result
}

/// Encodes a list of already-encoded items as RLP.
pub fn encode_list(payload: &[u8]) -> Vec<u8> {
    let mut result = encode_header(0xc0, payload.len());
    result.extend_from_slice(payload);
    result
}

/// Builds a string (`0x80`) or list (`0xc0`) prefix for a payload length.
fn encode_header(offset: u8, len: usize) -> Vec<u8> {
    if len <= SHORT_LIMIT {
        vec![offset + len as u8]
    } else {
        let len_bytes = encode_length_bytes(len);
        let mut result = Vec::with_capacity(1 + len_bytes.len() + len);
        result.push(offset + SHORT_LIMIT as u8 + len_bytes.len() as u8);
        result.extend_from_slice(&len_bytes);
        result
    }
}

/// Encodes a length as minimal big-endian bytes.
fn encode_length_bytes(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_byte() {
        let (item, rest) = decode(&[0x42]).unwrap();
        assert_eq!(item.as_string(), Ok(&[0x42][..]));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_empty_string() {
        let (item, rest) = decode(&[0x80]).unwrap();
        assert_eq!(item.as_string(), Ok(&[][..]));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_short_string() {
        let data = [0x83, b'c', b'a', b't'];
        let (item, rest) = decode(&data).unwrap();
        assert_eq!(item.as_string(), Ok(&b"cat"[..]));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_long_string() {
        let mut data = vec![0xb8, 56];
        data.extend_from_slice(&[0xaa; 56]);
        let item = decode_exact(&data).unwrap();
        assert_eq!(item.as_string().unwrap().len(), 56);
        assert_eq!(encode(&item), data);
    }

    #[test]
    fn test_decode_empty_list() {
        let (item, rest) = decode(&[0xc0]).unwrap();
        assert!(item.as_list().unwrap().is_empty());
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_nested_list() {
        // [[]] encoded as 0xc1 0xc0
        let data = [0xc1, 0xc0];
        let (item, _) = decode(&data).unwrap();
        let list = item.as_list().unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].as_list().unwrap().is_empty());
    }

    #[test]
    fn test_decode_set_theoretic_three() {
        // [ [], [[]], [ [], [[]] ] ]
        let data = [0xc7, 0xc0, 0xc1, 0xc0, 0xc3, 0xc0, 0xc1, 0xc0];
        let item = decode_exact(&data).unwrap();
        assert_eq!(item.as_list().unwrap().len(), 3);
        assert_eq!(encode(&item), data);
    }

    #[test]
    fn test_as_u64() {
        let (item, _) = decode(&[0x82, 0x04, 0x00]).unwrap();
        assert_eq!(item.as_u64(), Ok(1024));

        let (item, _) = decode(&[0x80]).unwrap();
        assert_eq!(item.as_u64(), Ok(0));
    }

    #[test]
    fn test_as_u64_rejects_leading_zero() {
        let (item, _) = decode(&[0x82, 0x00, 0x01]).unwrap();
        assert_eq!(item.as_u64(), Err(RlpError::LeadingZero));

        // A bare 0x00 byte is a one-byte string with a leading zero too
        let (item, _) = decode(&[0x00]).unwrap();
        assert_eq!(item.as_u64(), Err(RlpError::LeadingZero));
    }

    #[test]
    fn test_as_u64_overflow() {
        let (item, _) = decode(&[0x89, 1, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(item.as_u64(), Err(RlpError::IntegerOverflow));
        assert!(item.as_u256().is_ok());
    }

    #[test]
    fn test_as_u256_right_aligned() {
        let (item, _) = decode(&[0x82, 0x52, 0x08]).unwrap();
        let value = item.as_u256().unwrap();
        assert_eq!(&value[30..], &[0x52, 0x08]);
        assert!(value[..30].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_non_canonical_single_byte() {
        // 0x81 0x42 should be just 0x42
        let result = decode(&[0x81, 0x42]);
        assert!(matches!(result, Err(RlpError::SingleByteMismatch)));

        // 0x81 0x80 is fine: 0x80 cannot stand alone
        assert!(decode_exact(&[0x81, 0x80]).is_ok());
    }

    #[test]
    fn test_non_canonical_long_form() {
        // 3-byte string in long form
        assert_eq!(decode(&[0xb8, 0x03, 1, 2, 3]), Err(RlpError::NonCanonical));
        // Length-of-length with a leading zero
        let mut data = vec![0xb9, 0x00, 0x38];
        data.extend_from_slice(&[0x11; 56]);
        assert_eq!(decode(&data), Err(RlpError::NonCanonical));
        // Empty list in long form
        assert_eq!(decode(&[0xf8, 0x00]), Err(RlpError::NonCanonical));
    }

    #[test]
    fn test_truncated_input() {
        // Claims two payload bytes, only one present
        assert_eq!(decode(&[0x82, 0x04]), Err(RlpError::UnexpectedEof));
        // Length-of-length runs past the end
        assert_eq!(decode(&[0xb9, 0x01]), Err(RlpError::UnexpectedEof));
        // List item overruns the list payload
        assert_eq!(decode(&[0xc2, 0x83, 0x01]), Err(RlpError::UnexpectedEof));
        assert_eq!(decode(&[]), Err(RlpError::EmptyInput));
    }

    #[test]
    fn test_huge_declared_length() {
        let data = [0xbf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        assert!(matches!(
            decode(&data),
            Err(RlpError::LengthOverflow) | Err(RlpError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_trailing_data() {
        assert_eq!(decode_exact(&[0x01, 0x02]), Err(RlpError::TrailingData));
    }

    #[test]
    fn test_too_deep() {
        let mut data = vec![0xc0];
        for _ in 0..MAX_DEPTH + 1 {
            let mut wrapped = vec![0xc0 + data.len() as u8];
            wrapped.extend_from_slice(&data);
            data = wrapped;
        }
        assert_eq!(decode(&data), Err(RlpError::TooDeep));
    }

    #[test]
    fn test_encode_u64() {
        assert_eq!(encode_u64(0), vec![0x80]);
        assert_eq!(encode_u64(127), vec![0x7f]);
        assert_eq!(encode_u64(128), vec![0x81, 0x80]);
        assert_eq!(encode_u64(256), vec![0x82, 0x01, 0x00]);
    }

    #[test]
    fn test_encode_uint_strips_padding() {
        let mut word = [0u8; 32];
        word[31] = 0x25;
        assert_eq!(encode_uint(&word), vec![0x25]);
        assert_eq!(encode_uint(&[0u8; 32]), vec![0x80]);
    }

    #[test]
    fn test_encode_bytes() {
        assert_eq!(encode_bytes(b""), vec![0x80]);
        assert_eq!(encode_bytes(&[0x42]), vec![0x42]);
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(encode_bytes(b"cat"), vec![0x83, b'c', b'a', b't']);
    }

    #[test]
    fn test_encode_long_list() {
        let payload = [0x01u8; 60];
        let encoded = encode_list(&payload);
        assert_eq!(&encoded[..2], &[0xf8, 60]);
        let item = decode_exact(&encoded).unwrap();
        assert_eq!(item.as_list().unwrap().len(), 60);
    }

    #[test]
    fn test_error_maps_to_invalid_encoding() {
        let err: TxError = RlpError::SingleByteMismatch.into();
        assert_eq!(err, TxError::InvalidEncoding(EncodingError::NonCanonicalByte));
    }
}
