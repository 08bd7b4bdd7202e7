//! Error types for the ethtx decoder.
//!
//! Every failure while decoding a transaction or recovering its sender
//! lands in one of three buckets: the bytes are malformed, the envelope
//! type is not one we know, or the signature does not authenticate anyone.
//! Each bucket carries a terse reason for diagnostics.

use core::fmt;

/// Why a byte sequence was rejected as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingError {
    /// Input is empty when data expected.
    EmptyInput,
    /// Input exceeds the maximum transaction size.
    TooLarge,
    /// Input too short for declared length.
    Truncated,
    /// Non-minimal length prefix or long form used for a short payload.
    NonCanonicalLength,
    /// Single byte below 0x80 wrapped in a length prefix.
    NonCanonicalByte,
    /// Length field does not fit in memory.
    LengthOverflow,
    /// Exceeded maximum nesting depth.
    TooDeep,
    /// Extra data after the top-level item.
    TrailingData,
    /// Expected a list but found a byte string.
    ExpectedList,
    /// Expected a byte string but found a list.
    ExpectedString,
    /// Wrong number of fields for the transaction schema.
    FieldCount,
    /// Integer encoded with a leading zero byte.
    LeadingZero,
    /// Integer wider than its field.
    IntegerOverflow,
    /// Address field not exactly 20 bytes.
    InvalidAddress,
    /// Hash field not exactly 32 bytes.
    InvalidHash,
    /// Recipient missing where the schema requires one.
    MissingRecipient,
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::EmptyInput => write!(f, "empty input"),
            EncodingError::TooLarge => write!(f, "input too large"),
            EncodingError::Truncated => write!(f, "unexpected end of input"),
            EncodingError::NonCanonicalLength => write!(f, "non-canonical length prefix"),
            EncodingError::NonCanonicalByte => write!(f, "non-canonical single byte"),
            EncodingError::LengthOverflow => write!(f, "length overflow"),
            EncodingError::TooDeep => write!(f, "nesting too deep"),
            EncodingError::TrailingData => write!(f, "trailing data"),
            EncodingError::ExpectedList => write!(f, "expected list"),
            EncodingError::ExpectedString => write!(f, "expected byte string"),
            EncodingError::FieldCount => write!(f, "wrong field count"),
            EncodingError::LeadingZero => write!(f, "integer has leading zero"),
            EncodingError::IntegerOverflow => write!(f, "integer too large"),
            EncodingError::InvalidAddress => write!(f, "invalid address length"),
            EncodingError::InvalidHash => write!(f, "invalid hash length"),
            EncodingError::MissingRecipient => write!(f, "missing recipient"),
        }
    }
}

/// Why a signature failed to authenticate a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// `v` does not reduce to a 0/1 recovery indicator.
    InvalidV,
    /// `r` is zero.
    ZeroR,
    /// `s` is zero.
    ZeroS,
    /// `r` is not below the curve order.
    ROutOfRange,
    /// `s` is not below the curve order.
    SOutOfRange,
    /// `s` exceeds half the curve order.
    HighS,
    /// No public key recovers from the signature.
    RecoveryFailed,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::InvalidV => write!(f, "invalid v"),
            SignatureError::ZeroR => write!(f, "r is zero"),
            SignatureError::ZeroS => write!(f, "s is zero"),
            SignatureError::ROutOfRange => write!(f, "r out of range"),
            SignatureError::SOutOfRange => write!(f, "s out of range"),
            SignatureError::HighS => write!(f, "high s"),
            SignatureError::RecoveryFailed => write!(f, "public key recovery failed"),
        }
    }
}

/// Top-level error for decoding and sender recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    /// Malformed or non-canonical binary framing.
    InvalidEncoding(EncodingError),
    /// Leading type byte not in the recognised set.
    UnsupportedType(u8),
    /// Signature values out of range or not recoverable.
    InvalidSignature(SignatureError),
}

impl From<EncodingError> for TxError {
    fn from(e: EncodingError) -> Self {
        TxError::InvalidEncoding(e)
    }
}

impl From<SignatureError> for TxError {
    fn from(e: SignatureError) -> Self {
        TxError::InvalidSignature(e)
    }
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::InvalidEncoding(e) => write!(f, "invalid encoding: {}", e),
            TxError::UnsupportedType(t) => write!(f, "unsupported transaction type 0x{:02x}", t),
            TxError::InvalidSignature(e) => write!(f, "invalid signature: {}", e),
        }
    }
}

impl std::error::Error for TxError {}
