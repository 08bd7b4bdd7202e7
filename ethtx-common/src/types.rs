//! Core value types shared across the decoder.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

/// Ethereum address (20 bytes).
pub type Address = [u8; 20];

/// Keccak256 hash (32 bytes).
pub type Hash256 = [u8; 32];

/// Unsigned 256-bit integer, big-endian, left-padded with zeros.
pub type U256Bytes = [u8; 32];

/// secp256k1 group order `n`.
pub const SECP256K1_N: U256Bytes = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// `n / 2`, the largest `s` accepted in a transaction signature.
pub const SECP256K1_HALF_N: U256Bytes = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

// =============================================================================
// Transaction Types
// =============================================================================

/// Transaction type for EIP-2718 typed transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum TransactionType {
    /// Legacy transaction (pre-EIP-2718), framed as a bare RLP list.
    #[default]
    Legacy = 0x00,
    /// EIP-2930 access list transaction.
    AccessList = 0x01,
    /// EIP-1559 dynamic fee transaction.
    DynamicFee = 0x02,
    /// EIP-4844 blob transaction (canonical form, no network wrapper).
    Blob = 0x03,
}

impl TransactionType {
    /// Maps an EIP-2718 envelope byte to its type.
    ///
    /// Legacy transactions have no envelope byte, so `0x00` is not a
    /// recognised discriminator here.
    pub fn from_envelope_byte(byte: u8) -> Option<Self> {
        match Self::from_u8(byte)? {
            TransactionType::Legacy => None,
            other => Some(other),
        }
    }

    /// Returns the numeric type.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Short human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            TransactionType::Legacy => "Legacy",
            TransactionType::AccessList => "EIP-2930",
            TransactionType::DynamicFee => "EIP-1559",
            TransactionType::Blob => "EIP-4844",
        }
    }
}

// =============================================================================
// Signature
// =============================================================================

/// Raw ECDSA signature values as carried in a transaction.
///
/// `v` is kept exactly as encoded: 27/28 or `35 + 2 * chain_id + parity`
/// for legacy transactions, the bare y-parity for typed ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signature {
    /// Recovery value as encoded.
    pub v: u64,
    /// R component (32 bytes, big-endian).
    pub r: U256Bytes,
    /// S component (32 bytes, big-endian).
    pub s: U256Bytes,
}

// =============================================================================
// Recovered Identity
// =============================================================================

/// The signer of a transaction, together with the chain id its signature
/// was scoped to (absent for pre-EIP-155 legacy transactions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveredIdentity {
    /// Signer address.
    pub address: Address,
    /// Chain id used to build the signing digest.
    pub chain_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_from_envelope_byte() {
        assert_eq!(TransactionType::from_envelope_byte(0x01), Some(TransactionType::AccessList));
        assert_eq!(TransactionType::from_envelope_byte(0x02), Some(TransactionType::DynamicFee));
        assert_eq!(TransactionType::from_envelope_byte(0x03), Some(TransactionType::Blob));
        assert_eq!(TransactionType::from_envelope_byte(0x00), None);
        assert_eq!(TransactionType::from_envelope_byte(0x05), None);
        assert_eq!(TransactionType::from_envelope_byte(0x7f), None);
    }

    #[test]
    fn test_transaction_type_as_u8() {
        assert_eq!(TransactionType::Legacy.as_u8(), 0);
        assert_eq!(TransactionType::DynamicFee.as_u8(), 2);
        assert_eq!(TransactionType::Blob.as_u8(), 3);
    }

    #[test]
    fn test_half_order_is_floor_of_order_over_two() {
        // 2 * HALF_N + 1 == N
        let mut doubled = [0u8; 32];
        let mut carry = 1u16;
        for i in (0..32).rev() {
            let v = (SECP256K1_HALF_N[i] as u16) * 2 + carry;
            doubled[i] = v as u8;
            carry = v >> 8;
        }
        assert_eq!(carry, 0);
        assert_eq!(doubled, SECP256K1_N);
    }
}
