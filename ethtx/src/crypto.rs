//! Cryptographic primitives for sender recovery.
//!
//! This module provides:
//! - Keccak256 hashing (Ethereum's hash function)
//! - Signature value checks (range, low-S)
//! - secp256k1 public key recovery
//! - Address derivation and EIP-55 formatting
//!
//! Curve arithmetic is delegated to `k256`; nothing here reimplements it.

use ethtx_common::{Address, Hash256, SignatureError, U256Bytes, SECP256K1_HALF_N, SECP256K1_N};
use k256::{
    ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey,
};
use tiny_keccak::{Hasher as KeccakHasher, Keccak};

// =============================================================================
// Keccak256
// =============================================================================

/// Keccak256 hash function as used by Ethereum.
pub fn keccak256(data: &[u8]) -> Hash256 {
    let mut hasher = Keccak256Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Streaming Keccak256 hasher, for payloads assembled from several parts.
pub struct Keccak256Hasher {
    inner: Keccak,
}

impl Keccak256Hasher {
    /// Creates a new hasher.
    pub fn new() -> Self {
        Self {
            inner: Keccak::v256(),
        }
    }

    /// Updates the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalizes and returns the hash.
    pub fn finalize(self) -> Hash256 {
        let mut output = [0u8; 32];
        self.inner.finalize(&mut output);
        output
    }
}

impl Default for Keccak256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Signature Checks
// =============================================================================

/// Validates `r` and `s` against the secp256k1 order.
///
/// Requires `0 < r < n` and `0 < s <= n/2`. High-S signatures are
/// malleable and are rejected rather than normalised.
pub fn validate_signature_values(r: &U256Bytes, s: &U256Bytes) -> Result<(), SignatureError> {
    if is_zero(r) {
        return Err(SignatureError::ZeroR);
    }
    if is_zero(s) {
        return Err(SignatureError::ZeroS);
    }
    // Big-endian arrays of equal length compare numerically
    if r >= &SECP256K1_N {
        return Err(SignatureError::ROutOfRange);
    }
    if s >= &SECP256K1_N {
        return Err(SignatureError::SOutOfRange);
    }
    if s > &SECP256K1_HALF_N {
        return Err(SignatureError::HighS);
    }
    Ok(())
}

fn is_zero(value: &U256Bytes) -> bool {
    value.iter().all(|&b| b == 0)
}

// =============================================================================
// Recovery
// =============================================================================

/// Recovers the public key that produced `(r, s)` over `digest`.
///
/// `recovery_id` is the normalised 0/1 y-parity indicator.
pub fn recover_public_key(
    digest: &Hash256,
    recovery_id: u8,
    r: &U256Bytes,
    s: &U256Bytes,
) -> Result<PublicKey, SignatureError> {
    if recovery_id > 1 {
        return Err(SignatureError::InvalidV);
    }
    validate_signature_values(r, s)?;

    let signature =
        K256Signature::from_scalars(*r, *s).map_err(|_| SignatureError::RecoveryFailed)?;
    let recid = RecoveryId::new(recovery_id == 1, false);

    let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recid)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    log::trace!("recovered public key with parity {}", recovery_id);
    Ok(PublicKey::from(&verifying_key))
}

/// Recovers the signer address from a digest and normalised signature values.
pub fn recover_address(
    digest: &Hash256,
    recovery_id: u8,
    r: &U256Bytes,
    s: &U256Bytes,
) -> Result<Address, SignatureError> {
    let pubkey = recover_public_key(digest, recovery_id, r, s)?;
    Ok(public_key_to_address(&pubkey))
}

/// Get Ethereum address from public key.
///
/// Address = keccak256(pubkey[1..])[12..32]
/// (Skip the 0x04 prefix of uncompressed key, take last 20 bytes of hash)
pub fn public_key_to_address(pubkey: &PublicKey) -> Address {
    let encoded = pubkey.to_encoded_point(false);
    let bytes = encoded.as_bytes();

    let hash = keccak256(&bytes[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

// =============================================================================
// Address Formatting
// =============================================================================

/// Format address with EIP-55 checksum.
pub fn format_address_checksummed(address: &Address) -> String {
    let hex_lower = hex::encode(address);
    let hash = keccak256(hex_lower.as_bytes());

    let mut result = String::with_capacity(42);
    result.push_str("0x");

    for (i, c) in hex_lower.chars().enumerate() {
        let hash_byte = hash[i / 2];
        let nibble = if i % 2 == 0 {
            hash_byte >> 4
        } else {
            hash_byte & 0x0F
        };

        if c.is_ascii_alphabetic() && nibble >= 8 {
            result.push(c.to_ascii_uppercase());
        } else {
            result.push(c);
        }
    }

    result
}
