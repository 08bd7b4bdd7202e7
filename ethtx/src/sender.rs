//! Sender recovery.
//!
//! Picks the signing payload for each transaction variant, normalises `v`
//! into a recovery indicator and hands both to [`crate::crypto`]. Every
//! variant-specific decision lives in [`signing_context`]; callers never
//! branch on the transaction type themselves.

use std::num::NonZeroUsize;
use std::thread;

use ethtx_common::{Hash256, RecoveredIdentity, SignatureError, TxError};

use crate::crypto::{keccak256, recover_address};
use crate::parsing::Transaction;

/// Offset of `v` for pre-EIP-155 legacy signatures.
const LEGACY_V_OFFSET: u64 = 27;

/// Offset of `v` for EIP-155 signatures: `v = 35 + 2 * chain_id + parity`.
const EIP155_V_OFFSET: u64 = 35;

/// Everything needed to recover a signer, derived from one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningContext {
    /// Keccak256 of the signing payload.
    pub digest: Hash256,
    /// Normalised 0/1 y-parity.
    pub recovery_id: u8,
    /// Chain id the signature is scoped to.
    pub chain_id: Option<u64>,
}

/// Builds the signing context for a transaction.
///
/// Legacy transactions derive both the chain id and the parity from `v`;
/// typed transactions read the chain id from its own field and require
/// `v` to be the bare parity.
pub fn signing_context(tx: &Transaction) -> Result<SigningContext, TxError> {
    let context = match tx {
        Transaction::Legacy(inner) => {
            let (chain_id, recovery_id) = normalize_legacy_v(inner.signature.v)?;
            SigningContext {
                digest: keccak256(&inner.signing_payload(chain_id)),
                recovery_id,
                chain_id,
            }
        }
        Transaction::AccessList(inner) => SigningContext {
            digest: keccak256(&inner.signing_payload()),
            recovery_id: typed_parity(inner.signature.v)?,
            chain_id: Some(inner.chain_id),
        },
        Transaction::DynamicFee(inner) => SigningContext {
            digest: keccak256(&inner.signing_payload()),
            recovery_id: typed_parity(inner.signature.v)?,
            chain_id: Some(inner.chain_id),
        },
        Transaction::Blob(inner) => SigningContext {
            digest: keccak256(&inner.signing_payload()),
            recovery_id: typed_parity(inner.signature.v)?,
            chain_id: Some(inner.chain_id),
        },
    };

    log::debug!(
        "{} signing digest 0x{}, parity {}, chain id {:?}",
        tx.tx_type().name(),
        hex::encode(context.digest),
        context.recovery_id,
        context.chain_id
    );

    Ok(context)
}

/// The 32-byte digest the sender signed.
pub fn signing_digest(tx: &Transaction) -> Result<Hash256, TxError> {
    Ok(signing_context(tx)?.digest)
}

/// Recovers the address that signed `tx`.
pub fn resolve_sender(tx: &Transaction) -> Result<RecoveredIdentity, TxError> {
    let context = signing_context(tx)?;
    let signature = tx.signature();
    let address = recover_address(
        &context.digest,
        context.recovery_id,
        &signature.r,
        &signature.s,
    )?;

    Ok(RecoveredIdentity {
        address,
        chain_id: context.chain_id,
    })
}

/// Splits a legacy `v` into (chain id, parity).
fn normalize_legacy_v(v: u64) -> Result<(Option<u64>, u8), SignatureError> {
    match v {
        27 | 28 => Ok((None, (v - LEGACY_V_OFFSET) as u8)),
        v if v >= EIP155_V_OFFSET => {
            let offset = v - EIP155_V_OFFSET;
            Ok((Some(offset / 2), (offset % 2) as u8))
        }
        _ => Err(SignatureError::InvalidV),
    }
}

fn typed_parity(v: u64) -> Result<u8, SignatureError> {
    match v {
        0 | 1 => Ok(v as u8),
        _ => Err(SignatureError::InvalidV),
    }
}

// =============================================================================
// Decode + Resolve
// =============================================================================

/// A transaction together with its recovered signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub transaction: Transaction,
    pub sender: RecoveredIdentity,
}

/// Decodes raw envelope bytes and recovers the sender in one step.
pub fn decode_and_resolve(raw: &[u8]) -> Result<DecodedTransaction, TxError> {
    let transaction = Transaction::decode(raw)?;
    let sender = resolve_sender(&transaction)?;
    Ok(DecodedTransaction {
        transaction,
        sender,
    })
}

/// Decodes many transactions on worker threads.
///
/// Results come back in input order; one failing input does not affect
/// the others.
pub fn decode_batch<T>(inputs: &[T]) -> Vec<Result<DecodedTransaction, TxError>>
where
    T: AsRef<[u8]> + Sync,
{
    if inputs.is_empty() {
        return Vec::new();
    }

    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(inputs.len());
    let chunk_size = inputs.len().div_ceil(workers);

    log::debug!("decoding {} transactions on {} workers", inputs.len(), workers);

    thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|raw| decode_and_resolve(raw.as_ref()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key_to_address;
    use crate::parsing::{DynamicFeeTx, LegacyTx};
    use ethtx_common::{Address, Signature, U256Bytes, SECP256K1_N};
    use k256::{ecdsa::SigningKey, PublicKey};

    fn key() -> SigningKey {
        SigningKey::from_bytes((&[0x2au8; 32][..]).into()).unwrap()
    }

    fn address_of(key: &SigningKey) -> Address {
        public_key_to_address(&PublicKey::from(key.verifying_key()))
    }

    fn sign(key: &SigningKey, payload: &[u8]) -> (U256Bytes, U256Bytes, u8) {
        let (sig, recid) = key.sign_prehash_recoverable(&keccak256(payload)).unwrap();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig.r().to_bytes());
        s.copy_from_slice(&sig.s().to_bytes());
        (r, s, recid.to_byte())
    }

    fn u256(value: u64) -> U256Bytes {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&value.to_be_bytes());
        out
    }

    fn legacy(chain_id: Option<u64>) -> LegacyTx {
        let mut tx = LegacyTx {
            nonce: 3,
            gas_price: u256(20_000_000_000),
            gas_limit: 21000,
            to: Some([0x35; 20]),
            value: u256(1_000),
            data: Vec::new(),
            signature: Signature::default(),
        };
        let (r, s, parity) = sign(&key(), &tx.signing_payload(chain_id));
        let v = match chain_id {
            Some(cid) => EIP155_V_OFFSET + 2 * cid + parity as u64,
            None => LEGACY_V_OFFSET + parity as u64,
        };
        tx.signature = Signature { v, r, s };
        tx
    }

    fn dynamic_fee() -> DynamicFeeTx {
        let mut tx = DynamicFeeTx {
            chain_id: 10,
            nonce: 0,
            max_priority_fee_per_gas: u256(1),
            max_fee_per_gas: u256(2),
            gas_limit: 50_000,
            to: None,
            value: u256(0),
            data: vec![0x60, 0x00],
            access_list: Vec::new(),
            signature: Signature::default(),
        };
        let (r, s, parity) = sign(&key(), &tx.signing_payload());
        tx.signature = Signature { v: parity as u64, r, s };
        tx
    }

    #[test]
    fn test_normalize_legacy_v() {
        assert_eq!(normalize_legacy_v(27), Ok((None, 0)));
        assert_eq!(normalize_legacy_v(28), Ok((None, 1)));
        assert_eq!(normalize_legacy_v(37), Ok((Some(1), 0)));
        assert_eq!(normalize_legacy_v(38), Ok((Some(1), 1)));
        assert_eq!(normalize_legacy_v(35), Ok((Some(0), 0)));
        assert_eq!(normalize_legacy_v(0), Err(SignatureError::InvalidV));
        assert_eq!(normalize_legacy_v(1), Err(SignatureError::InvalidV));
        assert_eq!(normalize_legacy_v(29), Err(SignatureError::InvalidV));
        assert_eq!(normalize_legacy_v(34), Err(SignatureError::InvalidV));
    }

    #[test]
    fn test_typed_parity() {
        assert_eq!(typed_parity(0), Ok(0));
        assert_eq!(typed_parity(1), Ok(1));
        assert_eq!(typed_parity(27), Err(SignatureError::InvalidV));
    }

    #[test]
    fn test_resolve_legacy_unprotected() {
        let tx = Transaction::Legacy(legacy(None));
        let identity = resolve_sender(&tx).unwrap();
        assert_eq!(identity.address, address_of(&key()));
        assert_eq!(identity.chain_id, None);
    }

    #[test]
    fn test_resolve_legacy_eip155() {
        let tx = Transaction::Legacy(legacy(Some(5)));
        let identity = resolve_sender(&tx).unwrap();
        assert_eq!(identity.address, address_of(&key()));
        assert_eq!(identity.chain_id, Some(5));
    }

    #[test]
    fn test_wrong_chain_id_recovers_someone_else() {
        let mut inner = legacy(Some(5));
        // Same parity, different chain id
        inner.signature.v += 2;
        let identity = resolve_sender(&Transaction::Legacy(inner));
        assert_ne!(identity.map(|i| i.address), Ok(address_of(&key())));
    }

    #[test]
    fn test_resolve_dynamic_fee() {
        let tx = Transaction::DynamicFee(dynamic_fee());
        let identity = resolve_sender(&tx).unwrap();
        assert_eq!(identity.address, address_of(&key()));
        assert_eq!(identity.chain_id, Some(10));
    }

    #[test]
    fn test_typed_rejects_legacy_style_v() {
        let mut inner = dynamic_fee();
        inner.signature.v += 27;
        assert_eq!(
            resolve_sender(&Transaction::DynamicFee(inner)),
            Err(TxError::InvalidSignature(SignatureError::InvalidV))
        );
    }

    #[test]
    fn test_high_s_rejected() {
        let mut inner = legacy(Some(1));
        inner.signature.s = SECP256K1_N;
        inner.signature.s[31] -= 1;
        assert_eq!(
            resolve_sender(&Transaction::Legacy(inner)),
            Err(TxError::InvalidSignature(SignatureError::HighS))
        );
    }

    #[test]
    fn test_signing_digest_matches_payload_hash() {
        let inner = legacy(Some(1));
        let expected = keccak256(&inner.signing_payload(Some(1)));
        assert_eq!(signing_digest(&Transaction::Legacy(inner)), Ok(expected));
    }

    #[test]
    fn test_decode_and_resolve_roundtrip() {
        let tx = Transaction::DynamicFee(dynamic_fee());
        let decoded = decode_and_resolve(&tx.encoded()).unwrap();
        assert_eq!(decoded.transaction, tx);
        assert_eq!(decoded.sender.address, address_of(&key()));
    }

    #[test]
    fn test_decode_batch_preserves_order() {
        let good = Transaction::Legacy(legacy(Some(1))).encoded();
        let other = Transaction::DynamicFee(dynamic_fee()).encoded();
        let inputs = vec![good.clone(), vec![0x05, 0xc0], other, good];

        let results = decode_batch(&inputs);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().sender.chain_id, Some(1));
        assert_eq!(results[1], Err(TxError::UnsupportedType(0x05)));
        assert_eq!(results[2].as_ref().unwrap().sender.chain_id, Some(10));
        assert!(results[3].is_ok());

        let empty: Vec<Vec<u8>> = Vec::new();
        assert!(decode_batch(&empty).is_empty());
    }
}
