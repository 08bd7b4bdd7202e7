//! Raw Ethereum transaction decoding and sender recovery.
//!
//! The pipeline is strictly layered:
//!
//! - [`parsing::rlp`] is a canonical RLP codec over byte slices
//! - [`parsing::transaction`] maps RLP items onto the transaction variants
//! - [`sender`] derives the signing digest and recovers the signer
//! - [`render`] formats a decoded transaction for humans or as JSON
//!
//! Every entry point returns [`TxError`] on failure; nothing panics on
//! malformed input.

pub mod crypto;
pub mod parsing;
pub mod render;
pub mod sender;

pub use ethtx_common::{
    Address, EncodingError, Hash256, RecoveredIdentity, Signature, SignatureError, TransactionType,
    TxError, U256Bytes, MAX_TX_SIZE,
};
pub use parsing::{AccessListItem, AccessListTx, BlobTx, DynamicFeeTx, LegacyTx, Transaction};
pub use sender::{
    decode_and_resolve, decode_batch, resolve_sender, signing_digest, DecodedTransaction,
};
