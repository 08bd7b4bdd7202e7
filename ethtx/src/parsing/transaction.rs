//! Transaction parsing for Ethereum.
//!
//! Supports:
//! - Legacy transactions (pre-EIP-2718), with or without EIP-155 replay protection
//! - EIP-2930 access list transactions (type 0x01)
//! - EIP-1559 dynamic fee transactions (type 0x02)
//! - EIP-4844 blob transactions (type 0x03, canonical form)
//!
//! # Security
//!
//! All transaction data comes from untrusted sources.
//! Parser must:
//! - Validate all fields before returning
//! - Fail closed on any ambiguity
//! - Never hand back a partially built transaction

use ethtx_common::{
    Address, EncodingError, Hash256, Signature, TransactionType, TxError, U256Bytes, MAX_TX_SIZE,
};

use super::rlp::{self, RlpItem};
use crate::crypto::keccak256;

/// Field counts of the signed wire forms.
const LEGACY_FIELDS: usize = 9;
const ACCESS_LIST_FIELDS: usize = 11;
const DYNAMIC_FEE_FIELDS: usize = 12;
const BLOB_FIELDS: usize = 14;

/// One access list entry: an address and the storage slots it pre-warms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessListItem {
    /// Account address.
    pub address: Address,
    /// Storage keys.
    pub storage_keys: Vec<Hash256>,
}

/// Legacy transaction: `[nonce, gasPrice, gasLimit, to, value, data, v, r, s]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: U256Bytes,
    pub gas_limit: u64,
    /// Recipient (None for contract creation).
    pub to: Option<Address>,
    pub value: U256Bytes,
    pub data: Vec<u8>,
    /// `v` may embed the chain id (EIP-155).
    pub signature: Signature,
}

/// EIP-2930 transaction:
/// `0x01 || [chainId, nonce, gasPrice, gasLimit, to, value, data, accessList, yParity, r, s]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessListTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: U256Bytes,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256Bytes,
    pub data: Vec<u8>,
    pub access_list: Vec<AccessListItem>,
    pub signature: Signature,
}

/// EIP-1559 transaction:
/// `0x02 || [chainId, nonce, maxPriorityFeePerGas, maxFeePerGas, gasLimit, to, value, data,
/// accessList, yParity, r, s]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicFeeTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: U256Bytes,
    pub max_fee_per_gas: U256Bytes,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256Bytes,
    pub data: Vec<u8>,
    pub access_list: Vec<AccessListItem>,
    pub signature: Signature,
}

/// EIP-4844 transaction:
/// `0x03 || [chainId, nonce, maxPriorityFeePerGas, maxFeePerGas, gasLimit, to, value, data,
/// accessList, maxFeePerBlobGas, blobVersionedHashes, yParity, r, s]`.
///
/// Blob transactions cannot create contracts, so `to` is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: U256Bytes,
    pub max_fee_per_gas: U256Bytes,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256Bytes,
    pub data: Vec<u8>,
    pub access_list: Vec<AccessListItem>,
    pub max_fee_per_blob_gas: U256Bytes,
    pub blob_versioned_hashes: Vec<Hash256>,
    pub signature: Signature,
}

/// A decoded, signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Legacy(LegacyTx),
    AccessList(AccessListTx),
    DynamicFee(DynamicFeeTx),
    Blob(BlobTx),
}

impl Transaction {
    /// Decodes a transaction from its raw envelope bytes.
    ///
    /// A first byte of 0xc0 or above is a legacy RLP list; a recognised
    /// EIP-2718 type byte is followed by that type's RLP list; anything
    /// else is an unsupported type.
    pub fn decode(raw: &[u8]) -> Result<Self, TxError> {
        let first = *raw.first().ok_or(EncodingError::EmptyInput)?;

        if raw.len() > MAX_TX_SIZE {
            return Err(EncodingError::TooLarge.into());
        }

        if first >= 0xc0 {
            let item = rlp::decode_exact(raw)?;
            return Self::from_encoded(&item, None);
        }

        if TransactionType::from_envelope_byte(first).is_none() {
            log::debug!("rejecting envelope type 0x{:02x}", first);
            return Err(TxError::UnsupportedType(first));
        }

        let item = rlp::decode_exact(&raw[1..])?;
        Self::from_encoded(&item, Some(first))
    }

    /// Builds a transaction from an already-decoded RLP list.
    ///
    /// `type_hint` is the EIP-2718 type byte, or None for a legacy list.
    pub fn from_encoded(item: &RlpItem<'_>, type_hint: Option<u8>) -> Result<Self, TxError> {
        let tx_type = match type_hint {
            None => TransactionType::Legacy,
            Some(byte) => {
                TransactionType::from_envelope_byte(byte).ok_or(TxError::UnsupportedType(byte))?
            }
        };

        log::debug!("decoding {} transaction", tx_type.name());

        let tx = match tx_type {
            TransactionType::Legacy => Self::Legacy(parse_legacy(item)?),
            TransactionType::AccessList => Self::AccessList(parse_access_list_tx(item)?),
            TransactionType::DynamicFee => Self::DynamicFee(parse_dynamic_fee_tx(item)?),
            TransactionType::Blob => Self::Blob(parse_blob_tx(item)?),
        };
        Ok(tx)
    }

    /// Transaction type.
    pub fn tx_type(&self) -> TransactionType {
        match self {
            Self::Legacy(_) => TransactionType::Legacy,
            Self::AccessList(_) => TransactionType::AccessList,
            Self::DynamicFee(_) => TransactionType::DynamicFee,
            Self::Blob(_) => TransactionType::Blob,
        }
    }

    /// Chain id: the explicit field for typed transactions, `(v - 35) / 2`
    /// for EIP-155 legacy transactions, None for unprotected legacy ones.
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Self::Legacy(tx) => legacy_chain_id(tx.signature.v),
            Self::AccessList(tx) => Some(tx.chain_id),
            Self::DynamicFee(tx) => Some(tx.chain_id),
            Self::Blob(tx) => Some(tx.chain_id),
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.nonce,
            Self::AccessList(tx) => tx.nonce,
            Self::DynamicFee(tx) => tx.nonce,
            Self::Blob(tx) => tx.nonce,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.gas_limit,
            Self::AccessList(tx) => tx.gas_limit,
            Self::DynamicFee(tx) => tx.gas_limit,
            Self::Blob(tx) => tx.gas_limit,
        }
    }

    /// Gas price for legacy and EIP-2930; the fee cap for fee-market types.
    pub fn gas_price(&self) -> &U256Bytes {
        match self {
            Self::Legacy(tx) => &tx.gas_price,
            Self::AccessList(tx) => &tx.gas_price,
            Self::DynamicFee(tx) => &tx.max_fee_per_gas,
            Self::Blob(tx) => &tx.max_fee_per_gas,
        }
    }

    /// Priority fee cap, for fee-market types only.
    pub fn max_priority_fee_per_gas(&self) -> Option<&U256Bytes> {
        match self {
            Self::DynamicFee(tx) => Some(&tx.max_priority_fee_per_gas),
            Self::Blob(tx) => Some(&tx.max_priority_fee_per_gas),
            Self::Legacy(_) | Self::AccessList(_) => None,
        }
    }

    /// Recipient, None for contract creation.
    pub fn to(&self) -> Option<&Address> {
        match self {
            Self::Legacy(tx) => tx.to.as_ref(),
            Self::AccessList(tx) => tx.to.as_ref(),
            Self::DynamicFee(tx) => tx.to.as_ref(),
            Self::Blob(tx) => Some(&tx.to),
        }
    }

    /// Returns true if this is a contract creation.
    pub fn is_contract_creation(&self) -> bool {
        self.to().is_none()
    }

    pub fn value(&self) -> &U256Bytes {
        match self {
            Self::Legacy(tx) => &tx.value,
            Self::AccessList(tx) => &tx.value,
            Self::DynamicFee(tx) => &tx.value,
            Self::Blob(tx) => &tx.value,
        }
    }

    /// Call data or init code.
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Legacy(tx) => &tx.data,
            Self::AccessList(tx) => &tx.data,
            Self::DynamicFee(tx) => &tx.data,
            Self::Blob(tx) => &tx.data,
        }
    }

    /// Access list (empty for legacy transactions).
    pub fn access_list(&self) -> &[AccessListItem] {
        match self {
            Self::Legacy(_) => &[],
            Self::AccessList(tx) => &tx.access_list,
            Self::DynamicFee(tx) => &tx.access_list,
            Self::Blob(tx) => &tx.access_list,
        }
    }

    /// Raw signature values as encoded.
    pub fn signature(&self) -> &Signature {
        match self {
            Self::Legacy(tx) => &tx.signature,
            Self::AccessList(tx) => &tx.signature,
            Self::DynamicFee(tx) => &tx.signature,
            Self::Blob(tx) => &tx.signature,
        }
    }

    /// Canonical signed envelope: the RLP list for legacy transactions,
    /// `type || RLP list` for typed ones.
    pub fn encoded(&self) -> Vec<u8> {
        match self {
            Self::Legacy(tx) => {
                let mut payload = tx.unsigned_fields();
                payload.extend(encode_signature(&tx.signature));
                rlp::encode_list(&payload)
            }
            Self::AccessList(tx) => typed_envelope(
                TransactionType::AccessList,
                tx.unsigned_fields(),
                Some(&tx.signature),
            ),
            Self::DynamicFee(tx) => typed_envelope(
                TransactionType::DynamicFee,
                tx.unsigned_fields(),
                Some(&tx.signature),
            ),
            Self::Blob(tx) => {
                typed_envelope(TransactionType::Blob, tx.unsigned_fields(), Some(&tx.signature))
            }
        }
    }

    /// Transaction hash: keccak256 of the signed envelope.
    pub fn hash(&self) -> Hash256 {
        keccak256(&self.encoded())
    }
}

// =============================================================================
// Signing Payloads
// =============================================================================

impl LegacyTx {
    /// RLP of `[nonce, gasPrice, gasLimit, to, value, data]`, list payload only.
    fn unsigned_fields(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(rlp::encode_u64(self.nonce));
        out.extend(rlp::encode_uint(&self.gas_price));
        out.extend(rlp::encode_u64(self.gas_limit));
        out.extend(encode_to(self.to.as_ref()));
        out.extend(rlp::encode_uint(&self.value));
        out.extend(rlp::encode_bytes(&self.data));
        out
    }

    /// Bytes signed by the sender.
    ///
    /// Without a chain id this is `rlp([nonce, gasPrice, gasLimit, to, value, data])`;
    /// with one (EIP-155) the list is extended with `chainId, 0, 0`.
    pub fn signing_payload(&self, chain_id: Option<u64>) -> Vec<u8> {
        let mut payload = self.unsigned_fields();
        if let Some(cid) = chain_id {
            payload.extend(rlp::encode_u64(cid));
            payload.extend(rlp::encode_u64(0));
            payload.extend(rlp::encode_u64(0));
        }
        rlp::encode_list(&payload)
    }
}

impl AccessListTx {
    fn unsigned_fields(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(rlp::encode_u64(self.chain_id));
        out.extend(rlp::encode_u64(self.nonce));
        out.extend(rlp::encode_uint(&self.gas_price));
        out.extend(rlp::encode_u64(self.gas_limit));
        out.extend(encode_to(self.to.as_ref()));
        out.extend(rlp::encode_uint(&self.value));
        out.extend(rlp::encode_bytes(&self.data));
        out.extend(encode_access_list(&self.access_list));
        out
    }

    /// `0x01 || rlp([chainId, nonce, gasPrice, gasLimit, to, value, data, accessList])`.
    pub fn signing_payload(&self) -> Vec<u8> {
        typed_envelope(TransactionType::AccessList, self.unsigned_fields(), None)
    }
}

impl DynamicFeeTx {
    fn unsigned_fields(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(rlp::encode_u64(self.chain_id));
        out.extend(rlp::encode_u64(self.nonce));
        out.extend(rlp::encode_uint(&self.max_priority_fee_per_gas));
        out.extend(rlp::encode_uint(&self.max_fee_per_gas));
        out.extend(rlp::encode_u64(self.gas_limit));
        out.extend(encode_to(self.to.as_ref()));
        out.extend(rlp::encode_uint(&self.value));
        out.extend(rlp::encode_bytes(&self.data));
        out.extend(encode_access_list(&self.access_list));
        out
    }

    /// `0x02 || rlp([chainId, nonce, tip, feeCap, gasLimit, to, value, data, accessList])`.
    pub fn signing_payload(&self) -> Vec<u8> {
        typed_envelope(TransactionType::DynamicFee, self.unsigned_fields(), None)
    }
}

impl BlobTx {
    fn unsigned_fields(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(rlp::encode_u64(self.chain_id));
        out.extend(rlp::encode_u64(self.nonce));
        out.extend(rlp::encode_uint(&self.max_priority_fee_per_gas));
        out.extend(rlp::encode_uint(&self.max_fee_per_gas));
        out.extend(rlp::encode_u64(self.gas_limit));
        out.extend(rlp::encode_bytes(&self.to));
        out.extend(rlp::encode_uint(&self.value));
        out.extend(rlp::encode_bytes(&self.data));
        out.extend(encode_access_list(&self.access_list));
        out.extend(rlp::encode_uint(&self.max_fee_per_blob_gas));
        let hashes: Vec<u8> = self
            .blob_versioned_hashes
            .iter()
            .flat_map(|h| rlp::encode_bytes(h))
            .collect();
        out.extend(rlp::encode_list(&hashes));
        out
    }

    /// `0x03 || rlp([... all fields except yParity, r, s])`.
    pub fn signing_payload(&self) -> Vec<u8> {
        typed_envelope(TransactionType::Blob, self.unsigned_fields(), None)
    }
}

/// `type || rlp(fields [++ yParity, r, s])`.
fn typed_envelope(
    tx_type: TransactionType,
    mut fields: Vec<u8>,
    signature: Option<&Signature>,
) -> Vec<u8> {
    if let Some(sig) = signature {
        fields.extend(encode_signature(sig));
    }
    let list = rlp::encode_list(&fields);
    let mut out = Vec::with_capacity(1 + list.len());
    out.push(tx_type.as_u8());
    out.extend(list);
    out
}

fn encode_to(to: Option<&Address>) -> Vec<u8> {
    rlp::encode_bytes(to.map(|a| &a[..]).unwrap_or(&[]))
}

fn encode_signature(sig: &Signature) -> Vec<u8> {
    let mut out = rlp::encode_u64(sig.v);
    out.extend(rlp::encode_uint(&sig.r));
    out.extend(rlp::encode_uint(&sig.s));
    out
}

fn encode_access_list(list: &[AccessListItem]) -> Vec<u8> {
    let mut entries = Vec::new();
    for entry in list {
        let keys: Vec<u8> = entry
            .storage_keys
            .iter()
            .flat_map(|k| rlp::encode_bytes(k))
            .collect();
        let mut item = rlp::encode_bytes(&entry.address);
        item.extend(rlp::encode_list(&keys));
        entries.extend(rlp::encode_list(&item));
    }
    rlp::encode_list(&entries)
}

/// Chain id embedded in a legacy `v` (EIP-155), if any.
pub(crate) fn legacy_chain_id(v: u64) -> Option<u64> {
    if v >= 35 {
        Some((v - 35) / 2)
    } else {
        None
    }
}

// =============================================================================
// Field Parsing
// =============================================================================

/// Positional reader over the fields of a transaction list.
struct FieldReader<'i, 'a> {
    fields: core::slice::Iter<'i, RlpItem<'a>>,
}

impl<'i, 'a> FieldReader<'i, 'a> {
    /// Checks that `item` is a list of exactly `expected` fields.
    fn new(item: &'i RlpItem<'a>, expected: usize) -> Result<Self, TxError> {
        let fields = item.as_list()?;
        if fields.len() != expected {
            log::debug!("expected {} fields, found {}", expected, fields.len());
            return Err(EncodingError::FieldCount.into());
        }
        Ok(Self { fields: fields.iter() })
    }

    fn field(&mut self) -> Result<&'i RlpItem<'a>, TxError> {
        // Count was checked up front
        self.fields.next().ok_or(TxError::InvalidEncoding(EncodingError::FieldCount))
    }

    fn u64(&mut self) -> Result<u64, TxError> {
        Ok(self.field()?.as_u64()?)
    }

    fn u256(&mut self) -> Result<U256Bytes, TxError> {
        Ok(self.field()?.as_u256()?)
    }

    fn bytes(&mut self) -> Result<Vec<u8>, TxError> {
        Ok(self.field()?.as_string()?.to_vec())
    }

    /// The `to` field: empty for contract creation, else exactly 20 bytes.
    fn to(&mut self) -> Result<Option<Address>, TxError> {
        let data = self.field()?.as_string()?;
        if data.is_empty() {
            return Ok(None);
        }
        parse_address(data).map(Some)
    }

    fn access_list(&mut self) -> Result<Vec<AccessListItem>, TxError> {
        parse_access_list(self.field()?)
    }

    fn hashes(&mut self) -> Result<Vec<Hash256>, TxError> {
        self.field()?
            .as_list()?
            .iter()
            .map(|item| parse_hash(item.as_string()?))
            .collect()
    }

    fn signature(&mut self) -> Result<Signature, TxError> {
        Ok(Signature {
            v: self.u64()?,
            r: self.u256()?,
            s: self.u256()?,
        })
    }
}

fn parse_legacy(item: &RlpItem<'_>) -> Result<LegacyTx, TxError> {
    let mut f = FieldReader::new(item, LEGACY_FIELDS)?;
    Ok(LegacyTx {
        nonce: f.u64()?,
        gas_price: f.u256()?,
        gas_limit: f.u64()?,
        to: f.to()?,
        value: f.u256()?,
        data: f.bytes()?,
        signature: f.signature()?,
    })
}

fn parse_access_list_tx(item: &RlpItem<'_>) -> Result<AccessListTx, TxError> {
    let mut f = FieldReader::new(item, ACCESS_LIST_FIELDS)?;
    Ok(AccessListTx {
        chain_id: f.u64()?,
        nonce: f.u64()?,
        gas_price: f.u256()?,
        gas_limit: f.u64()?,
        to: f.to()?,
        value: f.u256()?,
        data: f.bytes()?,
        access_list: f.access_list()?,
        signature: f.signature()?,
    })
}

fn parse_dynamic_fee_tx(item: &RlpItem<'_>) -> Result<DynamicFeeTx, TxError> {
    let mut f = FieldReader::new(item, DYNAMIC_FEE_FIELDS)?;
    Ok(DynamicFeeTx {
        chain_id: f.u64()?,
        nonce: f.u64()?,
        max_priority_fee_per_gas: f.u256()?,
        max_fee_per_gas: f.u256()?,
        gas_limit: f.u64()?,
        to: f.to()?,
        value: f.u256()?,
        data: f.bytes()?,
        access_list: f.access_list()?,
        signature: f.signature()?,
    })
}

fn parse_blob_tx(item: &RlpItem<'_>) -> Result<BlobTx, TxError> {
    let mut f = FieldReader::new(item, BLOB_FIELDS)?;
    Ok(BlobTx {
        chain_id: f.u64()?,
        nonce: f.u64()?,
        max_priority_fee_per_gas: f.u256()?,
        max_fee_per_gas: f.u256()?,
        gas_limit: f.u64()?,
        to: f.to()?.ok_or(EncodingError::MissingRecipient)?,
        value: f.u256()?,
        data: f.bytes()?,
        access_list: f.access_list()?,
        max_fee_per_blob_gas: f.u256()?,
        blob_versioned_hashes: f.hashes()?,
        signature: f.signature()?,
    })
}

fn parse_address(data: &[u8]) -> Result<Address, TxError> {
    data.try_into()
        .map_err(|_| TxError::InvalidEncoding(EncodingError::InvalidAddress))
}

fn parse_hash(data: &[u8]) -> Result<Hash256, TxError> {
    data.try_into()
        .map_err(|_| TxError::InvalidEncoding(EncodingError::InvalidHash))
}

/// Parses an access list: `[[address, [storageKey, ...]], ...]`.
fn parse_access_list(item: &RlpItem<'_>) -> Result<Vec<AccessListItem>, TxError> {
    let list = item.as_list()?;
    let mut result = Vec::with_capacity(list.len());

    for entry in list {
        let entry_list = entry.as_list()?;
        if entry_list.len() != 2 {
            return Err(EncodingError::FieldCount.into());
        }

        let address = parse_address(entry_list[0].as_string()?)?;
        let storage_keys = entry_list[1]
            .as_list()?
            .iter()
            .map(|key| parse_hash(key.as_string()?))
            .collect::<Result<Vec<_>, _>>()?;

        result.push(AccessListItem {
            address,
            storage_keys,
        });
    }

    Ok(result)
}
