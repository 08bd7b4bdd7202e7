//! Human-readable and JSON summaries of a decoded transaction.
//!
//! Amounts are printed as exact decimal integers in wei, never rounded;
//! signature components as fixed-width hex.

use ethtx_common::{Address, Hash256, U256Bytes};
use serde::Serialize;

use crate::crypto::format_address_checksummed;
use crate::parsing::Transaction;
use crate::sender::DecodedTransaction;

/// Shown in place of a recipient for contract creations.
pub const CONTRACT_CREATION: &str = "contract creation";

/// Renders the fixed text block, one aligned field per line.
///
/// The data line is omitted when the payload is empty.
pub fn render_text(decoded: &DecodedTransaction) -> String {
    let tx = &decoded.transaction;
    let signature = tx.signature();

    let mut fields: Vec<(&str, String)> = vec![
        ("Hash", format_hash(&tx.hash())),
        ("ChainID", decoded.sender.chain_id.unwrap_or(0).to_string()),
        ("Type", tx.tx_type().as_u8().to_string()),
        ("From", format_address_checksummed(&decoded.sender.address)),
        ("To", format_recipient(tx.to())),
        ("Nonce", tx.nonce().to_string()),
    ];

    match tx {
        Transaction::Legacy(_) | Transaction::AccessList(_) => {
            fields.push(("GasPrice", format_u256(tx.gas_price())));
        }
        Transaction::DynamicFee(inner) => {
            fields.push(("MaxFee", format_u256(&inner.max_fee_per_gas)));
            fields.push(("MaxTip", format_u256(&inner.max_priority_fee_per_gas)));
        }
        Transaction::Blob(inner) => {
            fields.push(("MaxFee", format_u256(&inner.max_fee_per_gas)));
            fields.push(("MaxTip", format_u256(&inner.max_priority_fee_per_gas)));
            fields.push(("BlobFee", format_u256(&inner.max_fee_per_blob_gas)));
            fields.push(("Blobs", inner.blob_versioned_hashes.len().to_string()));
        }
    }

    fields.push(("GasLimit", tx.gas_limit().to_string()));
    fields.push(("  v", format!("{:02x}", signature.v)));
    fields.push(("  r", hex::encode(signature.r)));
    fields.push(("  s", hex::encode(signature.s)));
    fields.push(("Value", format_u256(tx.value())));

    if !tx.access_list().is_empty() {
        fields.push(("Access", format!("{} entries", tx.access_list().len())));
    }

    if !tx.data().is_empty() {
        fields.push(("Data", hex::encode(tx.data())));
    }

    fields
        .iter()
        .map(|(label, value)| format!("  {:<11}{}", format!("{}:", label), value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// JSON view of a decoded transaction.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub hash: String,
    pub chain_id: Option<u64>,
    #[serde(rename = "type")]
    pub tx_type: u8,
    pub from: String,
    /// None for contract creation.
    pub to: Option<String>,
    pub contract_creation: bool,
    pub nonce: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_blob_gas: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blob_versioned_hashes: Vec<String>,
    pub gas_limit: u64,
    pub v: u64,
    pub r: String,
    pub s: String,
    pub value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub access_list: Vec<AccessListSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListSummary {
    pub address: String,
    pub storage_keys: Vec<String>,
}

impl TransactionSummary {
    pub fn new(decoded: &DecodedTransaction) -> Self {
        let tx = &decoded.transaction;
        let signature = tx.signature();

        let (gas_price, max_fee_per_gas, max_priority_fee_per_gas) = match tx {
            Transaction::Legacy(_) | Transaction::AccessList(_) => {
                (Some(format_u256(tx.gas_price())), None, None)
            }
            Transaction::DynamicFee(_) | Transaction::Blob(_) => (
                None,
                Some(format_u256(tx.gas_price())),
                tx.max_priority_fee_per_gas().map(format_u256),
            ),
        };

        let (max_fee_per_blob_gas, blob_versioned_hashes) = match tx {
            Transaction::Blob(inner) => (
                Some(format_u256(&inner.max_fee_per_blob_gas)),
                inner.blob_versioned_hashes.iter().map(format_hash).collect(),
            ),
            _ => (None, Vec::new()),
        };

        Self {
            hash: format_hash(&tx.hash()),
            chain_id: decoded.sender.chain_id,
            tx_type: tx.tx_type().as_u8(),
            from: format_address_checksummed(&decoded.sender.address),
            to: tx.to().map(format_address_checksummed),
            contract_creation: tx.is_contract_creation(),
            nonce: tx.nonce(),
            gas_price,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            max_fee_per_blob_gas,
            blob_versioned_hashes,
            gas_limit: tx.gas_limit(),
            v: signature.v,
            r: format_hash(&signature.r),
            s: format_hash(&signature.s),
            value: format_u256(tx.value()),
            access_list: tx
                .access_list()
                .iter()
                .map(|entry| AccessListSummary {
                    address: format_address_checksummed(&entry.address),
                    storage_keys: entry.storage_keys.iter().map(format_hash).collect(),
                })
                .collect(),
            data: (!tx.data().is_empty()).then(|| format!("0x{}", hex::encode(tx.data()))),
        }
    }
}

/// Renders a pretty-printed JSON document.
pub fn render_json(decoded: &DecodedTransaction) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&TransactionSummary::new(decoded))
}

// =============================================================================
// Formatting Helpers
// =============================================================================

fn format_hash(hash: &Hash256) -> String {
    format!("0x{}", hex::encode(hash))
}

fn format_recipient(to: Option<&Address>) -> String {
    match to {
        Some(addr) => format_address_checksummed(addr),
        None => String::from(CONTRACT_CREATION),
    }
}

/// Formats a 256-bit big-endian value as a decimal integer.
pub fn format_u256(value: &U256Bytes) -> String {
    if value[..16].iter().all(|&b| b == 0) {
        let mut n: u128 = 0;
        for &byte in &value[16..] {
            n = (n << 8) | byte as u128;
        }
        return n.to_string();
    }

    // Schoolbook division by 10 over the byte array
    let mut n = *value;
    let mut digits = Vec::with_capacity(78);
    while n.iter().any(|&b| b != 0) {
        let mut rem = 0u32;
        for byte in n.iter_mut() {
            let acc = (rem << 8) | *byte as u32;
            *byte = (acc / 10) as u8;
            rem = acc % 10;
        }
        digits.push(char::from(b'0' + rem as u8));
    }
    digits.iter().rev().collect()
}
