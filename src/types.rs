//! Ledger JSON-RPC types
//!
//! Type definitions for blocks and transactions returned by a NEO-style
//! JSON-RPC node (`getblock` with verbose output).

use alloy_primitives::B256;
use serde::{Deserialize, Deserializer};

/// Transaction type carrying an invocation script.
pub const INVOCATION_TX: &str = "InvocationTransaction";

/// Block with full transaction details.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    /// Block height
    pub index: u64,

    /// Transactions in block order
    #[serde(rename = "tx", default)]
    pub transactions: Vec<Transaction>,
}

/// Ledger transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Transaction id (hex string in JSON)
    #[serde(rename = "txid", deserialize_with = "deserialize_hex_b256")]
    pub txid: B256,

    /// Transaction type, e.g. "InvocationTransaction"
    #[serde(rename = "type")]
    pub tx_type: String,

    /// Invocation script (hex string in JSON, absent for other tx types)
    #[serde(default, deserialize_with = "deserialize_hex_bytes_opt")]
    pub script: Option<Vec<u8>>,
}

impl Transaction {
    /// Check if this transaction carries an invocation script.
    pub fn is_invocation(&self) -> bool {
        self.tx_type == INVOCATION_TX && self.script.is_some()
    }
}

// Hex deserialization helpers

/// Pad an odd-length hex string with a leading zero.
fn pad_hex_string(s: &str) -> String {
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Deserialize a hex string to B256.
fn deserialize_hex_b256<'de, D>(deserializer: D) -> Result<B256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    if bytes.len() != 32 {
        return Err(serde::de::Error::custom(format!(
            "Expected 32 bytes for hash, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Deserialize an optional hex string to bytes.
fn deserialize_hex_bytes_opt<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        Some(s) => {
            let s = s.strip_prefix("0x").unwrap_or(&s);
            let s = pad_hex_string(s);
            hex::decode(&s).map(Some).map_err(serde::de::Error::custom)
        }
        None => Ok(None),
    }
}
