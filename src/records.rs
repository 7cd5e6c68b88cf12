//! Record types persisted by the contract store
//!
//! Records use postcard for binary serialization, which is compact and deterministic.

use crate::hash::to_contract_id;
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Registration metadata of a deployed contract.
///
/// Keyed in the store by `script_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Transaction that deployed the contract
    pub tx_id: B256,
    /// Hash160 of the contract script
    pub script_hash: Address,
    pub name: String,
    pub version: String,
    pub author: String,
    pub email: String,
    pub description: String,
    /// Whether the contract declared it uses storage
    pub need_storage: bool,
    /// Parameter type codes, hex encoded
    pub parameter_list: String,
    /// Return type code, hex encoded
    pub return_type: String,
}

impl ContractRecord {
    /// Display form of the contract address.
    pub fn contract_id(&self) -> String {
        to_contract_id(self.script_hash)
    }

    /// JSON view used by the CLI.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "txid": format!("0x{:x}", self.tx_id),
            "script_hash": self.contract_id(),
            "name": self.name,
            "version": self.version,
            "author": self.author,
            "email": self.email,
            "description": self.description,
            "need_storage": self.need_storage,
            "parameter_list": self.parameter_list,
            "return_type": self.return_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    fn sample() -> ContractRecord {
        ContractRecord {
            tx_id: b256!("00000000000000000000000000000000000000000000000000000000000000aa"),
            script_hash: Address::from([0x11; 20]),
            name: "Token".to_string(),
            version: "1.0".to_string(),
            author: "dev".to_string(),
            email: "dev@example.com".to_string(),
            description: "a token".to_string(),
            need_storage: true,
            parameter_list: "0710".to_string(),
            return_type: "05".to_string(),
        }
    }

    #[test]
    fn test_postcard_roundtrip() {
        let record = sample();
        let bytes = postcard::to_allocvec(&record).unwrap();
        let decoded: ContractRecord = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn test_json_view() {
        let json = sample().to_json();
        assert_eq!(json["name"], "Token");
        assert_eq!(json["need_storage"], true);
        assert_eq!(json["script_hash"], format!("0x{}", "11".repeat(20)));
        assert!(json["txid"].as_str().unwrap().ends_with("aa"));
    }
}
