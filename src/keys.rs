//! Key encoding and decoding utilities
//!
//! All keys use a single-byte prefix followed by binary data.
//! This keeps keys deterministic and lexicographically ordered in RocksDB.

use alloy_primitives::Address;

/// Meta id of the last fully processed ledger entry.
pub const META_CHECKPOINT: u8 = 0x01;

/// Encode a contract key.
///
/// Format: byte 'K' (0x4B) + script hash (20 bytes)
/// Total length: 21 bytes
pub fn encode_contract_key(script_hash: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(b'K');
    key.extend_from_slice(script_hash.as_slice());
    key
}

/// Decode a contract key back into its script hash.
pub fn decode_contract_key(key: &[u8]) -> Option<Address> {
    match key {
        [b'K', rest @ ..] if rest.len() == 20 => Some(Address::from_slice(rest)),
        _ => None,
    }
}

/// Encode a meta key.
///
/// Format: byte 'M' (0x4D) + meta_id (1 byte)
/// Total length: 2 bytes
pub fn encode_meta_key(meta_id: u8) -> Vec<u8> {
    vec![b'M', meta_id]
}
