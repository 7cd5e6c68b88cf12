//! Script hashing
//!
//! Contract addresses are the Hash160 (RIPEMD-160 over SHA-256) of the
//! deployed script. They are displayed byte-reversed, `0x`-prefixed.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Hash160 of arbitrary bytes.
pub fn hash160(data: &[u8]) -> Address {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    Address::from_slice(&ripe)
}

/// Contract address of a deployed script.
pub fn script_hash(script: &[u8]) -> Address {
    hash160(script)
}

/// Display form of a script hash: `0x` + reversed bytes in lowercase hex.
pub fn to_contract_id(hash: Address) -> String {
    let mut bytes = hash.0 .0;
    bytes.reverse();
    format!("0x{}", hex::encode(bytes))
}

/// Parse the display form produced by [`to_contract_id`].
pub fn parse_contract_id(s: &str) -> Result<Address> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let mut bytes = hex::decode(s).with_context(|| format!("Invalid hex contract id: {}", s))?;
    if bytes.len() != 20 {
        anyhow::bail!("Contract id must be 20 bytes (40 hex chars), got {} bytes", bytes.len());
    }
    bytes.reverse();
    Ok(Address::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash160_known_vector() {
        // RIPEMD160(SHA256("")) = b472a266d0bd89c13706a4132ccfb16f7c3b9fcb
        assert_eq!(
            format!("{:x}", hash160(b"")),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }

    #[test]
    fn test_contract_id_roundtrip() {
        let hash = script_hash(b"\x00\xc5\x6b\x61\x6c\x75\x66");
        let id = to_contract_id(hash);
        assert!(id.starts_with("0x"));
        assert_eq!(id.len(), 42);
        assert_eq!(parse_contract_id(&id).unwrap(), hash);
    }

    #[test]
    fn test_contract_id_is_reversed() {
        let mut raw = [0u8; 20];
        raw[0] = 0xAB;
        let id = to_contract_id(Address::from(raw));
        assert!(id.ends_with("ab"));
    }

    #[test]
    fn test_parse_contract_id_rejects_short() {
        assert!(parse_contract_id("0x1234").is_err());
    }
}
