//! Script encoder
//!
//! Builds invocation scripts: arguments are pushed last-first, followed by
//! the argument count, `PACK`, the method name and an `APPCALL` to the
//! target. Used for query scripts against deployed contracts.

use crate::opcode::{literal_opcode, APPCALL, PACK, PUSHBYTES75, PUSHDATA1, PUSHDATA2, PUSHDATA4};
use alloy_primitives::Address;
use thiserror::Error;

/// Errors produced while building a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("cannot push an empty byte string; use an integer literal instead")]
    EmptyPush,

    #[error("push of {0} bytes exceeds the 4-byte length prefix")]
    TooLong(usize),

    #[error("invalid token id '{0}'")]
    InvalidTokenId(String),
}

/// Incremental script writer.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    buf: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a bare opcode.
    pub fn emit(&mut self, opcode: u8) -> &mut Self {
        self.buf.push(opcode);
        self
    }

    /// Push an integer using the shortest encoding.
    pub fn emit_push_int(&mut self, value: i64) -> &mut Self {
        match literal_opcode(value) {
            Some(op) => self.emit(op),
            None => {
                // Minimal encoding of anything outside -1..=16 is never empty
                // and never longer than 8 bytes.
                let bytes = encode_int(value);
                self.buf.push(bytes.len() as u8);
                self.buf.extend_from_slice(&bytes);
                self
            }
        }
    }

    /// Push a byte string using the shortest encoding.
    ///
    /// A single byte whose value has a literal opcode (0, 0xFF, 1..=16) is
    /// emitted as that literal, which decodes back to the same byte.
    pub fn emit_push_bytes(&mut self, data: &[u8]) -> Result<&mut Self, EncodeError> {
        let len = data.len();
        match len {
            0 => return Err(EncodeError::EmptyPush),
            1 => match literal_opcode(data[0] as i8 as i64) {
                Some(op) => {
                    self.buf.push(op);
                }
                None => {
                    self.buf.push(0x01);
                    self.buf.push(data[0]);
                }
            },
            _ if len <= PUSHBYTES75 as usize => {
                self.buf.push(len as u8);
                self.buf.extend_from_slice(data);
            }
            _ if len <= u8::MAX as usize => {
                self.buf.push(PUSHDATA1);
                self.buf.push(len as u8);
                self.buf.extend_from_slice(data);
            }
            _ if len <= u16::MAX as usize => {
                self.buf.push(PUSHDATA2);
                self.buf.extend_from_slice(&(len as u16).to_le_bytes());
                self.buf.extend_from_slice(data);
            }
            _ => {
                let prefix = u32::try_from(len).map_err(|_| EncodeError::TooLong(len))?;
                self.buf.push(PUSHDATA4);
                self.buf.extend_from_slice(&prefix.to_le_bytes());
                self.buf.extend_from_slice(data);
            }
        }
        Ok(self)
    }

    /// Push every argument, last one first.
    pub fn emit_push_args<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<&mut Self, EncodeError> {
        for arg in args.iter().rev() {
            self.emit_push_bytes(arg.as_ref())?;
        }
        Ok(self)
    }

    /// Emit `APPCALL` against a 20-byte target.
    pub fn emit_app_call(&mut self, target: Address) -> &mut Self {
        self.buf.push(APPCALL);
        self.buf.extend_from_slice(target.as_slice());
        self
    }

    /// Emit a full method invocation against `target`.
    pub fn emit_invocation<A: AsRef<[u8]>>(
        &mut self,
        target: Address,
        method: &str,
        args: &[A],
    ) -> Result<&mut Self, EncodeError> {
        self.emit_push_args(args)?;
        self.emit_push_int(args.len() as i64);
        self.emit(PACK);
        self.emit_push_bytes(method.as_bytes())?;
        Ok(self.emit_app_call(target))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Build the script invoking `method(args...)` on `target`.
pub fn invocation_script<A: AsRef<[u8]>>(
    target: Address,
    method: &str,
    args: &[A],
) -> Result<Vec<u8>, EncodeError> {
    let mut builder = ScriptBuilder::new();
    builder.emit_invocation(target, method, args)?;
    Ok(builder.into_bytes())
}

/// Build the `properties(token_id)` query script for an NFT contract.
///
/// `token_id` is a decimal integer string.
pub fn nft_properties_script(target: Address, token_id: &str) -> Result<Vec<u8>, EncodeError> {
    let id: i64 = token_id
        .trim()
        .parse()
        .map_err(|_| EncodeError::InvalidTokenId(token_id.to_string()))?;
    invocation_script(target, "properties", &[encode_int(id)])
}

/// Minimal little-endian two's-complement encoding of `value`.
///
/// Zero encodes as a single `0x00` byte.
pub fn encode_int(value: i64) -> Vec<u8> {
    let mut bytes = value.to_le_bytes().to_vec();
    while bytes.len() > 1 {
        let last = bytes[bytes.len() - 1];
        let sign_of_prev = bytes[bytes.len() - 2] & 0x80;
        let redundant = (last == 0x00 && sign_of_prev == 0) || (last == 0xFF && sign_of_prev != 0);
        if !redundant {
            break;
        }
        bytes.pop();
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode_script;

    fn target(fill: u8) -> Address {
        Address::from([fill; 20])
    }

    /// Decode an invocation script back into (args, method, target).
    fn recover(script: &[u8]) -> (Vec<Vec<u8>>, Vec<u8>, Vec<u8>) {
        let mut ops: Vec<Vec<u8>> = decode_script(script)
            .unwrap()
            .into_iter()
            .map(|o| o.data)
            .collect();
        let target = ops.pop().unwrap();
        let method = ops.pop().unwrap();
        ops.reverse();
        (ops, method, target)
    }

    #[test]
    fn test_encode_int() {
        assert_eq!(encode_int(0), vec![0x00]);
        assert_eq!(encode_int(7), vec![0x07]);
        assert_eq!(encode_int(-1), vec![0xFF]);
        assert_eq!(encode_int(127), vec![0x7F]);
        assert_eq!(encode_int(128), vec![0x80, 0x00]);
        assert_eq!(encode_int(-128), vec![0x80]);
        assert_eq!(encode_int(-129), vec![0x7F, 0xFF]);
        assert_eq!(encode_int(65536), vec![0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_push_int_forms() {
        let mut b = ScriptBuilder::new();
        b.emit_push_int(-1).emit_push_int(0).emit_push_int(16).emit_push_int(17);
        assert_eq!(b.as_bytes(), &[0x4F, 0x00, 0x60, 0x01, 0x11]);
    }

    #[test]
    fn test_push_bytes_length_classes() {
        let mut b = ScriptBuilder::new();
        b.emit_push_bytes(&[0x42]).unwrap();
        assert_eq!(b.as_bytes(), &[0x01, 0x42]);

        let mut b = ScriptBuilder::new();
        b.emit_push_bytes(&[0x05]).unwrap();
        assert_eq!(b.as_bytes(), &[0x55]);

        let mut b = ScriptBuilder::new();
        b.emit_push_bytes(&[0u8; 75]).unwrap();
        assert_eq!(b.as_bytes()[0], 0x4B);
        assert_eq!(b.as_bytes().len(), 76);

        let mut b = ScriptBuilder::new();
        b.emit_push_bytes(&[0u8; 76]).unwrap();
        assert_eq!(&b.as_bytes()[..2], &[0x4C, 76]);

        let mut b = ScriptBuilder::new();
        b.emit_push_bytes(&[0u8; 256]).unwrap();
        assert_eq!(&b.as_bytes()[..3], &[0x4D, 0x00, 0x01]);

        let mut b = ScriptBuilder::new();
        b.emit_push_bytes(&vec![0u8; 65536]).unwrap();
        assert_eq!(&b.as_bytes()[..5], &[0x4E, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_empty_push_rejected() {
        let mut b = ScriptBuilder::new();
        assert_eq!(b.emit_push_bytes(&[]).unwrap_err(), EncodeError::EmptyPush);
        let empty: [&[u8]; 1] = [&[]];
        assert!(invocation_script(target(0), "m", &empty).is_err());
    }

    #[test]
    fn test_properties_scenario() {
        let script = invocation_script(target(0), "properties", &[encode_int(7)]).unwrap();
        let (args, method, tgt) = recover(&script);
        assert_eq!(args, vec![vec![0x07]]);
        assert_eq!(method, b"properties");
        assert_eq!(tgt, vec![0u8; 20]);

        assert_eq!(nft_properties_script(target(0), "7").unwrap(), script);
    }

    #[test]
    fn test_roundtrip_mixed_arguments() {
        let args: Vec<Vec<u8>> = vec![
            vec![0x00],
            vec![0xFF],
            vec![0x10],
            vec![0x11],
            vec![0x4F, 0x00],
            b"transfer-data".to_vec(),
            vec![0xAB; 80],
            vec![0xCD; 300],
        ];
        let script = invocation_script(target(9), "transfer", &args).unwrap();
        let (recovered, method, tgt) = recover(&script);
        assert_eq!(recovered, args);
        assert_eq!(method, b"transfer");
        assert_eq!(tgt, vec![9u8; 20]);
    }

    #[test]
    fn test_large_argument_count() {
        let args: Vec<Vec<u8>> = (0..20u8).map(|i| vec![0x20 + i, i]).collect();
        let script = invocation_script(target(1), "batch", &args).unwrap();
        let (recovered, _, _) = recover(&script);
        assert_eq!(recovered, args);
    }

    #[test]
    fn test_invalid_token_id() {
        assert!(matches!(
            nft_properties_script(target(0), "abc"),
            Err(EncodeError::InvalidTokenId(_))
        ));
    }
}
