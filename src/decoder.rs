//! Script decoder
//!
//! Turns a raw instruction stream into the ordered list of pushed operands,
//! stopping at the first call-target (`APPCALL`) instruction. This is not a
//! disassembler: any opcode outside the push/call subset aborts decoding.

use crate::opcode::{OpCode, CALL_TARGET_LEN};
use thiserror::Error;

/// Errors produced while decoding a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized opcode 0x{opcode:02x} at offset {offset}")]
    UnrecognizedOpcode { opcode: u8, offset: usize },

    #[error("truncated operand at offset {offset}: need {needed} bytes, {remaining} remain")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("PACK at offset {offset} is not preceded by a valid element count")]
    InvalidPack { offset: usize },

    #[error("script ended without a call target")]
    MissingCallTarget,
}

/// A value recovered from the instruction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    /// Offset of the instruction that produced this operand.
    pub offset: usize,
    /// The opcode the operand came from.
    pub opcode: OpCode,
    /// Operand payload. Literals carry their minimal little-endian form.
    pub data: Vec<u8>,
}

impl Operand {
    /// True if this is the fixed-width call target of an `APPCALL`.
    pub fn is_call_target(&self) -> bool {
        self.opcode == OpCode::AppCall && self.data.len() == CALL_TARGET_LEN
    }

    /// Interpret the payload as a little-endian two's-complement integer.
    pub fn as_int(&self) -> Option<i64> {
        decode_int(&self.data)
    }
}

/// Streaming reader over a script, yielding one operand per instruction.
///
/// `PACK` is yielded as an operand with an empty payload; folding it into the
/// preceding count is left to [`decode_script`]. The reader fuses after the
/// call target or the first error.
pub struct ScriptReader<'a> {
    script: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> ScriptReader<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        Self {
            script,
            pos: 0,
            done: false,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize, offset: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.script.len() - self.pos;
        if n > remaining {
            return Err(DecodeError::Truncated {
                offset,
                needed: n,
                remaining,
            });
        }
        let slice = &self.script[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_prefixed(&mut self, width: usize, offset: usize) -> Result<&'a [u8], DecodeError> {
        let prefix = self.take(width, offset)?;
        let mut buf = [0u8; 4];
        buf[..width].copy_from_slice(prefix);
        let len = u32::from_le_bytes(buf) as usize;
        self.take(len, offset)
    }

    fn read_operand(&mut self) -> Result<Operand, DecodeError> {
        let offset = self.pos;
        let opcode = OpCode::from(self.script[self.pos]);
        self.pos += 1;

        let data = match opcode {
            OpCode::PushZero => vec![0x00],
            OpCode::PushMinusOne => vec![0xFF],
            OpCode::PushSmall(n) => vec![n],
            OpCode::PushBytes(len) => self.take(len as usize, offset)?.to_vec(),
            OpCode::PushData1 => self.take_prefixed(1, offset)?.to_vec(),
            OpCode::PushData2 => self.take_prefixed(2, offset)?.to_vec(),
            OpCode::PushData4 => self.take_prefixed(4, offset)?.to_vec(),
            OpCode::Pack => Vec::new(),
            OpCode::AppCall => {
                let target = self.take(CALL_TARGET_LEN, offset)?.to_vec();
                self.done = true;
                target
            }
            OpCode::Unknown(opcode) => {
                return Err(DecodeError::UnrecognizedOpcode { opcode, offset });
            }
        };

        Ok(Operand {
            offset,
            opcode,
            data,
        })
    }
}

impl Iterator for ScriptReader<'_> {
    type Item = Result<Operand, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.script.len() {
            return None;
        }
        let item = self.read_operand();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

/// Decode a script into its operand sequence.
///
/// On success the last operand is always the call target. A `PACK`
/// consumes the element count pushed just before it and leaves the packed
/// operands in place.
pub fn decode_script(script: &[u8]) -> Result<Vec<Operand>, DecodeError> {
    let mut operands: Vec<Operand> = Vec::new();

    for item in ScriptReader::new(script) {
        let operand = item?;
        match operand.opcode {
            OpCode::Pack => {
                let count = operands.pop().and_then(|c| c.as_int());
                match count {
                    Some(n) if n >= 0 && n as usize <= operands.len() => {}
                    _ => {
                        return Err(DecodeError::InvalidPack {
                            offset: operand.offset,
                        })
                    }
                }
            }
            OpCode::AppCall => {
                operands.push(operand);
                return Ok(operands);
            }
            _ => operands.push(operand),
        }
    }

    Err(DecodeError::MissingCallTarget)
}

/// Decode a little-endian two's-complement integer of at most 8 bytes.
///
/// An empty slice is zero.
pub fn decode_int(bytes: &[u8]) -> Option<i64> {
    if bytes.len() > 8 {
        return None;
    }
    let Some(&last) = bytes.last() else {
        return Some(0);
    };
    let fill = if last & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut buf = [fill; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    Some(i64::from_le_bytes(buf))
}
