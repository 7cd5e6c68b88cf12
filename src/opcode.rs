//! Opcode table for the push/call subset of the script VM
//!
//! Only the opcodes needed to recover literal operands from registration
//! and query scripts are modelled. Every other byte maps to `OpCode::Unknown`.

/// Push an empty/zero value.
pub const PUSH0: u8 = 0x00;
/// Largest direct-push opcode; the opcode value is the payload length.
pub const PUSHBYTES75: u8 = 0x4B;
/// Push with a 1-byte length prefix.
pub const PUSHDATA1: u8 = 0x4C;
/// Push with a 2-byte little-endian length prefix.
pub const PUSHDATA2: u8 = 0x4D;
/// Push with a 4-byte little-endian length prefix.
pub const PUSHDATA4: u8 = 0x4E;
/// Push the integer -1.
pub const PUSHM1: u8 = 0x4F;
/// Push the integer 1. `PUSH1..=PUSH16` push `opcode - 0x50`.
pub const PUSH1: u8 = 0x51;
/// Push the integer 16.
pub const PUSH16: u8 = 0x60;
/// Call a contract by its 20-byte script hash.
pub const APPCALL: u8 = 0x67;
/// Pack the top `n` stack items into an array.
pub const PACK: u8 = 0xC1;

/// Width of a call-target operand.
pub const CALL_TARGET_LEN: usize = 20;

/// Classified opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// `0x00`
    PushZero,
    /// `0x01..=0x4B`, carrying the payload length.
    PushBytes(u8),
    /// `0x4C`
    PushData1,
    /// `0x4D`
    PushData2,
    /// `0x4E`
    PushData4,
    /// `0x4F`
    PushMinusOne,
    /// `0x51..=0x60`, carrying the literal value 1..=16.
    PushSmall(u8),
    /// `0xC1`
    Pack,
    /// `0x67`
    AppCall,
    /// Anything outside the recognised subset.
    Unknown(u8),
}

impl From<u8> for OpCode {
    fn from(byte: u8) -> Self {
        match byte {
            PUSH0 => OpCode::PushZero,
            0x01..=PUSHBYTES75 => OpCode::PushBytes(byte),
            PUSHDATA1 => OpCode::PushData1,
            PUSHDATA2 => OpCode::PushData2,
            PUSHDATA4 => OpCode::PushData4,
            PUSHM1 => OpCode::PushMinusOne,
            PUSH1..=PUSH16 => OpCode::PushSmall(byte - 0x50),
            PACK => OpCode::Pack,
            APPCALL => OpCode::AppCall,
            other => OpCode::Unknown(other),
        }
    }
}

impl OpCode {
    /// The raw opcode byte.
    pub const fn byte(self) -> u8 {
        match self {
            OpCode::PushZero => PUSH0,
            OpCode::PushBytes(len) => len,
            OpCode::PushData1 => PUSHDATA1,
            OpCode::PushData2 => PUSHDATA2,
            OpCode::PushData4 => PUSHDATA4,
            OpCode::PushMinusOne => PUSHM1,
            OpCode::PushSmall(n) => 0x50 + n,
            OpCode::Pack => PACK,
            OpCode::AppCall => APPCALL,
            OpCode::Unknown(b) => b,
        }
    }

    /// True for opcodes that push an integer literal with no payload.
    pub const fn is_literal(self) -> bool {
        matches!(
            self,
            OpCode::PushZero | OpCode::PushMinusOne | OpCode::PushSmall(_)
        )
    }
}

/// The single-byte literal opcode for `value`, if one exists.
pub fn literal_opcode(value: i64) -> Option<u8> {
    match value {
        -1 => Some(PUSHM1),
        0 => Some(PUSH0),
        1..=16 => Some(0x50 + value as u8),
        _ => None,
    }
}
