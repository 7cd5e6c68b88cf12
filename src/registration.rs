//! Contract registration extraction
//!
//! A create-contract call pushes its nine registration fields last-first and
//! ends with `APPCALL` to the create target. This module maps a decoded
//! operand sequence onto a [`ContractRecord`], rejecting anything that does
//! not have exactly that shape.

use crate::decoder::{decode_script, DecodeError, Operand};
use crate::hash::{hash160, script_hash};
use crate::opcode::{OpCode, APPCALL};
use crate::records::ContractRecord;
use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Operation name whose Hash160 is the create-contract call target.
pub const CREATE_OPERATION: &str = "Neo.Contract.Create";

/// Number of fields pushed by a create-contract call.
pub const REGISTRATION_ARITY: usize = 9;

/// Why an operand sequence is not a registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("last operand is not a call target")]
    NoCallTarget,

    #[error("expected {expected} registration fields, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("contract script is empty")]
    EmptyScript,

    #[error("field '{0}' is not valid UTF-8")]
    InvalidText(&'static str),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// The call target every create-contract script invokes.
pub fn create_target() -> Address {
    hash160(CREATE_OPERATION.as_bytes())
}

/// Byte suffix shared by every create-contract script: `APPCALL || target`.
///
/// `SYSCALL Neo.Contract.Create` deployments do not carry this suffix and are
/// not matched.
pub fn create_signature() -> Vec<u8> {
    let mut sig = Vec::with_capacity(21);
    sig.push(APPCALL);
    sig.extend_from_slice(create_target().as_slice());
    sig
}

/// Field payload, with `PUSH0` read as the empty byte string.
fn field_bytes(operand: &Operand) -> &[u8] {
    match operand.opcode {
        OpCode::PushZero => &[],
        _ => operand.data.as_slice(),
    }
}

fn text(field: &'static str, operand: &Operand) -> Result<String, RejectReason> {
    String::from_utf8(field_bytes(operand).to_vec())
        .map_err(|_| RejectReason::InvalidText(field))
}

fn is_truthy(data: &[u8]) -> bool {
    data.iter().any(|b| *b != 0)
}

/// Interpret a decoded operand sequence as a contract registration.
pub fn extract_registration(
    tx_id: B256,
    operands: &[Operand],
) -> Result<ContractRecord, RejectReason> {
    let (target, fields) = operands.split_last().ok_or(RejectReason::NoCallTarget)?;
    if !target.is_call_target() {
        return Err(RejectReason::NoCallTarget);
    }
    if fields.len() != REGISTRATION_ARITY {
        return Err(RejectReason::Arity {
            expected: REGISTRATION_ARITY,
            found: fields.len(),
        });
    }

    // Undo the last-first push order.
    let f: Vec<&Operand> = fields.iter().rev().collect();

    let script = field_bytes(f[0]);
    if script.is_empty() {
        return Err(RejectReason::EmptyScript);
    }

    Ok(ContractRecord {
        tx_id,
        script_hash: script_hash(script),
        parameter_list: hex::encode(field_bytes(f[1])),
        return_type: hex::encode(field_bytes(f[2])),
        need_storage: is_truthy(&f[3].data),
        name: text("name", f[4])?,
        version: text("version", f[5])?,
        author: text("author", f[6])?,
        email: text("email", f[7])?,
        description: text("description", f[8])?,
    })
}

/// Decode `script` and extract a registration from it.
pub fn registration_from_script(
    tx_id: B256,
    script: &[u8],
) -> Result<ContractRecord, RejectReason> {
    let operands = decode_script(script)?;
    extract_registration(tx_id, &operands)
}
