//! scindex - smart contract registration indexer
//!
//! Scans ledger invocation scripts for create-contract calls, decodes the
//! registration metadata they carry and persists it in a RocksDB store,
//! resuming from a durable checkpoint.

// Script codec
pub mod decoder;
pub mod encoder;
pub mod hash;
pub mod opcode;
pub mod registration;

// Storage
pub mod keys;
pub mod records;
pub mod store;

// Sync
pub mod config;
pub mod ledger;
pub mod notify;
pub mod pipeline;
pub mod progress;
pub mod rpc;
pub mod types;

pub mod cli;

// Re-export the main types for convenience
pub use decoder::{decode_script, DecodeError, Operand};
pub use encoder::{invocation_script, EncodeError, ScriptBuilder};
pub use records::ContractRecord;
pub use registration::{extract_registration, RejectReason};
pub use store::{ContractStore, RocksContractStore};
