//! CLI implementation for scctl
//!
//! Inspects the contract store and builds/decodes invocation scripts.
//! All commands output pretty JSON.

use crate::decoder::decode_script;
use crate::encoder::{invocation_script, nft_properties_script};
use crate::hash::parse_contract_id;
use crate::{ContractStore, RocksContractStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Contract store CLI tool
#[derive(Parser)]
#[command(name = "scctl")]
#[command(about = "Smart contract index CLI tool")]
pub struct Cli {
    /// Path to the RocksDB database directory
    #[arg(short, long, default_value = "./contract_db")]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get the last fully processed ledger entry id
    GetCheckpoint,
    /// Get a contract by script hash
    GetContract {
        /// Script hash (0x-prefixed, display byte order)
        script_hash: String,
    },
    /// List every stored contract
    ListContracts,
    /// Find contracts by name (case-insensitive)
    FindByName {
        name: String,
    },
    /// Build an invocation script
    BuildScript {
        /// Target script hash
        target: String,
        /// Method name
        method: String,
        /// Arguments in hex (with or without 0x prefix)
        args: Vec<String>,
    },
    /// Build the NFT `properties(token_id)` query script
    PropertiesScript {
        /// Target script hash
        target: String,
        /// Decimal token id
        token_id: String,
    },
    /// Decode a script into its operands
    DecodeScript {
        /// Script in hex (with or without 0x prefix)
        script_hex: String,
    },
}

/// Decode a hex string, padding odd lengths with a leading zero.
fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    };
    hex::decode(&s).with_context(|| format!("Invalid hex: {}", s))
}

fn open_store(db_path: &Path) -> Result<RocksContractStore> {
    RocksContractStore::open(db_path)
        .with_context(|| format!("Failed to open database at {:?}", db_path))
}

/// Execute one command and return its JSON output.
pub fn execute(command: Commands, db_path: &Path) -> Result<Value> {
    let result = match command {
        Commands::GetCheckpoint => {
            let store = open_store(db_path)?;
            json!({ "checkpoint": store.get_checkpoint()? })
        }
        Commands::GetContract { script_hash } => {
            let store = open_store(db_path)?;
            let hash = parse_contract_id(&script_hash)?;
            match store.get_contract(hash)? {
                Some(record) => json!({ "contract": record.to_json() }),
                None => json!({ "script_hash": script_hash, "contract": null }),
            }
        }
        Commands::ListContracts => {
            let store = open_store(db_path)?;
            let contracts: Vec<Value> = store
                .list_contracts()?
                .iter()
                .map(|r| r.to_json())
                .collect();
            json!({ "count": contracts.len(), "contracts": contracts })
        }
        Commands::FindByName { name } => {
            let store = open_store(db_path)?;
            let contracts: Vec<Value> = store
                .find_contracts_by_name(&name)?
                .iter()
                .map(|r| r.to_json())
                .collect();
            json!({ "name": name, "contracts": contracts })
        }
        Commands::BuildScript {
            target,
            method,
            args,
        } => {
            let target_hash = parse_contract_id(&target)?;
            let args = args
                .iter()
                .map(|a| parse_hex(a))
                .collect::<Result<Vec<_>>>()?;
            let script = invocation_script(target_hash, &method, &args)?;
            json!({
                "target": target,
                "method": method,
                "script": hex::encode(script),
            })
        }
        Commands::PropertiesScript { target, token_id } => {
            let target_hash = parse_contract_id(&target)?;
            let script = nft_properties_script(target_hash, &token_id)?;
            json!({
                "target": target,
                "token_id": token_id,
                "script": hex::encode(script),
            })
        }
        Commands::DecodeScript { script_hex } => {
            let script = parse_hex(&script_hex)?;
            let operands = decode_script(&script)?;
            let operands: Vec<Value> = operands
                .iter()
                .map(|o| {
                    json!({
                        "offset": o.offset,
                        "opcode": format!("0x{:02x}", o.opcode.byte()),
                        "data": hex::encode(&o.data),
                        "call_target": o.is_call_target(),
                    })
                })
                .collect();
            json!({ "operands": operands })
        }
    };
    Ok(result)
}

/// Run the CLI command and print JSON output.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let result = execute(cli.command, &cli.db_path)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ContractRecord;
    use alloy_primitives::{Address, B256};
    use tempfile::TempDir;

    const TARGET: &str = "0x0000000000000000000000000000000000000000";

    #[test]
    fn test_build_and_decode_script() {
        let dir = TempDir::new().unwrap();
        let built = execute(
            Commands::BuildScript {
                target: TARGET.to_string(),
                method: "properties".to_string(),
                args: vec!["07".to_string()],
            },
            dir.path(),
        )
        .unwrap();
        let script = built["script"].as_str().unwrap().to_string();
        assert_eq!(
            script,
            format!("57 51 c1 0a{} 67{}", hex::encode("properties"), "00".repeat(20))
                .replace(' ', "")
        );

        let decoded = execute(Commands::DecodeScript { script_hex: script }, dir.path()).unwrap();
        let operands = decoded["operands"].as_array().unwrap();
        assert_eq!(operands.len(), 3);
        assert_eq!(operands[0]["data"], "07");
        assert_eq!(operands[2]["call_target"], true);
    }

    #[test]
    fn test_properties_script_matches_build() {
        let dir = TempDir::new().unwrap();
        let a = execute(
            Commands::PropertiesScript {
                target: TARGET.to_string(),
                token_id: "7".to_string(),
            },
            dir.path(),
        )
        .unwrap();
        let b = execute(
            Commands::BuildScript {
                target: TARGET.to_string(),
                method: "properties".to_string(),
                args: vec!["0x7".to_string()],
            },
            dir.path(),
        )
        .unwrap();
        assert_eq!(a["script"], b["script"]);
    }

    #[test]
    fn test_store_queries() {
        let dir = TempDir::new().unwrap();
        let record = ContractRecord {
            tx_id: B256::from([9; 32]),
            script_hash: Address::from([0x42; 20]),
            name: "Token".to_string(),
            version: "2".to_string(),
            author: String::new(),
            email: String::new(),
            description: String::new(),
            need_storage: true,
            parameter_list: "0710".to_string(),
            return_type: "05".to_string(),
        };
        {
            let store = RocksContractStore::open(dir.path()).unwrap();
            store.commit_batch(&[record.clone()], 77).unwrap();
        }

        let checkpoint = execute(Commands::GetCheckpoint, dir.path()).unwrap();
        assert_eq!(checkpoint["checkpoint"], 77);

        let got = execute(
            Commands::GetContract {
                script_hash: record.contract_id(),
            },
            dir.path(),
        )
        .unwrap();
        assert_eq!(got["contract"]["name"], "Token");

        let found = execute(
            Commands::FindByName {
                name: "token".to_string(),
            },
            dir.path(),
        )
        .unwrap();
        assert_eq!(found["contracts"].as_array().unwrap().len(), 1);

        let listed = execute(Commands::ListContracts, dir.path()).unwrap();
        assert_eq!(listed["count"], 1);
    }
}
