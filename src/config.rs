//! Sync configuration and denylist loading
//!
//! The denylist file holds one transaction id per line in hex format.

use alloy_primitives::B256;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Historical entry whose script is known to be malformed.
pub const BUILTIN_DENYLIST: &[&str] =
    &["0xb00a0d7b752ba935206e1db67079c186ba38a4696d3afe28814a4834b2254cbe"];

/// Tunables of the sync pipeline.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Entries requested from the ledger per fetch
    pub batch_size: usize,
    /// Scripts shorter than this cannot contain a call and are dropped
    pub min_script_len: usize,
    /// Pause after a fetch that yields nothing to process
    pub idle_pause: Duration,
    /// Minimum time between two progress reports
    pub report_interval: Duration,
    /// Runs shorter than this do not send a completion notice
    pub min_notify_runtime: Duration,
    /// Batches buffered between fetch and commit
    pub channel_capacity: usize,
    /// Transaction ids that are never processed
    pub denylist: HashSet<B256>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            min_script_len: 22,
            idle_pause: Duration::from_secs(2),
            report_interval: Duration::from_secs(1),
            min_notify_runtime: Duration::from_secs(5 * 60),
            channel_capacity: 1,
            denylist: builtin_denylist(),
        }
    }
}

fn builtin_denylist() -> HashSet<B256> {
    BUILTIN_DENYLIST
        .iter()
        .filter_map(|s| parse_tx_id(s).ok())
        .collect()
}

/// Load additional denied transaction ids from a file.
///
/// Empty lines and lines starting with '#' are ignored.
///
/// # Example file format:
/// ```text
/// 0xb00a0d7b752ba935206e1db67079c186ba38a4696d3afe28814a4834b2254cbe
/// # This is a comment
/// ```
pub fn load_denylist(path: &Path) -> Result<HashSet<B256>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read denylist file: {:?}", path))?;

    let mut ids = HashSet::new();
    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let id = parse_tx_id(line)
            .with_context(|| format!("Invalid tx id on line {}: {}", line_num + 1, line))?;
        ids.insert(id);
    }

    Ok(ids)
}

/// Parse a transaction id from a hex string, with or without 0x prefix.
pub fn parse_tx_id(s: &str) -> Result<B256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).with_context(|| format!("Invalid hex tx id: {}", s))?;

    if bytes.len() != 32 {
        anyhow::bail!("Tx id must be 32 bytes (64 hex chars), got {} bytes", bytes.len());
    }

    Ok(B256::from_slice(&bytes))
}
