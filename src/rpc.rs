//! JSON-RPC client for ledger nodes
//!
//! Provides a typed interface to the block-reading endpoints of a
//! NEO-style JSON-RPC node.

use crate::types::Block;
use anyhow::{Context, Result};
use serde_json::{json, Value};

/// JSON-RPC client for ledger nodes.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Make a JSON-RPC call.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to send RPC request")?;

        let json: Value = response
            .json()
            .await
            .context("Failed to parse RPC response")?;

        if let Some(error) = json.get("error") {
            anyhow::bail!("RPC error: {}", error);
        }

        json.get("result")
            .cloned()
            .context("RPC response missing 'result' field")
    }

    /// Number of blocks in the chain (tip height + 1).
    pub async fn get_block_count(&self) -> Result<u64> {
        let result = self.call("getblockcount", json!([])).await?;
        result
            .as_u64()
            .context("Block count response is not an unsigned integer")
    }

    /// Get a block by height with full transaction details.
    pub async fn get_block(&self, index: u64) -> Result<Block> {
        let result = self.call("getblock", json!([index, 1])).await?;
        serde_json::from_value(result)
            .with_context(|| format!("Failed to deserialize block {}", index))
    }
}
