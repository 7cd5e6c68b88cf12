//! Contract sync daemon
//!
//! Walks the ledger from the stored checkpoint, extracts contract
//! registrations from create-contract scripts and persists them.

use anyhow::{Context, Result};
use clap::Parser;
use scindex::config::{load_denylist, SyncConfig};
use scindex::ledger::RpcLedger;
use scindex::notify::{LogNotifier, Notifier, WebhookNotifier};
use scindex::pipeline::SyncPipeline;
use scindex::rpc::RpcClient;
use scindex::store::RocksContractStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Smart contract registration indexer
#[derive(Parser)]
#[command(name = "scindex")]
#[command(about = "Index smart contract registrations from the ledger")]
struct Args {
    /// RPC endpoint URL
    #[arg(short, long, default_value = "http://127.0.0.1:10332")]
    rpc_url: String,

    /// Path to RocksDB database directory
    #[arg(short, long, default_value = "./contract_db")]
    db_path: PathBuf,

    /// Extra transaction ids to skip (one per line, optional)
    #[arg(long)]
    denylist: Option<PathBuf>,

    /// Webhook receiving completion notices and fatal alerts (optional)
    #[arg(long)]
    webhook_url: Option<String>,

    /// Ledger entries read per batch
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Starting contract indexer");
    info!("RPC URL: {}", args.rpc_url);
    info!("Database: {:?}", args.db_path);

    let mut config = SyncConfig {
        batch_size: args.batch_size.max(1),
        ..SyncConfig::default()
    };
    if let Some(path) = &args.denylist {
        let extra = load_denylist(path).context("Failed to load denylist")?;
        info!("Loaded {} denylisted transactions", extra.len());
        config.denylist.extend(extra);
    }

    let notifier: Arc<dyn Notifier> = match args.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url)),
        None => Arc::new(LogNotifier),
    };

    let store = RocksContractStore::open(&args.db_path)
        .with_context(|| format!("Failed to open database at {:?}", args.db_path))?;
    let ledger = RpcLedger::new(RpcClient::new(args.rpc_url));

    let pipeline = SyncPipeline::new(
        Arc::new(ledger),
        Arc::new(store),
        Arc::clone(&notifier),
        config,
    );

    tokio::select! {
        result = pipeline.run() => {
            if let Err(e) = result {
                error!(error = %e, "Contract sync failed");
                notifier.notify("Contract sync failed", &e.to_string()).await;
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping");
        }
    }

    info!("Indexer stopped");
    Ok(())
}
