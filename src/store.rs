//! ContractStore trait and RocksDB implementation
//!
//! Persists extracted contract registrations together with the sync
//! checkpoint. Uses RocksDB with column families for organization.

use crate::keys::{decode_contract_key, encode_contract_key, encode_meta_key, META_CHECKPOINT};
use crate::records::ContractRecord;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;

/// Trait defining the interface for contract metadata storage.
pub trait ContractStore: Send + Sync {
    /// Get the last fully processed ledger entry id.
    fn get_checkpoint(&self) -> Result<Option<u64>>;

    /// Persist `records` and move the checkpoint to `checkpoint` atomically.
    ///
    /// Fails without writing anything if `checkpoint` is lower than the
    /// stored one.
    fn commit_batch(&self, records: &[ContractRecord], checkpoint: u64) -> Result<()>;

    /// Get a contract by script hash.
    fn get_contract(&self, script_hash: Address) -> Result<Option<ContractRecord>>;

    /// All stored contracts, ordered by script hash.
    fn list_contracts(&self) -> Result<Vec<ContractRecord>>;

    /// Contracts whose name matches `name`, ignoring ASCII case.
    fn find_contracts_by_name(&self, name: &str) -> Result<Vec<ContractRecord>> {
        Ok(self
            .list_contracts()?
            .into_iter()
            .filter(|c| c.name.eq_ignore_ascii_case(name))
            .collect())
    }
}

/// RocksDB-backed implementation of ContractStore.
///
/// Column families:
/// - contracts: registration records keyed by script hash
/// - meta: checkpoint
pub struct RocksContractStore {
    db: DB,
}

impl RocksContractStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all required column families if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = vec![
            ColumnFamilyDescriptor::new("contracts", Options::default()),
            ColumnFamilyDescriptor::new("meta", Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, column_families)
            .context("Failed to open RocksDB database")?;

        Ok(Self { db })
    }

    /// Get a column family handle by name.
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("Column family '{}' not found", name))
    }
}

impl ContractStore for RocksContractStore {
    fn get_checkpoint(&self) -> Result<Option<u64>> {
        let cf = self.get_cf("meta")?;
        let key = encode_meta_key(META_CHECKPOINT);
        match self.db.get_cf(cf, &key).context("Failed to get checkpoint")? {
            Some(bytes) => {
                let bytes: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    anyhow::anyhow!("Checkpoint must be 8 bytes (u64), got {}", bytes.len())
                })?;
                Ok(Some(u64::from_be_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    fn commit_batch(&self, records: &[ContractRecord], checkpoint: u64) -> Result<()> {
        if let Some(current) = self.get_checkpoint()? {
            if checkpoint < current {
                anyhow::bail!(
                    "Refusing to move checkpoint backwards from {} to {}",
                    current,
                    checkpoint
                );
            }
        }

        let contracts = self.get_cf("contracts")?;
        let meta = self.get_cf("meta")?;

        let mut batch = WriteBatch::default();
        for record in records {
            let key = encode_contract_key(record.script_hash);
            let value =
                postcard::to_allocvec(record).context("Failed to serialize contract record")?;
            batch.put_cf(contracts, &key, &value);
        }
        batch.put_cf(
            meta,
            encode_meta_key(META_CHECKPOINT),
            checkpoint.to_be_bytes(),
        );

        self.db
            .write(batch)
            .context("Failed to commit contract batch")?;
        Ok(())
    }

    fn get_contract(&self, script_hash: Address) -> Result<Option<ContractRecord>> {
        let cf = self.get_cf("contracts")?;
        let key = encode_contract_key(script_hash);
        match self.db.get_cf(cf, &key).context("Failed to get contract")? {
            Some(bytes) => {
                let record = postcard::from_bytes(&bytes)
                    .context("Failed to deserialize contract record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn list_contracts(&self) -> Result<Vec<ContractRecord>> {
        let cf = self.get_cf("contracts")?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item.context("Failed to read iterator")?;
            if decode_contract_key(&key).is_none() {
                continue;
            }
            let record: ContractRecord = postcard::from_bytes(&value)
                .context("Failed to deserialize contract record")?;
            records.push(record);
        }
        Ok(records)
    }
}
