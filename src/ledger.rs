//! Ledger access
//!
//! The sync pipeline reads invocation entries through [`LedgerReader`].
//! Entry ids are strictly increasing along the chain; for the RPC-backed
//! reader they are `(block_index << 16) | tx_position`.

use crate::rpc::RpcClient;
use alloy_primitives::B256;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Mutex;

/// Blocks scanned back from the tip when looking for the last invocation.
const TIP_SCAN_WINDOW: u64 = 2000;

/// Upper bound on blocks read by a single `RpcLedger` page.
pub const MAX_BLOCKS_PER_READ: u64 = 500;

/// One ledger entry that carries a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Position in the ledger
    pub id: u64,
    /// Transaction id
    pub tx_id: B256,
    /// Attached invocation script
    pub script: Vec<u8>,
}

/// One read from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPage {
    pub entries: Vec<LedgerEntry>,
    /// Position the following read should start from.
    pub next: u64,
    /// The read reached the ledger tip.
    pub at_tip: bool,
}

impl LedgerPage {
    /// Page for a plain entry list: resume after the last entry, and treat a
    /// short list as the tip.
    pub fn from_entries(entries: Vec<LedgerEntry>, start: u64, limit: usize) -> Self {
        let next = entries.last().map_or(start, |e| e.id + 1);
        let at_tip = entries.len() < limit;
        Self {
            entries,
            next,
            at_tip,
        }
    }
}

/// Read-only access to ledger entries.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Up to `limit` entries with `id >= start`, in id order.
    ///
    /// Returns an empty list when `start` is past the ledger tip.
    async fn entries_from(&self, start: u64, limit: usize) -> Result<Vec<LedgerEntry>>;

    /// Id of the last entry currently in the ledger.
    async fn max_entry_id(&self) -> Result<u64>;

    /// Like `entries_from`, but also reports where to resume and whether the
    /// tip was reached. Readers that stop early override this.
    async fn read_page(&self, start: u64, limit: usize) -> Result<LedgerPage> {
        let entries = self.entries_from(start, limit).await?;
        Ok(LedgerPage::from_entries(entries, start, limit))
    }
}

/// Compose an entry id from a block height and a transaction position.
pub fn entry_id(block: u64, position: u64) -> u64 {
    (block << 16) | (position & 0xFFFF)
}

/// Ledger reader backed by a JSON-RPC node.
pub struct RpcLedger {
    rpc: RpcClient,
}

impl RpcLedger {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    async fn block_entries(&self, index: u64) -> Result<Vec<LedgerEntry>> {
        let block = self.rpc.get_block(index).await?;
        let mut entries = Vec::new();
        for (position, tx) in block.transactions.into_iter().enumerate() {
            if position > 0xFFFF {
                anyhow::bail!("Block {} has more than 65536 transactions", index);
            }
            if !tx.is_invocation() {
                continue;
            }
            entries.push(LedgerEntry {
                id: entry_id(index, position as u64),
                tx_id: tx.txid,
                script: tx.script.unwrap_or_default(),
            });
        }
        Ok(entries)
    }
}

/// Scan blocks `start >> 16 ..` for entries with `id >= start`.
///
/// Stops once `limit` entries are collected, at `block_count`, or after
/// `max_blocks` blocks, whichever comes first.
pub async fn scan_blocks<F, Fut>(
    start: u64,
    limit: usize,
    block_count: u64,
    max_blocks: u64,
    mut read_block: F,
) -> Result<LedgerPage>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Vec<LedgerEntry>>>,
{
    let first = start >> 16;
    let stop = block_count.min(first.saturating_add(max_blocks.max(1)));

    let mut entries = Vec::new();
    let mut block = first;
    while block < stop && entries.len() < limit {
        let found = read_block(block)
            .await
            .with_context(|| format!("Failed to read block {}", block))?;
        entries.extend(found.into_iter().filter(|e| e.id >= start));
        block += 1;
    }

    if entries.len() >= limit {
        entries.truncate(limit);
        let next = entries.last().map_or(start, |e| e.id + 1);
        return Ok(LedgerPage {
            entries,
            next,
            at_tip: false,
        });
    }

    Ok(LedgerPage {
        entries,
        next: entry_id(block, 0).max(start),
        at_tip: block >= block_count,
    })
}

#[async_trait]
impl LedgerReader for RpcLedger {
    async fn entries_from(&self, start: u64, limit: usize) -> Result<Vec<LedgerEntry>> {
        Ok(self.read_page(start, limit).await?.entries)
    }

    async fn read_page(&self, start: u64, limit: usize) -> Result<LedgerPage> {
        let block_count = self
            .rpc
            .get_block_count()
            .await
            .context("Failed to get block count")?;

        let page = scan_blocks(start, limit, block_count, MAX_BLOCKS_PER_READ, |index| {
            self.block_entries(index)
        })
        .await?;

        tracing::trace!(
            start,
            limit,
            found = page.entries.len(),
            next = page.next,
            at_tip = page.at_tip,
            "Read ledger entries"
        );
        Ok(page)
    }

    async fn max_entry_id(&self) -> Result<u64> {
        let block_count = self
            .rpc
            .get_block_count()
            .await
            .context("Failed to get block count")?;
        if block_count == 0 {
            return Ok(0);
        }

        let floor = block_count.saturating_sub(TIP_SCAN_WINDOW);
        for index in (floor..block_count).rev() {
            if let Some(last) = self.block_entries(index).await?.last() {
                return Ok(last.id);
            }
        }
        Ok(entry_id(floor, 0))
    }
}

/// In-memory ledger, used for replays and tests.
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
    read_starts: Mutex<Vec<u64>>,
}

impl MemoryLedger {
    pub fn new(mut entries: Vec<LedgerEntry>) -> Self {
        entries.sort_by_key(|e| e.id);
        Self {
            entries: Mutex::new(entries),
            read_starts: Mutex::new(Vec::new()),
        }
    }

    /// Append entries; ids must be above every existing id.
    pub fn append(&self, new: Vec<LedgerEntry>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.extend(new);
        entries.sort_by_key(|e| e.id);
    }

    /// Number of `entries_from` calls served so far.
    pub fn reads(&self) -> usize {
        self.read_starts().len()
    }

    /// Start position of every `entries_from` call, in call order.
    pub fn read_starts(&self) -> Vec<u64> {
        self.read_starts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    async fn entries_from(&self, start: u64, limit: usize) -> Result<Vec<LedgerEntry>> {
        self.read_starts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(start);
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .iter()
            .filter(|e| e.id >= start)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn max_entry_id(&self) -> Result<u64> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.last().map(|e| e.id).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64) -> LedgerEntry {
        LedgerEntry {
            id,
            tx_id: B256::from([id as u8; 32]),
            script: vec![0x51; 30],
        }
    }

    #[test]
    fn test_entry_id_ordering() {
        assert_eq!(entry_id(0, 0), 0);
        assert_eq!(entry_id(1, 0), 65536);
        assert_eq!(entry_id(1, 3), 65539);
        assert!(entry_id(2, 0) > entry_id(1, 0xFFFF));
    }

    #[tokio::test]
    async fn test_memory_ledger_reads() {
        let ledger = MemoryLedger::new(vec![entry(5), entry(1), entry(3)]);
        let got = ledger.entries_from(2, 10).await.unwrap();
        assert_eq!(got.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 5]);

        let got = ledger.entries_from(0, 2).await.unwrap();
        assert_eq!(got.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 3]);

        assert!(ledger.entries_from(6, 10).await.unwrap().is_empty());
        assert_eq!(ledger.max_entry_id().await.unwrap(), 5);
        assert_eq!(ledger.reads(), 3);

        ledger.append(vec![entry(9)]);
        assert_eq!(ledger.max_entry_id().await.unwrap(), 9);
        assert_eq!(ledger.read_starts(), vec![2, 0, 6]);
    }

    #[tokio::test]
    async fn test_default_page_marks_short_reads_as_tip() {
        let ledger = MemoryLedger::new(vec![entry(1), entry(3), entry(5)]);

        let page = ledger.read_page(0, 2).await.unwrap();
        assert_eq!(page.next, 4);
        assert!(!page.at_tip);

        let page = ledger.read_page(4, 2).await.unwrap();
        assert_eq!(page.next, 6);
        assert!(page.at_tip);

        let page = ledger.read_page(6, 2).await.unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.next, 6);
        assert!(page.at_tip);
    }

    /// Blocks 0..count where every tenth block holds one entry.
    async fn sparse_block(index: u64) -> Result<Vec<LedgerEntry>> {
        if index % 10 == 0 {
            Ok(vec![entry(entry_id(index, 1))])
        } else {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_scan_stops_at_block_cap() {
        let mut scanned = Vec::new();
        let page = scan_blocks(entry_id(1, 0), 100, 10_000, 25, |index| {
            scanned.push(index);
            sparse_block(index)
        })
        .await
        .unwrap();

        assert_eq!(scanned.len(), 25);
        assert_eq!(
            page.entries.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![entry_id(10, 1), entry_id(20, 1)]
        );
        assert_eq!(page.next, entry_id(26, 0));
        assert!(!page.at_tip);
    }

    #[tokio::test]
    async fn test_scan_empty_window_still_advances() {
        let page = scan_blocks(entry_id(11, 0), 100, 10_000, 5, sparse_block)
            .await
            .unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.next, entry_id(16, 0));
        assert!(!page.at_tip);
    }

    #[tokio::test]
    async fn test_scan_reaches_tip() {
        let page = scan_blocks(entry_id(15, 0), 100, 25, 500, sparse_block)
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.next, entry_id(25, 0));
        assert!(page.at_tip);
    }

    #[tokio::test]
    async fn test_scan_full_page_resumes_after_last_entry() {
        let page = scan_blocks(0, 2, 10_000, 500, sparse_block).await.unwrap();
        assert_eq!(
            page.entries.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![entry_id(0, 1), entry_id(10, 1)]
        );
        assert_eq!(page.next, entry_id(10, 1) + 1);
        assert!(!page.at_tip);
    }

    #[tokio::test]
    async fn test_scan_skips_entries_before_start() {
        let page = scan_blocks(entry_id(10, 2), 100, 12, 500, sparse_block)
            .await
            .unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.next, entry_id(12, 0));
        assert!(page.at_tip);
    }
}
