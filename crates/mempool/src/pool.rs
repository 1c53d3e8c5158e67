//! In-memory entry pool.

use std::collections::HashMap;

use deltacore_core::MempoolReader;
use deltacore_types::{ContentHash, PublicEntry};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{MempoolError, Result};

/// Identity of a pooled entry: the digest of its canonical bytes.
pub type EntryId = ContentHash;

/// Mempool configuration
#[derive(Debug, Clone)]
pub struct MempoolConfig {
    /// Maximum number of entries in the pool
    pub max_size: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self { max_size: 10_000 }
    }
}

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MempoolStats {
    /// Number of pooled entries
    pub count: usize,
    /// Sum of `gas_limit` over pooled entries
    pub total_gas: u64,
}

/// Thread-safe pool of pending entries.
pub struct Mempool {
    entries: RwLock<HashMap<EntryId, PublicEntry>>,
    config: MempoolConfig,
}

impl Mempool {
    /// Create an empty pool
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Identity of an entry.
    pub fn entry_id(entry: &PublicEntry) -> EntryId {
        ContentHash::keccak256(&entry.to_rlp())
    }

    /// Add an entry to the pool.
    pub fn add_entry(&self, entry: PublicEntry) -> Result<EntryId> {
        let id = Self::entry_id(&entry);
        trace!(entry_id = %id.short(), "adding entry to mempool");

        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(MempoolError::AlreadyExists);
        }
        if entries.len() >= self.config.max_size {
            return Err(MempoolError::PoolFull);
        }

        debug!(
            entry_id = %id.short(),
            gas_price = entry.gas_price,
            gas_limit = entry.gas_limit,
            "entry added to mempool"
        );
        entries.insert(id, entry);
        Ok(id)
    }

    /// Remove an entry by id, returning it if it was pooled.
    pub fn remove(&self, id: &EntryId) -> Option<PublicEntry> {
        self.entries.write().remove(id)
    }

    /// Remove every entry a confirmed Delta included.
    pub fn remove_included(&self, included: &[PublicEntry]) -> usize {
        let mut entries = self.entries.write();
        let removed = included
            .iter()
            .filter(|entry| entries.remove(&Self::entry_id(entry)).is_some())
            .count();
        debug!(removed, remaining = entries.len(), "removed included entries");
        removed
    }

    /// Whether an entry with this id is pooled.
    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Number of pooled entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Current statistics.
    pub fn stats(&self) -> MempoolStats {
        let entries = self.entries.read();
        MempoolStats {
            count: entries.len(),
            total_gas: entries
                .values()
                .fold(0u64, |acc, e| acc.saturating_add(e.gas_limit)),
        }
    }
}

impl MempoolReader for Mempool {
    fn get_all(&self) -> Vec<PublicEntry> {
        self.entries.read().values().cloned().collect()
    }
}
