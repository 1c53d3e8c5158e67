//! Priority-ordered retrieval of pending entries.

use std::cmp::Reverse;
use std::sync::Arc;

use deltacore_core::MempoolReader;
use deltacore_types::{PublicEntry, Signature};
use tracing::trace;

use crate::{MempoolError, Result};

/// Ordering key for pending entries.
///
/// Entries are sorted by:
/// 1. Gas price (descending)
/// 2. Timestamp (ascending)
/// 3. Signature bytes (ascending, unsigned) for a deterministic total order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriorityKey {
    gas_price: Reverse<u128>,
    timestamp: u64,
    signature: Signature,
}

impl PriorityKey {
    /// Key of an entry.
    pub fn of(entry: &PublicEntry) -> Self {
        Self {
            gas_price: Reverse(entry.gas_price),
            timestamp: entry.timestamp,
            signature: entry.signature.clone(),
        }
    }
}

/// Reads pending entries from a pool in priority order.
pub struct TransactionRetriever {
    mempool: Arc<dyn MempoolReader>,
}

impl TransactionRetriever {
    /// Create a retriever over `mempool`.
    pub fn new(mempool: Arc<dyn MempoolReader>) -> Self {
        Self { mempool }
    }

    /// Pending entries, highest priority first.
    ///
    /// `max_count` bounds the result; `Some(0)` is rejected.
    pub fn get_by_priority(&self, max_count: Option<usize>) -> Result<Vec<PublicEntry>> {
        if max_count == Some(0) {
            return Err(MempoolError::InvalidMaxCount(0));
        }

        let mut entries = self.mempool.get_all();
        entries.sort_by_cached_key(PriorityKey::of);
        if let Some(max) = max_count {
            entries.truncate(max);
        }

        trace!(count = entries.len(), "retrieved entries by priority");
        Ok(entries)
    }
}
