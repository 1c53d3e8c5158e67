//! Bounded history of confirmed delta hashes.
//!
//! The history is the canonical chain head. It only moves forward through
//! [`DeltaHashProvider::try_update_latest_hash`], a compare-and-swap on the
//! current head.

use std::collections::VecDeque;
use std::sync::Arc;

use deltacore_config::HistoryConfig;
use deltacore_core::Clock;
use deltacore_types::Cid;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// A confirmed head and the time it was confirmed (unix ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedHash {
    /// DFS address of the confirmed delta
    pub hash: Cid,
    /// Confirmation time
    pub confirmed_at: u64,
}

/// Tracks the chain head and publishes every advance.
pub struct DeltaHashProvider {
    /// Newest first.
    history: RwLock<VecDeque<ConfirmedHash>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
    updates: broadcast::Sender<Cid>,
}

impl DeltaHashProvider {
    /// Create a history seeded with `genesis_hash` at time 0.
    pub fn new(genesis_hash: Cid, clock: Arc<dyn Clock>, config: &HistoryConfig) -> Self {
        let capacity = config.capacity.max(1);
        let (updates, _) = broadcast::channel(config.channel_capacity.max(1));

        let mut history = VecDeque::with_capacity(capacity.min(1024));
        history.push_front(ConfirmedHash {
            hash: genesis_hash,
            confirmed_at: 0,
        });

        Self {
            history: RwLock::new(history),
            capacity,
            clock,
            updates,
        }
    }

    /// Advance the head from `expected` to `new_hash`.
    ///
    /// Fails without side effects when `expected` is not the current head or
    /// when `new_hash` is already in the history.
    pub fn try_update_latest_hash(&self, expected: &Cid, new_hash: &Cid) -> bool {
        let confirmed_at = self.clock.now_millis();
        {
            let mut history = self.history.write();

            let head = history.front().map(|entry| entry.hash);
            if head.as_ref() != Some(expected) {
                debug!(
                    expected = %expected,
                    head = ?head,
                    "chain head moved, rejecting update"
                );
                return false;
            }

            if history.iter().any(|entry| entry.hash == *new_hash) {
                debug!(hash = %new_hash, "hash already confirmed");
                return false;
            }

            history.push_front(ConfirmedHash {
                hash: *new_hash,
                confirmed_at,
            });
            while history.len() > self.capacity {
                if let Some(evicted) = history.pop_back() {
                    trace!(hash = %evicted.hash, "evicted oldest confirmed hash");
                }
            }
        }

        info!(previous = %expected, head = %new_hash, "chain head advanced");
        // No subscribers is fine.
        let _ = self.updates.send(*new_hash);
        true
    }

    /// Most recent hash confirmed at or before `as_of` (default now).
    ///
    /// `None` when `as_of` predates every retained entry.
    pub fn get_latest_delta_hash(&self, as_of: Option<u64>) -> Option<Cid> {
        let as_of = as_of.unwrap_or_else(|| self.clock.now_millis());
        self.history
            .read()
            .iter()
            .find(|entry| entry.confirmed_at <= as_of)
            .map(|entry| entry.hash)
    }

    /// Current head.
    pub fn latest(&self) -> Cid {
        self.history
            .read()
            .front()
            .map(|entry| entry.hash)
            .unwrap_or_default()
    }

    /// Receive every new head.
    pub fn subscribe(&self) -> broadcast::Receiver<Cid> {
        self.updates.subscribe()
    }

    /// Snapshot of the history, newest first.
    pub fn history(&self) -> Vec<ConfirmedHash> {
        self.history.read().iter().copied().collect()
    }
}
