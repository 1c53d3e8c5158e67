//! Pending entries and execution state.

use deltacore_types::{ContentHash, PublicEntry};

/// Read access to the pool of pending entries.
pub trait MempoolReader: Send + Sync {
    /// Snapshot of every pending entry, in no particular order.
    fn get_all(&self) -> Vec<PublicEntry>;
}

/// Supplies the post-execution state root recorded in new Deltas.
pub trait StateRootSource: Send + Sync {
    /// Current state root.
    fn state_root(&self) -> ContentHash;
}

/// State root source for nodes that do not execute entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NilStateRoot;

impl StateRootSource for NilStateRoot {
    fn state_root(&self) -> ContentHash {
        ContentHash::NIL
    }
}
