//! Local collaborators for a node running without a network or an
//! external content store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use deltacore_core::{BroadcastSink, DfsError, DfsReader, DfsResult, DfsWriter, HashProvider};
use deltacore_types::{Cid, ConsensusMessage};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Content-addressed store held in memory.
///
/// Content is addressed by its hash under the configured [`HashProvider`],
/// so writing the same bytes twice yields the same address.
pub struct InMemoryDfs {
    hash_provider: Arc<dyn HashProvider>,
    content: RwLock<HashMap<Cid, Bytes>>,
}

impl InMemoryDfs {
    /// Create an empty store.
    pub fn new(hash_provider: Arc<dyn HashProvider>) -> Self {
        Self {
            hash_provider,
            content: RwLock::new(HashMap::new()),
        }
    }

    /// Whether content is stored under `cid`.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.content.read().contains_key(cid)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.content.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.content.read().is_empty()
    }
}

#[async_trait]
impl DfsReader for InMemoryDfs {
    async fn read(&self, cid: &Cid) -> DfsResult<Bytes> {
        self.content
            .read()
            .get(cid)
            .cloned()
            .ok_or(DfsError::NotFound(*cid))
    }
}

#[async_trait]
impl DfsWriter for InMemoryDfs {
    async fn add(&self, content: Bytes, name: &str, cancel: &CancellationToken) -> DfsResult<Cid> {
        if cancel.is_cancelled() {
            return Err(DfsError::Cancelled);
        }

        let cid = self.hash_provider.compute(&content).to_cid();
        let size = content.len();
        self.content.write().insert(cid, content);
        debug!(%cid, name, size, "content stored");
        Ok(cid)
    }
}

/// Broadcast sink for a node without peers. Messages are logged and counted.
#[derive(Default)]
pub struct LoggingBroadcaster {
    sent: AtomicU64,
}

impl LoggingBroadcaster {
    /// Create a broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages broadcast so far.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl BroadcastSink for LoggingBroadcaster {
    fn broadcast(&self, message: ConsensusMessage) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        match &message {
            ConsensusMessage::Candidate(candidate) => {
                trace!(candidate = %candidate.hash, producer = %candidate.producer_id, "candidate broadcast");
            }
            ConsensusMessage::Favourite(favourite) => {
                trace!(candidate = %favourite.candidate.hash, voter = %favourite.voter_id, "favourite broadcast");
            }
            ConsensusMessage::DfsHash(announcement) => {
                debug!(
                    delta = %announcement.delta_dfs_hash,
                    previous = %announcement.previous_delta_dfs_hash,
                    "delta address broadcast"
                );
            }
        }
    }
}
