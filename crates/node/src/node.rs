//! # Delta Core Node
//!
//! Wires the consensus components into a running node.
//!
//! The `Node` struct is responsible for:
//! - Building every consensus component from [`Config`]
//! - Accepting entries into the mempool
//! - Running the round driver on the cycle schedule
//! - Pruning included entries once a delta is confirmed
//! - Handling graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use deltacore_config::Config;
use deltacore_consensus::{
    Consensus, ConsensusComponents, CycleEventsProvider, CycleSchedule, DeltaBuilder,
    DeltaBuilderConfig, DeltaBuilderDeps, DeltaCache, DeltaCacheConfig, DeltaElector,
    DeltaHashProvider, DeltaHub, DeltaVoter, RetryPolicy,
};
use deltacore_core::{
    ChaChaRandomFactory, Clock, HashProvider, KeccakHashProvider, NilStateRoot,
    StaticProducersProvider, SystemClock,
};
use deltacore_mempool::{EntryId, Mempool, MempoolConfig, TransactionRetriever};
use deltacore_types::{Cid, PeerId, PublicEntry};
use parking_lot::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::local::{InMemoryDfs, LoggingBroadcaster};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Parse a hex-encoded peer id, with or without a `0x` prefix.
pub fn parse_peer_id(s: &str) -> Result<PeerId> {
    let trimmed = s.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(hex_part).with_context(|| format!("invalid peer id: {s}"))?;
    if bytes.is_empty() {
        return Err(anyhow!("peer id must not be empty"));
    }
    Ok(PeerId::from_bytes(bytes))
}

/// Identity and producer set of a node.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// This node's identity
    pub local_peer: PeerId,
    /// Producers for every round; the local peer is added when missing
    pub producers: Vec<PeerId>,
}

impl NodeOptions {
    /// A node that is the only producer.
    pub fn single(local_peer: PeerId) -> Self {
        Self {
            producers: vec![local_peer.clone()],
            local_peer,
        }
    }

    /// A sole producer with a random 32-byte identity.
    pub fn generate() -> Self {
        Self::single(PeerId::from_bytes(rand::random::<[u8; 32]>().to_vec()))
    }
}

/// Node lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Built, not yet running
    Starting,
    /// Running rounds
    Running,
    /// Stopping tasks
    ShuttingDown,
    /// All tasks stopped
    Stopped,
}

/// A single delta consensus node.
pub struct Node {
    config: Config,
    local_peer: PeerId,
    mempool: Arc<Mempool>,
    dfs: Arc<InMemoryDfs>,
    cache: Arc<DeltaCache>,
    hash_provider: Arc<DeltaHashProvider>,
    broadcaster: Arc<LoggingBroadcaster>,
    consensus: Arc<Consensus>,
    status: RwLock<NodeStatus>,
    cancel: CancellationToken,
}

impl Node {
    /// Build a node on the system clock.
    pub fn new(config: Config, options: NodeOptions) -> Result<Self> {
        Self::with_clock(config, options, Arc::new(SystemClock))
    }

    /// Build a node on `clock`.
    pub fn with_clock(config: Config, options: NodeOptions, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let NodeOptions {
            local_peer,
            mut producers,
        } = options;
        if !producers.contains(&local_peer) {
            producers.push(local_peer.clone());
        }
        let producer_count = producers.len();
        let producers = Arc::new(StaticProducersProvider::new(producers));

        let hashing: Arc<dyn HashProvider> = Arc::new(KeccakHashProvider);
        let dfs = Arc::new(InMemoryDfs::new(hashing.clone()));
        let broadcaster = Arc::new(LoggingBroadcaster::new());
        let mempool = Arc::new(Mempool::new(MempoolConfig::default()));

        let cache = Arc::new(DeltaCache::new(
            dfs.clone(),
            hashing.as_ref(),
            DeltaCacheConfig::from(&config.cache),
        ));
        let hash_provider = Arc::new(DeltaHashProvider::new(
            cache.genesis_hash(),
            clock.clone(),
            &config.history,
        ));

        let builder = DeltaBuilder::new(
            DeltaBuilderDeps {
                retriever: Arc::new(TransactionRetriever::new(mempool.clone())),
                random_factory: Arc::new(ChaChaRandomFactory),
                hash_provider: hashing,
                cache: cache.clone(),
                state_root: Arc::new(NilStateRoot),
                clock: clock.clone(),
            },
            local_peer.clone(),
            DeltaBuilderConfig::from(&config.builder),
        );

        let components = ConsensusComponents {
            builder: Arc::new(builder),
            voter: Arc::new(DeltaVoter::new(
                producers.clone(),
                local_peer.clone(),
                &config.voting,
            )),
            elector: Arc::new(DeltaElector::new(producers, &config.voting)),
            cache: cache.clone(),
            hub: Arc::new(DeltaHub::new(
                broadcaster.clone(),
                dfs.clone(),
                local_peer.clone(),
                RetryPolicy::from(&config.hub),
            )),
            hash_provider: hash_provider.clone(),
        };
        let cycle = Arc::new(CycleEventsProvider::new(
            CycleSchedule::from(&config.cycle),
            clock,
            hash_provider.clone(),
        ));
        let consensus = Arc::new(Consensus::new(components, cycle, local_peer.clone()));

        info!(
            peer = %local_peer,
            producers = producer_count,
            genesis = %cache.genesis_hash(),
            "node built"
        );

        Ok(Self {
            config,
            local_peer,
            mempool,
            dfs,
            cache,
            hash_provider,
            broadcaster,
            consensus,
            status: RwLock::new(NodeStatus::Starting),
            cancel: CancellationToken::new(),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// This node's identity.
    pub fn local_peer(&self) -> &PeerId {
        &self.local_peer
    }

    /// Pending entries.
    pub fn mempool(&self) -> &Arc<Mempool> {
        &self.mempool
    }

    /// Local content store.
    pub fn dfs(&self) -> &Arc<InMemoryDfs> {
        &self.dfs
    }

    /// Delta cache.
    pub fn cache(&self) -> &Arc<DeltaCache> {
        &self.cache
    }

    /// Chain head tracker.
    pub fn hash_provider(&self) -> &Arc<DeltaHashProvider> {
        &self.hash_provider
    }

    /// Messages broadcast so far.
    pub fn broadcast_count(&self) -> u64 {
        self.broadcaster.sent()
    }

    /// Current chain head.
    pub fn latest_delta_hash(&self) -> Cid {
        self.hash_provider.latest()
    }

    /// Lifecycle state.
    pub fn status(&self) -> NodeStatus {
        *self.status.read()
    }

    fn set_status(&self, status: NodeStatus) {
        debug!(?status, "node status");
        *self.status.write() = status;
    }

    /// Queue an entry for inclusion.
    pub fn submit_entry(&self, entry: PublicEntry) -> Result<EntryId> {
        let id = self.mempool.add_entry(entry)?;
        debug!(entry = %id, pending = self.mempool.len(), "entry submitted");
        Ok(id)
    }

    /// Request shutdown of a running node.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Run until [`shutdown`](Self::shutdown) is called or Ctrl+C arrives.
    pub async fn run(&self) -> Result<()> {
        info!(peer = %self.local_peer, "starting delta core node");

        let tasks = [
            self.consensus.clone().start(self.cancel.child_token()),
            self.spawn_mempool_pruner(),
        ];
        self.set_status(NodeStatus::Running);
        info!(head = %self.latest_delta_hash(), "node is running");

        tokio::select! {
            _ = self.cancel.cancelled() => {
                info!("received shutdown signal");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, initiating shutdown");
            }
        }

        self.set_status(NodeStatus::ShuttingDown);
        self.cancel.cancel();
        for task in tasks {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "task failed during shutdown"),
                Err(_) => warn!("task did not stop in time"),
            }
        }

        self.set_status(NodeStatus::Stopped);
        info!(head = %self.latest_delta_hash(), "node stopped");
        Ok(())
    }

    /// Remove the entries of every newly confirmed delta from the mempool.
    fn spawn_mempool_pruner(&self) -> JoinHandle<()> {
        let mut heads = self.hash_provider.subscribe();
        let cache = self.cache.clone();
        let mempool = self.mempool.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                let head = tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = heads.recv() => match received {
                        Ok(head) => head,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "mempool pruning fell behind head updates");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    },
                };

                match cache.try_get_or_add_confirmed_delta(&head).await {
                    Some(delta) => {
                        let removed = mempool.remove_included(&delta.public_entries);
                        info!(%head, removed, pending = mempool.len(), "confirmed entries pruned");
                    }
                    None => warn!(%head, "confirmed delta not retrievable, mempool left as is"),
                }
            }
        })
    }
}
