//! Local view of confirmed deltas, backed by the DFS.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use deltacore_config::CacheConfig;
use deltacore_core::{DfsReader, HashProvider};
use deltacore_types::{Cid, Delta};
use tracing::{debug, trace};

use crate::memory_cache::{EvictionReason, MemoryCache};

/// Key namespace of the delta cache.
///
/// Confirmed deltas are keyed by DFS address, local ones by candidate hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaCacheKey {
    /// A confirmed delta
    Confirmed(Cid),
    /// A locally built delta awaiting confirmation
    Local(Cid),
}

impl fmt::Display for DeltaCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaCacheKey::Confirmed(cid) => write!(f, "confirmed:{}", cid),
            DeltaCacheKey::Local(cid) => write!(f, "local:{}", cid),
        }
    }
}

/// Expiry policy of the delta cache.
#[derive(Debug, Clone)]
pub struct DeltaCacheConfig {
    /// Confirmed delta lifetime, `None` for no expiry
    pub confirmed_ttl: Option<Duration>,
    /// Local delta lifetime
    pub local_ttl: Duration,
    /// Capacity across both namespaces
    pub max_entries: usize,
}

impl Default for DeltaCacheConfig {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for DeltaCacheConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            confirmed_ttl: config.confirmed_ttl(),
            local_ttl: config.local_ttl(),
            max_entries: config.max_entries,
        }
    }
}

/// Confirmed and locally built deltas.
///
/// The genesis delta is always resident. Misses on confirmed deltas fall
/// back to the DFS; decoded deltas that are not structurally valid are
/// reported as absent.
pub struct DeltaCache {
    memory: MemoryCache<DeltaCacheKey, Arc<Delta>>,
    dfs: Arc<dyn DfsReader>,
    genesis_hash: Cid,
    config: DeltaCacheConfig,
}

impl DeltaCache {
    /// Create a cache seeded with the genesis delta.
    pub fn new(
        dfs: Arc<dyn DfsReader>,
        hash_provider: &dyn HashProvider,
        config: DeltaCacheConfig,
    ) -> Self {
        let genesis = Delta::genesis();
        let genesis_hash = hash_provider.compute(&genesis.to_rlp()).to_cid();

        let memory = MemoryCache::new(config.max_entries).with_eviction_callback(Arc::new(
            |key: &DeltaCacheKey, _: &Arc<Delta>, reason: EvictionReason| {
                debug!(%key, %reason, "delta evicted from cache");
            },
        ));
        memory.insert_pinned(DeltaCacheKey::Confirmed(genesis_hash), Arc::new(genesis));

        debug!(genesis = %genesis_hash, "delta cache initialised");
        Self {
            memory,
            dfs,
            genesis_hash,
            config,
        }
    }

    /// Address of the genesis delta.
    pub fn genesis_hash(&self) -> Cid {
        self.genesis_hash
    }

    /// Confirmed delta at `hash`, reading it from the DFS on a miss.
    pub async fn try_get_or_add_confirmed_delta(&self, hash: &Cid) -> Option<Delta> {
        let key = DeltaCacheKey::Confirmed(*hash);
        if let Some(delta) = self.memory.get(&key) {
            trace!(%hash, "delta cache hit");
            return Some(Delta::clone(&delta));
        }

        debug!(%hash, "delta cache miss, reading from dfs");
        let delta = Arc::new(self.dfs.try_read_delta(hash).await?);

        let cached = self
            .memory
            .get_or_insert_with(key, || delta, self.config.confirmed_ttl);
        Some(Delta::clone(&cached))
    }

    /// Store a locally built delta under its candidate hash.
    pub fn add_local_delta(&self, candidate_hash: &Cid, delta: Delta) {
        trace!(candidate = %candidate_hash, "storing local delta");
        self.memory.insert(
            DeltaCacheKey::Local(*candidate_hash),
            Arc::new(delta),
            Some(self.config.local_ttl),
        );
    }

    /// Locally built delta for `candidate_hash`, if still retained.
    pub fn try_get_local_delta(&self, candidate_hash: &Cid) -> Option<Delta> {
        self.memory
            .get(&DeltaCacheKey::Local(*candidate_hash))
            .map(|delta| Delta::clone(&delta))
    }

    /// Drop expired deltas.
    pub fn purge_expired(&self) -> usize {
        self.memory.purge_expired()
    }
}
