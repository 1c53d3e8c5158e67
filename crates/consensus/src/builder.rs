//! Candidate delta construction.
//!
//! ## Algorithm
//!
//! ```text
//! entries   = retriever.get_by_priority()           price desc, time asc
//! selected  = accepted kinds, gas_limit >= floor, within the gas budget
//! seed      = H(previous_delta_hash)
//! salt      = prng(seed).next_int() as 4 LE bytes
//! shuffled  = selected sorted by H(rlp(entry) || salt)
//! content   = rlp(shuffled..) || sorted(signatures..) || rlp(coinbase)
//! candidate = H(content)
//! ```
//!
//! Given the same pool snapshot and previous hash, every honest producer
//! derives the same entry order.

use std::sync::Arc;

use deltacore_config::BuilderConfig;
use deltacore_core::{Clock, DeterministicRandomFactory, HashProvider, StateRootSource};
use deltacore_mempool::TransactionRetriever;
use deltacore_types::{
    CandidateDeltaBroadcast, Cid, CoinbaseEntry, ContentHash, Delta, PeerId, PublicEntry,
};
use tracing::{debug, trace};

use crate::cache::DeltaCache;
use crate::Result;

/// Builder limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaBuilderConfig {
    /// Total gas a delta may consume
    pub delta_gas_limit: u64,
    /// Entries declaring less gas are discarded
    pub min_entry_gas_limit: u64,
}

impl Default for DeltaBuilderConfig {
    fn default() -> Self {
        Self::from(&BuilderConfig::default())
    }
}

impl From<&BuilderConfig> for DeltaBuilderConfig {
    fn from(config: &BuilderConfig) -> Self {
        Self {
            delta_gas_limit: config.delta_gas_limit,
            min_entry_gas_limit: config.min_entry_gas_limit,
        }
    }
}

/// Collaborators of a [`DeltaBuilder`].
pub struct DeltaBuilderDeps {
    /// Pending entries in priority order
    pub retriever: Arc<TransactionRetriever>,
    /// Seeds the per-round shuffle
    pub random_factory: Arc<dyn DeterministicRandomFactory>,
    /// Content hashing
    pub hash_provider: Arc<dyn HashProvider>,
    /// Receives the built delta
    pub cache: Arc<DeltaCache>,
    /// Post-execution state digest
    pub state_root: Arc<dyn StateRootSource>,
    /// Delta timestamps
    pub clock: Arc<dyn Clock>,
}

/// Builds this node's candidate for a round.
pub struct DeltaBuilder {
    deps: DeltaBuilderDeps,
    local_peer: PeerId,
    config: DeltaBuilderConfig,
}

impl DeltaBuilder {
    /// Create a builder producing as `local_peer`.
    pub fn new(deps: DeltaBuilderDeps, local_peer: PeerId, config: DeltaBuilderConfig) -> Self {
        Self {
            deps,
            local_peer,
            config,
        }
    }

    /// Build the candidate following `previous_delta_hash`.
    ///
    /// The full delta is stored in the cache as a local delta under the
    /// candidate hash. An empty pool yields a coinbase-only candidate.
    pub fn build_candidate_delta(
        &self,
        previous_delta_hash: &Cid,
    ) -> Result<CandidateDeltaBroadcast> {
        let pending = self.deps.retriever.get_by_priority(None)?;
        let pending_count = pending.len();

        let selected = self.select_within_budget(pending);
        let salt = self.salt(previous_delta_hash);
        let shuffled = self.shuffle(selected, &salt);

        let coinbase = CoinbaseEntry {
            amount: shuffled
                .iter()
                .fold(0u128, |total, entry| total.saturating_add(entry.fee())),
            receiver_public_key: self.local_peer.to_bytes(),
        };

        let content = Self::candidate_content(&shuffled, &coinbase);
        let merkle_root = self.deps.hash_provider.compute(&content);

        let candidate = CandidateDeltaBroadcast {
            hash: merkle_root.to_cid(),
            previous_delta_dfs_hash: *previous_delta_hash,
            producer_id: self.local_peer.clone(),
        };

        debug!(
            previous = %previous_delta_hash,
            candidate = %candidate.hash,
            pending = pending_count,
            included = shuffled.len(),
            fees = coinbase.amount,
            "candidate delta built"
        );

        let delta = Delta {
            previous_delta_dfs_hash: *previous_delta_hash,
            merkle_root,
            state_root: self.deps.state_root.state_root(),
            timestamp: self.deps.clock.now_millis(),
            public_entries: shuffled,
            coinbase_entries: vec![coinbase],
        };
        self.deps.cache.add_local_delta(&candidate.hash, delta);

        Ok(candidate)
    }

    /// Keep accepted entries that fit the gas budget, in priority order.
    ///
    /// An entry that would overflow the budget is skipped and the scan
    /// continues with the next one.
    fn select_within_budget(&self, entries: Vec<PublicEntry>) -> Vec<PublicEntry> {
        let mut gas_used: u64 = 0;
        let mut selected = Vec::with_capacity(entries.len());

        for entry in entries {
            if !entry.kind().is_accepted() || entry.gas_limit < self.config.min_entry_gas_limit {
                trace!(kind = ?entry.kind(), gas_limit = entry.gas_limit, "discarding entry");
                continue;
            }

            match gas_used.checked_add(entry.gas_limit) {
                Some(total) if total <= self.config.delta_gas_limit => {
                    gas_used = total;
                    selected.push(entry);
                }
                _ => {
                    trace!(
                        gas_limit = entry.gas_limit,
                        gas_used,
                        "entry exceeds remaining delta gas, skipping"
                    );
                }
            }
        }

        selected
    }

    fn salt(&self, previous_delta_hash: &Cid) -> [u8; 4] {
        let seed = self.deps.hash_provider.compute(previous_delta_hash.as_bytes());
        let mut prng = self.deps.random_factory.from_seed(seed.as_bytes());
        prng.next_int().to_le_bytes()
    }

    fn shuffle(&self, entries: Vec<PublicEntry>, salt: &[u8]) -> Vec<PublicEntry> {
        let mut keyed: Vec<(ContentHash, PublicEntry)> = entries
            .into_iter()
            .map(|entry| {
                let rlp = entry.to_rlp();
                let key = self.deps.hash_provider.compute_concat(&[rlp.as_slice(), salt]);
                (key, entry)
            })
            .collect();
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
        keyed.into_iter().map(|(_, entry)| entry).collect()
    }

    fn candidate_content(entries: &[PublicEntry], coinbase: &CoinbaseEntry) -> Vec<u8> {
        let mut content = Vec::new();
        for entry in entries {
            content.extend_from_slice(&entry.to_rlp());
        }

        let mut signatures: Vec<&[u8]> = entries
            .iter()
            .map(|entry| entry.signature.as_bytes())
            .collect();
        signatures.sort_unstable();
        for signature in signatures {
            content.extend_from_slice(signature);
        }

        content.extend_from_slice(&coinbase.to_rlp());
        content
    }
}
