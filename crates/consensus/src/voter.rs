//! Scoring of candidate deltas received from producers.
//!
//! Each candidate seen for a previous hash is scored once from its
//! producer's rank, then gains a point for every further delivery:
//!
//! ```text
//! score = 100 * (N - rank) + deliveries
//! ```
//!
//! where `N` is the number of eligible producers and `rank` the producer's
//! position in that list. The favourite is the highest score, ties going to
//! the lowest candidate hash.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use deltacore_config::VotingConfig;
use deltacore_core::ProducersProvider;
use deltacore_types::{CandidateDeltaBroadcast, Cid, FavouriteDeltaBroadcast, PeerId};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::memory_cache::MemoryCache;

/// Weight of a producer's rank in its candidate's starting score.
pub const RANK_WEIGHT: u64 = 100;

/// What [`DeltaVoter::on_next`] did with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First sighting, scored from the producer's rank
    Scored {
        /// Starting score
        score: u64,
    },
    /// Repeat sighting, score incremented
    Incremented {
        /// Score after the increment
        score: u64,
    },
    /// Missing hash, previous hash or producer
    Invalid,
    /// Producer not eligible for the round
    UnknownProducer,
    /// Producer set could not be resolved
    ProducersUnavailable,
}

impl VoteOutcome {
    /// Whether the candidate was counted.
    pub fn is_counted(&self) -> bool {
        matches!(self, VoteOutcome::Scored { .. } | VoteOutcome::Incremented { .. })
    }
}

/// A candidate with its running score.
#[derive(Debug)]
pub struct ScoredCandidateDelta {
    candidate: CandidateDeltaBroadcast,
    score: AtomicU64,
}

impl ScoredCandidateDelta {
    fn new(candidate: CandidateDeltaBroadcast, score: u64) -> Self {
        Self {
            candidate,
            score: AtomicU64::new(score),
        }
    }

    /// The scored candidate.
    pub fn candidate(&self) -> &CandidateDeltaBroadcast {
        &self.candidate
    }

    /// Current score.
    pub fn score(&self) -> u64 {
        self.score.load(Ordering::Acquire)
    }

    fn increment(&self) -> u64 {
        self.score.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Candidates scored for one previous hash, keyed by candidate hash.
#[derive(Debug, Default)]
struct RoundScores {
    candidates: RwLock<HashMap<Cid, Arc<ScoredCandidateDelta>>>,
}

impl RoundScores {
    fn record(&self, candidate: &CandidateDeltaBroadcast, starting_score: u64) -> VoteOutcome {
        if let Some(scored) = self.candidates.read().get(&candidate.hash) {
            return VoteOutcome::Incremented {
                score: scored.increment(),
            };
        }

        match self.candidates.write().entry(candidate.hash) {
            Entry::Occupied(entry) => VoteOutcome::Incremented {
                score: entry.get().increment(),
            },
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(ScoredCandidateDelta::new(
                    candidate.clone(),
                    starting_score,
                )));
                VoteOutcome::Scored {
                    score: starting_score,
                }
            }
        }
    }

    fn favourite(&self) -> Option<CandidateDeltaBroadcast> {
        self.candidates
            .read()
            .values()
            .map(|scored| (scored.score(), scored))
            .max_by(|(a_score, a), (b_score, b)| {
                a_score
                    .cmp(b_score)
                    .then_with(|| b.candidate.hash.cmp(&a.candidate.hash))
            })
            .map(|(_, scored)| scored.candidate.clone())
    }
}

/// Scores candidates and answers which one this node favours.
///
/// Safe to call from any number of tasks; concurrent first sightings of a
/// candidate resolve to a single entry.
pub struct DeltaVoter {
    rounds: MemoryCache<Cid, Arc<RoundScores>>,
    producers: Arc<dyn ProducersProvider>,
    local_peer: PeerId,
    ttl: Duration,
}

impl DeltaVoter {
    /// Create a voter for `local_peer`.
    pub fn new(
        producers: Arc<dyn ProducersProvider>,
        local_peer: PeerId,
        config: &VotingConfig,
    ) -> Self {
        Self {
            rounds: MemoryCache::new(usize::MAX),
            producers,
            local_peer,
            ttl: config.candidate_ttl(),
        }
    }

    /// Score an incoming candidate.
    pub fn on_next(&self, candidate: &CandidateDeltaBroadcast) -> VoteOutcome {
        if !candidate.is_valid() {
            warn!(%candidate, "dropping malformed candidate");
            return VoteOutcome::Invalid;
        }

        let previous = candidate.previous_delta_dfs_hash;
        let producers = match self.producers.get_producers(&previous) {
            Ok(producers) => producers,
            Err(e) => {
                warn!(%previous, error = %e, "cannot resolve producers for candidate");
                return VoteOutcome::ProducersUnavailable;
            }
        };

        let Some(rank) = producers.iter().position(|p| *p == candidate.producer_id) else {
            warn!(
                producer = %candidate.producer_id,
                %previous,
                "candidate producer not found in producer set"
            );
            return VoteOutcome::UnknownProducer;
        };

        let starting_score = RANK_WEIGHT * (producers.len() - rank) as u64 + 1;
        let round = self.rounds.get_or_insert_with(
            previous,
            || Arc::new(RoundScores::default()),
            Some(self.ttl),
        );
        let outcome = round.record(candidate, starting_score);

        trace!(candidate = %candidate.hash, rank, ?outcome, "candidate scored");
        outcome
    }

    /// Current score of a candidate, if it has been seen.
    pub fn score_of(&self, previous_hash: &Cid, candidate_hash: &Cid) -> Option<u64> {
        let round = self.rounds.get(previous_hash)?;
        let score = round
            .candidates
            .read()
            .get(candidate_hash)
            .map(|scored| scored.score());
        score
    }

    /// Drop rounds older than the candidate TTL, returning how many went.
    pub fn purge_expired(&self) -> usize {
        let purged = self.rounds.purge_expired();
        if purged > 0 {
            debug!(purged, remaining = self.rounds.len(), "expired voting rounds dropped");
        }
        purged
    }

    /// Rounds currently held, including expired ones not yet purged.
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Highest scored candidate for `previous_hash`, as this node's vote.
    pub fn try_get_favourite_delta(&self, previous_hash: &Cid) -> Option<FavouriteDeltaBroadcast> {
        let Some(round) = self.rounds.get(previous_hash) else {
            debug!(previous = %previous_hash, "no candidates for previous hash");
            return None;
        };

        let candidate = round.favourite()?;
        debug!(previous = %previous_hash, favourite = %candidate.hash, "favourite selected");
        Some(FavouriteDeltaBroadcast {
            candidate,
            voter_id: self.local_peer.clone(),
        })
    }
}
