//! Tally of favourite votes received from the network.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use deltacore_config::VotingConfig;
use deltacore_core::ProducersProvider;
use deltacore_types::{CandidateDeltaBroadcast, Cid, FavouriteDeltaBroadcast, FavouriteKey};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::memory_cache::MemoryCache;

/// What [`DeltaElector::on_next`] did with a favourite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionOutcome {
    /// New vote recorded
    Recorded {
        /// Distinct voters for the candidate after recording
        voters: usize,
    },
    /// Same candidate hash and voter already recorded
    Duplicate,
    /// Malformed favourite
    Invalid,
    /// Candidate producer not eligible for the round
    UnknownProducer,
    /// Voter not eligible for the round
    UnknownVoter,
    /// Producer set could not be resolved
    ProducersUnavailable,
}

/// Favourites of one round with a running voter count per candidate.
#[derive(Default)]
struct RoundVotes {
    favourites: HashMap<FavouriteKey, FavouriteDeltaBroadcast>,
    voters: HashMap<Cid, usize>,
}

impl RoundVotes {
    /// Record a favourite; `None` when already recorded.
    fn record(&mut self, key: FavouriteKey, favourite: &FavouriteDeltaBroadcast) -> Option<usize> {
        if self.favourites.contains_key(&key) {
            return None;
        }
        let count = self.voters.entry(key.candidate_hash).or_insert(0);
        *count += 1;
        let voters = *count;
        self.favourites.insert(key, favourite.clone());
        Some(voters)
    }
}

/// Collects favourites and elects the most popular candidate.
pub struct DeltaElector {
    rounds: MemoryCache<Cid, Arc<RwLock<RoundVotes>>>,
    producers: Arc<dyn ProducersProvider>,
    min_vote_ratio_denominator: usize,
    ttl: Duration,
}

impl DeltaElector {
    /// Create an elector.
    pub fn new(producers: Arc<dyn ProducersProvider>, config: &VotingConfig) -> Self {
        Self {
            rounds: MemoryCache::new(usize::MAX),
            producers,
            min_vote_ratio_denominator: config.min_vote_ratio_denominator.max(1),
            ttl: config.favourite_ttl(),
        }
    }

    /// Record a favourite received from a peer.
    pub fn on_next(&self, favourite: &FavouriteDeltaBroadcast) -> ElectionOutcome {
        if !favourite.is_valid() {
            warn!(voter = %favourite.voter_id, "dropping malformed favourite");
            return ElectionOutcome::Invalid;
        }

        let candidate = &favourite.candidate;
        let previous = candidate.previous_delta_dfs_hash;
        let producers = match self.producers.get_producers(&previous) {
            Ok(producers) => producers,
            Err(e) => {
                warn!(%previous, error = %e, "cannot resolve producers for favourite");
                return ElectionOutcome::ProducersUnavailable;
            }
        };

        if !producers.contains(&candidate.producer_id) {
            warn!(
                producer = %candidate.producer_id,
                %previous,
                "favourite candidate producer not found in producer set"
            );
            return ElectionOutcome::UnknownProducer;
        }
        if !producers.contains(&favourite.voter_id) {
            warn!(
                voter = %favourite.voter_id,
                %previous,
                "favourite voter is not a producer"
            );
            return ElectionOutcome::UnknownVoter;
        }

        let round = self.rounds.get_or_insert_with(
            previous,
            || Arc::new(RwLock::new(RoundVotes::default())),
            Some(self.ttl),
        );

        let Some(voters) = round.write().record(favourite.key(), favourite) else {
            trace!(voter = %favourite.voter_id, candidate = %candidate.hash, "duplicate favourite");
            return ElectionOutcome::Duplicate;
        };
        trace!(voter = %favourite.voter_id, candidate = %candidate.hash, voters, "favourite recorded");
        ElectionOutcome::Recorded { voters }
    }

    /// Distinct voters recorded for a candidate.
    pub fn voter_count(&self, previous_hash: &Cid, candidate_hash: &Cid) -> usize {
        let Some(round) = self.rounds.get(previous_hash) else {
            return 0;
        };
        let count = round.read().voters.get(candidate_hash).copied();
        count.unwrap_or(0)
    }

    /// Drop rounds older than the favourite TTL, returning how many went.
    pub fn purge_expired(&self) -> usize {
        let purged = self.rounds.purge_expired();
        if purged > 0 {
            debug!(purged, remaining = self.rounds.len(), "expired election rounds dropped");
        }
        purged
    }

    /// Rounds currently held, including expired ones not yet purged.
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Candidate with the most distinct voters for `previous_hash`.
    ///
    /// Candidates below `producers / min_vote_ratio_denominator` voters are
    /// not electable. Equal counts go to the higher candidate hash.
    pub fn get_most_popular_candidate_delta(
        &self,
        previous_hash: &Cid,
    ) -> Option<CandidateDeltaBroadcast> {
        let Some(round) = self.rounds.get(previous_hash) else {
            debug!(previous = %previous_hash, "no favourites for previous hash");
            return None;
        };

        let producers = match self.producers.get_producers(previous_hash) {
            Ok(producers) => producers,
            Err(e) => {
                warn!(previous = %previous_hash, error = %e, "cannot resolve producers for election");
                return None;
            }
        };
        let threshold = producers.len() / self.min_vote_ratio_denominator;

        // Key order: the lowest voter id's favourite represents its candidate.
        let votes = round.read();
        let mut tally: BTreeMap<Cid, (usize, &CandidateDeltaBroadcast)> = BTreeMap::new();
        let ordered: BTreeMap<&FavouriteKey, &FavouriteDeltaBroadcast> =
            votes.favourites.iter().collect();
        for (key, favourite) in ordered {
            tally
                .entry(key.candidate_hash)
                .or_insert((0, &favourite.candidate))
                .0 += 1;
        }

        let elected = tally
            .into_iter()
            .filter(|(_, (count, _))| *count >= threshold)
            .max_by(|(a_hash, (a_count, _)), (b_hash, (b_count, _))| {
                a_count.cmp(b_count).then_with(|| a_hash.cmp(b_hash))
            })
            .map(|(_, (count, candidate))| (count, candidate.clone()));

        match elected {
            Some((voters, candidate)) => {
                debug!(
                    previous = %previous_hash,
                    elected = %candidate.hash,
                    voters,
                    threshold,
                    "most popular candidate"
                );
                Some(candidate)
            }
            None => {
                debug!(previous = %previous_hash, threshold, "no candidate reached the vote threshold");
                None
            }
        }
    }
}
