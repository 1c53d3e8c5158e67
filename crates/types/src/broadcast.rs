//! Messages exchanged between producers during a round.

use crate::{Cid, PeerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A producer's proposal for the Delta following `previous_delta_dfs_hash`.
///
/// Two candidates are the same round participant when all three fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateDeltaBroadcast {
    /// Content identifier of the candidate
    pub hash: Cid,
    /// DFS address of the Delta this candidate follows
    pub previous_delta_dfs_hash: Cid,
    /// Producer that built the candidate
    pub producer_id: PeerId,
}

impl CandidateDeltaBroadcast {
    /// Every field must be present for the candidate to take part in a round.
    pub fn is_valid(&self) -> bool {
        !self.hash.is_nil() && !self.previous_delta_dfs_hash.is_nil() && !self.producer_id.is_empty()
    }
}

impl fmt::Display for CandidateDeltaBroadcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Candidate {{ hash: {}, previous: {}, producer: {} }}",
            self.hash, self.previous_delta_dfs_hash, self.producer_id
        )
    }
}

/// A peer's declared favourite candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavouriteDeltaBroadcast {
    /// The candidate voted for
    pub candidate: CandidateDeltaBroadcast,
    /// The peer casting the vote
    pub voter_id: PeerId,
}

impl FavouriteDeltaBroadcast {
    /// The vote is well formed when its candidate is and the voter is named.
    pub fn is_valid(&self) -> bool {
        self.candidate.is_valid() && !self.voter_id.is_empty()
    }

    /// Deduplication identity of this vote.
    pub fn key(&self) -> FavouriteKey {
        FavouriteKey {
            candidate_hash: self.candidate.hash,
            voter_id: self.voter_id.clone(),
        }
    }
}

/// Identity of a favourite vote: candidate hash and voter only.
///
/// Two favourites that differ only in the candidate's producer or previous hash
/// count as the same vote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FavouriteKey {
    /// Candidate hash voted for
    pub candidate_hash: Cid,
    /// Voter
    pub voter_id: PeerId,
}

/// Announcement that a Delta was published to the DFS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeltaDfsHashBroadcast {
    /// DFS address of the published Delta
    pub delta_dfs_hash: Cid,
    /// DFS address of its predecessor
    pub previous_delta_dfs_hash: Cid,
}

/// Any message the engine hands to the network layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusMessage {
    /// Locally produced candidate
    Candidate(CandidateDeltaBroadcast),
    /// Local favourite vote
    Favourite(FavouriteDeltaBroadcast),
    /// Published Delta address
    DfsHash(DeltaDfsHashBroadcast),
}
