//! # Delta Core Consensus
//!
//! The delta consensus engine: turns pending entries into a deterministically
//! ordered, content-addressed Delta, spreads it to the other producers,
//! collects their votes and converges on one next Delta per cycle.
//!
//! ## Consensus Flow
//!
//! ```text
//! Cycle, previous hash P:
//!
//! ┌──────────────┐
//! │ CONSTRUCTION │  candidate = builder.build_candidate_delta(P)
//! │              │  voter.on_next(candidate); hub.broadcast_candidate(candidate)
//! └──────┬───────┘
//!        │         peers: voter.on_next(candidate)
//!        ▼         score = 100 * (N - rank) + deliveries
//! ┌──────────────┐
//! │ CAMPAIGNING  │  favourite = voter.try_get_favourite_delta(P)
//! │              │  hub.broadcast_favourite(favourite); elector.on_next(favourite)
//! └──────┬───────┘
//!        │         peers: elector.on_next(favourite), one vote per (hash, voter)
//!        ▼
//! ┌──────────────┐
//! │    VOTING    │  elected = elector.get_most_popular_candidate_delta(P)
//! │              │  IF elected was built here:
//! │              │      address = hub.publish_delta_to_dfs_and_broadcast_address(delta)
//! │              │      hash_provider.try_update_latest_hash(P, address)
//! └──────┬───────┘
//!        │         peers: on DeltaDfsHashBroadcast, read from the DFS and advance
//!        ▼
//! ┌──────────────┐
//! │ SYNCHRONISE  │  next cycle builds on the new head
//! └──────────────┘
//! ```
//!
//! ## Components
//!
//! - [`DeltaBuilder`] - candidate construction
//! - [`DeltaVoter`] - rank-weighted scoring of received candidates
//! - [`DeltaElector`] - tally of received favourites
//! - [`DeltaCache`] - confirmed and local deltas, DFS fallback
//! - [`DeltaHashProvider`] - bounded history of confirmed heads
//! - [`DeltaHub`] - broadcasts and DFS publication with retry
//! - [`CycleEventsProvider`] - phase timing
//! - [`Consensus`] - round driver
//!
//! Voter, elector and cache are independent and each safe for concurrent
//! use. An election result is a recommendation; only
//! [`DeltaHashProvider::try_update_latest_hash`] moves the head.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod builder;
pub mod cache;
pub mod cycle;
pub mod elector;
pub mod error;
pub mod hash_provider;
pub mod hub;
pub mod memory_cache;
pub mod round;
pub mod voter;

pub use builder::{DeltaBuilder, DeltaBuilderConfig, DeltaBuilderDeps};
pub use cache::{DeltaCache, DeltaCacheConfig, DeltaCacheKey};
pub use cycle::{CycleEventsProvider, CycleSchedule, Phase, PhaseName, PhaseStatus, PhaseTiming};
pub use elector::{DeltaElector, ElectionOutcome};
pub use error::{ConsensusError, Result};
pub use hash_provider::{ConfirmedHash, DeltaHashProvider};
pub use hub::{DeltaHub, RetryPolicy};
pub use memory_cache::{EvictionCallback, EvictionReason, MemoryCache};
pub use round::{Consensus, ConsensusComponents, RoundAction};
pub use voter::{DeltaVoter, ScoredCandidateDelta, VoteOutcome};
