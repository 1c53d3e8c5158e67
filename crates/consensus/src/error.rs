//! Consensus error types.

use deltacore_core::DfsError;
use deltacore_mempool::MempoolError;
use deltacore_types::Cid;
use thiserror::Error;

/// Errors surfaced by the consensus components.
///
/// Per-message validation failures are not errors; see
/// [`VoteOutcome`](crate::VoteOutcome) and
/// [`ElectionOutcome`](crate::ElectionOutcome).
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// Every publish attempt failed
    #[error("failed to publish delta to dfs after {attempts} attempts: {last_error}")]
    PublishFailed {
        /// Attempts made before giving up
        attempts: u32,
        /// Failure of the final attempt
        #[source]
        last_error: DfsError,
    },

    /// Mempool retrieval failure
    #[error("mempool error: {0}")]
    Mempool(#[from] MempoolError),

    /// This node is not a producer for the round it tried to build
    #[error("peer {peer} is not a producer for {previous}")]
    UnknownProducer {
        /// Offending peer, base58
        peer: String,
        /// Previous delta hash of the round
        previous: Cid,
    },

    /// The elected candidate was not built locally
    #[error("no local delta for candidate {0}")]
    MissingLocalDelta(Cid),
}

/// Result alias for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;
