//! Network-facing side of consensus: broadcasts and DFS publication.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use deltacore_config::HubConfig;
use deltacore_core::{BroadcastSink, DfsError, DfsWriter};
use deltacore_types::{
    CandidateDeltaBroadcast, Cid, ConsensusMessage, Delta, DeltaDfsHashBroadcast,
    FavouriteDeltaBroadcast, PeerId,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{ConsensusError, Result};

/// Exponential backoff for DFS publication.
///
/// One initial attempt, then up to `max_retries` retries. Retry `n`
/// (1-based) waits `base_delay * 2^min(n, max_exponent)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff base
    pub base_delay: Duration,
    /// Cap on the backoff exponent
    pub max_exponent: u32,
}

impl RetryPolicy {
    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.min(self.max_exponent);
        self.base_delay.saturating_mul(1u32 << exponent.min(31))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&HubConfig::default())
    }
}

impl From<&HubConfig> for RetryPolicy {
    fn from(config: &HubConfig) -> Self {
        Self {
            max_retries: config.max_publish_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_exponent: config.max_backoff_exponent,
        }
    }
}

/// Sends this node's consensus messages and publishes confirmed deltas.
pub struct DeltaHub {
    sink: Arc<dyn BroadcastSink>,
    dfs: Arc<dyn DfsWriter>,
    local_peer: PeerId,
    retry: RetryPolicy,
}

impl DeltaHub {
    /// Create a hub for `local_peer`.
    pub fn new(
        sink: Arc<dyn BroadcastSink>,
        dfs: Arc<dyn DfsWriter>,
        local_peer: PeerId,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            sink,
            dfs,
            local_peer,
            retry,
        }
    }

    /// Broadcast a candidate this node produced.
    ///
    /// Candidates from any other producer are not relayed; returns whether
    /// the candidate was sent.
    pub fn broadcast_candidate(&self, candidate: &CandidateDeltaBroadcast) -> bool {
        if candidate.producer_id != self.local_peer {
            warn!(
                producer = %candidate.producer_id,
                "refusing to broadcast a candidate produced by another peer"
            );
            return false;
        }

        info!(candidate = %candidate.hash, previous = %candidate.previous_delta_dfs_hash, "broadcasting candidate");
        self.sink
            .broadcast(ConsensusMessage::Candidate(candidate.clone()));
        true
    }

    /// Broadcast a favourite.
    pub fn broadcast_favourite_candidate_delta(&self, favourite: &FavouriteDeltaBroadcast) {
        debug!(candidate = %favourite.candidate.hash, voter = %favourite.voter_id, "broadcasting favourite");
        self.sink
            .broadcast(ConsensusMessage::Favourite(favourite.clone()));
    }

    /// Publish `delta` to the DFS and announce its address.
    ///
    /// Returns `Ok(None)` when `cancel` fires before a publish succeeds, and
    /// [`ConsensusError::PublishFailed`] when every attempt failed.
    pub async fn publish_delta_to_dfs_and_broadcast_address(
        &self,
        delta: &Delta,
        cancel: &CancellationToken,
    ) -> Result<Option<Cid>> {
        let content = Bytes::from(delta.to_rlp());
        let name = delta.merkle_root.to_cid().to_string();
        let attempts = self.retry.max_attempts();

        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                debug!(attempt, "delta publish cancelled");
                return Ok(None);
            }

            match self.dfs.add(content.clone(), &name, cancel).await {
                Ok(address) => {
                    info!(
                        %address,
                        previous = %delta.previous_delta_dfs_hash,
                        attempt,
                        "delta published to dfs"
                    );
                    self.sink
                        .broadcast(ConsensusMessage::DfsHash(DeltaDfsHashBroadcast {
                            delta_dfs_hash: address,
                            previous_delta_dfs_hash: delta.previous_delta_dfs_hash,
                        }));
                    return Ok(Some(address));
                }
                Err(DfsError::Cancelled) => {
                    debug!(attempt, "delta publish cancelled by dfs");
                    return Ok(None);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= attempts {
                        error!(attempts, name = %name, error = %e, "giving up on delta publish");
                        return Err(ConsensusError::PublishFailed {
                            attempts,
                            last_error: e,
                        });
                    }

                    let delay = self.retry.delay_for(attempt);
                    warn!(attempt, error = %e, ?delay, "delta publish failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!(attempt, "delta publish cancelled during backoff");
                            return Ok(None);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
