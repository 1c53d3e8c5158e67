//! Round driver wiring phase changes to the consensus components.

use std::sync::Arc;

use deltacore_types::{Cid, DeltaDfsHashBroadcast, PeerId};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::builder::DeltaBuilder;
use crate::cache::DeltaCache;
use crate::cycle::{CycleEventsProvider, Phase, PhaseName, PhaseStatus};
use crate::elector::DeltaElector;
use crate::hash_provider::DeltaHashProvider;
use crate::hub::DeltaHub;
use crate::voter::{DeltaVoter, VoteOutcome};
use crate::{ConsensusError, Result};

/// What the driver did for a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundAction {
    /// Nothing to do in this phase
    Idle,
    /// Built and broadcast a candidate
    CandidateBroadcast(Cid),
    /// Broadcast this node's favourite
    FavouriteBroadcast(Cid),
    /// Published the elected delta and advanced the head
    Published(Cid),
    /// Publication was cancelled
    PublishAbandoned,
}

/// Consensus components shared by the round driver.
pub struct ConsensusComponents {
    /// Candidate construction
    pub builder: Arc<DeltaBuilder>,
    /// Local scoring
    pub voter: Arc<DeltaVoter>,
    /// Vote tally
    pub elector: Arc<DeltaElector>,
    /// Delta storage
    pub cache: Arc<DeltaCache>,
    /// Network and DFS output
    pub hub: Arc<DeltaHub>,
    /// Chain head
    pub hash_provider: Arc<DeltaHashProvider>,
}

/// Drives one node through each cycle.
pub struct Consensus {
    components: ConsensusComponents,
    cycle: Arc<CycleEventsProvider>,
    local_peer: PeerId,
}

impl Consensus {
    /// Create a driver for `local_peer`.
    pub fn new(
        components: ConsensusComponents,
        cycle: Arc<CycleEventsProvider>,
        local_peer: PeerId,
    ) -> Self {
        info!(peer = %local_peer, "consensus initialised");
        Self {
            components,
            cycle,
            local_peer,
        }
    }

    /// Act on a phase change. Only `Producing` statuses trigger work.
    ///
    /// Synchronisation drops expired voting, election and local delta state.
    pub async fn handle_phase(
        &self,
        phase: &Phase,
        cancel: &CancellationToken,
    ) -> Result<RoundAction> {
        if phase.status != PhaseStatus::Producing {
            return Ok(RoundAction::Idle);
        }

        let previous = &phase.previous_delta_dfs_hash;
        let c = &self.components;
        match phase.name {
            PhaseName::Construction => {
                let candidate = c.builder.build_candidate_delta(previous)?;
                if c.voter.on_next(&candidate) == VoteOutcome::UnknownProducer {
                    return Err(ConsensusError::UnknownProducer {
                        peer: self.local_peer.to_string(),
                        previous: *previous,
                    });
                }
                c.hub.broadcast_candidate(&candidate);
                Ok(RoundAction::CandidateBroadcast(candidate.hash))
            }
            PhaseName::Campaigning => {
                let Some(favourite) = c.voter.try_get_favourite_delta(previous) else {
                    return Ok(RoundAction::Idle);
                };
                c.hub.broadcast_favourite_candidate_delta(&favourite);
                c.elector.on_next(&favourite);
                Ok(RoundAction::FavouriteBroadcast(favourite.candidate.hash))
            }
            PhaseName::Voting => {
                let Some(elected) = c.elector.get_most_popular_candidate_delta(previous) else {
                    return Ok(RoundAction::Idle);
                };
                if elected.producer_id != self.local_peer {
                    debug!(
                        elected = %elected.hash,
                        producer = %elected.producer_id,
                        "elected candidate belongs to another producer"
                    );
                    return Ok(RoundAction::Idle);
                }

                let delta = c
                    .cache
                    .try_get_local_delta(&elected.hash)
                    .ok_or(ConsensusError::MissingLocalDelta(elected.hash))?;

                match c
                    .hub
                    .publish_delta_to_dfs_and_broadcast_address(&delta, cancel)
                    .await?
                {
                    Some(address) => {
                        info!(%address, previous = %delta.previous_delta_dfs_hash, "new delta published");
                        c.hash_provider
                            .try_update_latest_hash(&delta.previous_delta_dfs_hash, &address);
                        Ok(RoundAction::Published(address))
                    }
                    None => Ok(RoundAction::PublishAbandoned),
                }
            }
            PhaseName::Synchronisation => {
                let purged =
                    c.voter.purge_expired() + c.elector.purge_expired() + c.cache.purge_expired();
                if purged > 0 {
                    debug!(purged, "expired round state dropped");
                }
                Ok(RoundAction::Idle)
            }
        }
    }

    /// Adopt a delta another producer published.
    ///
    /// The delta must extend the current head and be readable from the DFS.
    pub async fn on_delta_dfs_hash(&self, announcement: &DeltaDfsHashBroadcast) -> bool {
        let c = &self.components;
        let head = c.hash_provider.latest();
        if announcement.previous_delta_dfs_hash != head {
            debug!(
                announced = %announcement.delta_dfs_hash,
                previous = %announcement.previous_delta_dfs_hash,
                %head,
                "announced delta does not extend the head"
            );
            return false;
        }

        let Some(delta) = c
            .cache
            .try_get_or_add_confirmed_delta(&announcement.delta_dfs_hash)
            .await
        else {
            warn!(announced = %announcement.delta_dfs_hash, "announced delta not retrievable");
            return false;
        };
        if delta.previous_delta_dfs_hash != announcement.previous_delta_dfs_hash {
            warn!(
                announced = %announcement.delta_dfs_hash,
                "announced delta does not match its claimed predecessor"
            );
            return false;
        }

        c.hash_provider
            .try_update_latest_hash(&head, &announcement.delta_dfs_hash)
    }

    /// Wait for the next cycle boundary, then run the cycle loop and act on
    /// every phase until `cancel` fires.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut phases = self.cycle.subscribe();
            let cycle_task = self.cycle.clone().start(cancel.clone());

            loop {
                let phase = tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = phases.recv() => match received {
                        Ok(phase) => phase,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "consensus fell behind phase changes");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    },
                };

                match self.handle_phase(&phase, &cancel).await {
                    Ok(RoundAction::Idle) => {}
                    Ok(action) => debug!(phase = %phase.name, ?action, "phase handled"),
                    Err(e) => warn!(phase = %phase.name, error = %e, "phase failed"),
                }
            }

            if let Err(e) = cycle_task.await {
                warn!(error = %e, "cycle task failed");
            }
            info!("consensus stopped");
        })
    }
}
