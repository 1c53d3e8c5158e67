//! Cycle scheduling.
//!
//! A cycle is split into four phases ordered by offset. Each phase emits
//! `Producing` at its offset and `Collecting` once its production time has
//! elapsed:
//!
//! ```text
//! 0s        5s         10s        15s             20s
//! |Construction|Campaigning|Voting   |Synchronisation|
//! P    C      P     C     P    C    P     C          next cycle
//! ```
//!
//! Cycles start on wall-clock multiples of the cycle duration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use deltacore_config::CycleConfig;
use deltacore_core::Clock;
use deltacore_types::Cid;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::hash_provider::DeltaHashProvider;

const PHASE_CHANNEL_CAPACITY: usize = 64;

/// Phases of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseName {
    /// Candidates are built and broadcast
    Construction,
    /// Favourites are broadcast
    Campaigning,
    /// The elected delta is published
    Voting,
    /// Peers catch up with the new head
    Synchronisation,
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseName::Construction => write!(f, "construction"),
            PhaseName::Campaigning => write!(f, "campaigning"),
            PhaseName::Voting => write!(f, "voting"),
            PhaseName::Synchronisation => write!(f, "synchronisation"),
        }
    }
}

/// Sub-state of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseStatus {
    /// This node acts
    Producing,
    /// This node listens
    Collecting,
}

/// A phase change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    /// Phase entered
    pub name: PhaseName,
    /// Status entered
    pub status: PhaseStatus,
    /// Chain head the round builds on
    pub previous_delta_dfs_hash: Cid,
    /// Emission time (unix ms)
    pub at: u64,
}

/// Timing of one phase within the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTiming {
    /// Phase
    pub name: PhaseName,
    /// Start of `Producing` from the cycle start
    pub offset: Duration,
    /// Length of `Producing`
    pub production: Duration,
    /// Length of `Collecting`
    pub collection: Duration,
}

impl PhaseTiming {
    fn status_at(&self, elapsed: Duration) -> Option<PhaseStatus> {
        let collecting_from = self.offset + self.production;
        if elapsed < self.offset {
            None
        } else if elapsed < collecting_from {
            Some(PhaseStatus::Producing)
        } else if elapsed < collecting_from + self.collection {
            Some(PhaseStatus::Collecting)
        } else {
            None
        }
    }
}

/// Phase timings and cycle length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSchedule {
    phases: Vec<PhaseTiming>,
    cycle_duration: Duration,
}

impl CycleSchedule {
    /// Phases in offset order.
    pub fn phases(&self) -> &[PhaseTiming] {
        &self.phases
    }

    /// Cycle length.
    pub fn cycle_duration(&self) -> Duration {
        self.cycle_duration
    }

    /// Every (phase, status) change with its offset from the cycle start.
    pub fn events(&self) -> Vec<(Duration, PhaseName, PhaseStatus)> {
        self.phases
            .iter()
            .flat_map(|timing| {
                [
                    (timing.offset, timing.name, PhaseStatus::Producing),
                    (
                        timing.offset + timing.production,
                        timing.name,
                        PhaseStatus::Collecting,
                    ),
                ]
            })
            .collect()
    }
}

impl Default for CycleSchedule {
    fn default() -> Self {
        Self::from(&CycleConfig::default())
    }
}

impl From<&CycleConfig> for CycleSchedule {
    fn from(config: &CycleConfig) -> Self {
        let production = Duration::from_millis(config.production_time_ms);
        let collection = Duration::from_millis(config.collection_time_ms);
        let mut phases: Vec<PhaseTiming> = [
            (PhaseName::Construction, config.construction_offset_ms),
            (PhaseName::Campaigning, config.campaigning_offset_ms),
            (PhaseName::Voting, config.voting_offset_ms),
            (PhaseName::Synchronisation, config.synchronisation_offset_ms),
        ]
        .into_iter()
        .map(|(name, offset)| PhaseTiming {
            name,
            offset: Duration::from_millis(offset),
            production,
            collection,
        })
        .collect();
        phases.sort_by_key(|timing| timing.offset);

        Self {
            phases,
            cycle_duration: Duration::from_millis(config.cycle_duration_ms.max(1)),
        }
    }
}

/// Emits phase changes for every cycle.
pub struct CycleEventsProvider {
    schedule: CycleSchedule,
    clock: Arc<dyn Clock>,
    hash_provider: Arc<DeltaHashProvider>,
    phases: broadcast::Sender<Phase>,
}

impl CycleEventsProvider {
    /// Create a provider; nothing is emitted until [`start`](Self::start).
    pub fn new(
        schedule: CycleSchedule,
        clock: Arc<dyn Clock>,
        hash_provider: Arc<DeltaHashProvider>,
    ) -> Self {
        let (phases, _) = broadcast::channel(PHASE_CHANNEL_CAPACITY);
        Self {
            schedule,
            clock,
            hash_provider,
            phases,
        }
    }

    /// The schedule in use.
    pub fn schedule(&self) -> &CycleSchedule {
        &self.schedule
    }

    /// Receive phase changes.
    pub fn subscribe(&self) -> broadcast::Receiver<Phase> {
        self.phases.subscribe()
    }

    /// Wait until the next wall-clock multiple of the cycle duration.
    pub fn time_until_next_cycle_start(&self) -> Duration {
        let cycle = self.schedule.cycle_duration.as_millis() as u64;
        let into_cycle = self.clock.now_millis() % cycle;
        if into_cycle == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(cycle - into_cycle)
        }
    }

    /// Phase and status in effect at `now` for a cycle started at
    /// `cycle_start` (both unix ms). `None` between phases.
    pub fn phase_at(&self, cycle_start: u64, now: u64) -> Option<(PhaseName, PhaseStatus)> {
        let cycle = self.schedule.cycle_duration.as_millis() as u64;
        let elapsed = Duration::from_millis(now.saturating_sub(cycle_start) % cycle);
        self.schedule
            .phases
            .iter()
            .find_map(|timing| timing.status_at(elapsed).map(|status| (timing.name, status)))
    }

    /// Run the cycle loop until `cancel` fires.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut cycle_number: u64 = 1;
            while !cancel.is_cancelled() {
                if !self.run_cycle(cycle_number, &cancel).await {
                    break;
                }
                cycle_number += 1;
            }
            debug!("cycle events stopped");
        })
    }

    /// One cycle; false when cancelled.
    async fn run_cycle(&self, cycle_number: u64, cancel: &CancellationToken) -> bool {
        let wait = self.time_until_next_cycle_start();
        if !sleep_or_cancel(Instant::now() + wait, cancel).await {
            return false;
        }

        let started = Instant::now();
        let started_ms = self.clock.now_millis();
        debug!(cycle = cycle_number, start = started_ms, "cycle starting");

        for (offset, name, status) in self.schedule.events() {
            if !sleep_or_cancel(started + offset, cancel).await {
                return false;
            }

            let now = self.clock.now_millis();
            let previous_delta_dfs_hash = self
                .hash_provider
                .get_latest_delta_hash(Some(now))
                .unwrap_or_else(|| self.hash_provider.latest());
            let phase = Phase {
                name,
                status,
                previous_delta_dfs_hash,
                at: now,
            };
            trace!(cycle = cycle_number, phase = %name, ?status, "phase change");
            // No subscribers is fine.
            let _ = self.phases.send(phase);
        }

        sleep_or_cancel(started + self.schedule.cycle_duration, cancel).await
    }
}

async fn sleep_or_cancel(deadline: Instant, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep_until(deadline) => true,
    }
}
