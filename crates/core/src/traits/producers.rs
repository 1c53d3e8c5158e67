//! Producer set lookup.

use deltacore_types::{Cid, PeerId};
use thiserror::Error;

/// Errors returned when the producer set cannot be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProducersError {
    /// No producer set is known for this previous hash.
    #[error("no producers known for previous delta {0}")]
    Unknown(Cid),

    /// The provider failed for another reason.
    #[error("producers provider error: {0}")]
    Internal(String),
}

/// Resolves the producers eligible for the Delta following a previous hash.
///
/// The returned order is the producers' rank for that round: index 0 is the
/// highest-ranked producer.
pub trait ProducersProvider: Send + Sync {
    /// Ordered producers for the round following `previous_delta_hash`.
    fn get_producers(&self, previous_delta_hash: &Cid) -> Result<Vec<PeerId>, ProducersError>;
}

/// A fixed producer list used for every round.
#[derive(Debug, Clone, Default)]
pub struct StaticProducersProvider {
    producers: Vec<PeerId>,
}

impl StaticProducersProvider {
    /// Use `producers`, in rank order, for every round.
    pub fn new(producers: Vec<PeerId>) -> Self {
        Self { producers }
    }
}

impl ProducersProvider for StaticProducersProvider {
    fn get_producers(&self, _previous_delta_hash: &Cid) -> Result<Vec<PeerId>, ProducersError> {
        Ok(self.producers.clone())
    }
}
