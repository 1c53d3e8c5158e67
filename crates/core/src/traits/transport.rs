//! Outbound gossip.

use deltacore_types::ConsensusMessage;

/// Network broadcast sink.
///
/// Fire-and-forget: the engine assumes nothing about delivery.
pub trait BroadcastSink: Send + Sync {
    /// Hand a message to the network layer.
    fn broadcast(&self, message: ConsensusMessage);
}
