//! Collaborator traits for the delta consensus engine.
//!
//! Each trait models one external service the engine calls. Implementations
//! are swapped in at wiring time; tests use small hand-written mocks.

mod clock;
mod crypto;
mod mempool;
mod producers;
mod storage;
mod transport;

pub use clock::*;
pub use crypto::*;
pub use mempool::*;
pub use producers::*;
pub use storage::*;
pub use transport::*;
