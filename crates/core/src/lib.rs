//! # Delta Core - Collaborator Abstractions
//!
//! The consensus engine talks to the rest of the node only through the traits
//! defined here:
//!
//! - **Crypto**: [`HashProvider`] and [`DeterministicRandomFactory`]
//! - **Storage**: [`DfsReader`] and [`DfsWriter`] for the content-addressed store
//! - **Transport**: [`BroadcastSink`] for fire-and-forget gossip
//! - **Producers**: [`ProducersProvider`] for the ranked producer set of a round
//! - **Mempool**: [`MempoolReader`] for pending entries
//! - **Time**: [`Clock`]
//!
//! All traits require `Send + Sync`; components hold them as `Arc<dyn Trait>`.
//!
//! # Default implementations
//!
//! | Trait | Default Impl |
//! |-------|--------------|
//! | `HashProvider` | [`KeccakHashProvider`] |
//! | `DeterministicRandomFactory` | [`ChaChaRandomFactory`] |
//! | `Clock` | [`SystemClock`] |
//! | `StateRootSource` | [`NilStateRoot`] |

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod traits;

pub use traits::{
    // Crypto
    ChaChaPrng, ChaChaRandomFactory, DeterministicRandomFactory, HashProvider,
    KeccakHashProvider, Prng,
    // Storage
    DfsError, DfsReader, DfsResult, DfsWriter,
    // Transport
    BroadcastSink,
    // Producers
    ProducersError, ProducersProvider, StaticProducersProvider,
    // Mempool and state
    MempoolReader, NilStateRoot, StateRootSource,
    // Time
    Clock, ManualClock, SystemClock,
};
