//! # Delta Core Types
//!
//! Type definitions shared by every crate of the delta consensus engine.
//!
//! - [`Cid`] and [`ContentHash`] - content identifiers and the digests behind them
//! - [`PeerId`] - producer and voter identities
//! - [`PublicEntry`] and [`CoinbaseEntry`] - the entries a Delta carries
//! - [`Delta`] - the unit of ledger progress
//! - [`CandidateDeltaBroadcast`] and [`FavouriteDeltaBroadcast`] - round messages
//!
//! ## Example
//!
//! ```rust
//! use deltacore_types::{Address, ContentHash, Delta, PublicEntry};
//!
//! let entry = PublicEntry::transfer(Address::ZERO, Address::new([1; 20]), 10)
//!     .with_gas(2, 21_000);
//! assert_eq!(entry.fee(), 42_000);
//!
//! let genesis = Delta::genesis();
//! assert!(!genesis.is_structurally_valid());
//! assert_ne!(ContentHash::keccak256(&genesis.to_rlp()), ContentHash::NIL);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod address;
pub mod broadcast;
pub mod delta;
pub mod entry;
pub mod hash;
pub mod peer;

pub use address::Address;
pub use broadcast::{
    CandidateDeltaBroadcast, ConsensusMessage, DeltaDfsHashBroadcast, FavouriteDeltaBroadcast,
    FavouriteKey,
};
pub use delta::Delta;
pub use entry::{CoinbaseEntry, EntryKind, PublicEntry, Signature};
pub use hash::{Cid, ContentHash, HASH_SIZE};
pub use peer::PeerId;

/// Result type alias for type operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with engine types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size type
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid address format
    #[error("invalid address format: {0}")]
    InvalidAddress(String),

    /// Invalid hash format
    #[error("invalid hash format: {0}")]
    InvalidHash(String),

    /// Invalid content identifier
    #[error("invalid cid: {0}")]
    InvalidCid(String),

    /// Invalid Delta bytes
    #[error("invalid delta: {0}")]
    InvalidDelta(String),

    /// RLP decoding error
    #[error("RLP decode error: {0}")]
    RlpDecode(#[from] rlp::DecoderError),
}
