//! # Delta Core Mempool
//!
//! Pending entries waiting to be included in a Delta.
//!
//! - [`Mempool`] - a thread-safe in-memory pool implementing
//!   [`MempoolReader`](deltacore_core::MempoolReader)
//! - [`TransactionRetriever`] - reads any pool and returns its entries in
//!   priority order for the delta builder
//!
//! ## Priority
//!
//! Entries are ordered by:
//! 1. Gas price (descending)
//! 2. Timestamp (ascending - first come first served for the same price)
//! 3. Signature bytes (ascending, unsigned) for a deterministic total order
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use deltacore_mempool::{Mempool, MempoolConfig, TransactionRetriever};
//! use deltacore_types::{Address, PublicEntry};
//!
//! let pool = Arc::new(Mempool::new(MempoolConfig::default()));
//! pool.add_entry(PublicEntry::transfer(Address::ZERO, Address::new([1; 20]), 1).with_gas(5, 21_000))
//!     .unwrap();
//!
//! let retriever = TransactionRetriever::new(pool);
//! assert_eq!(retriever.get_by_priority(None).unwrap().len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod pool;
pub mod retriever;

pub use pool::{EntryId, Mempool, MempoolConfig, MempoolStats};
pub use retriever::{PriorityKey, TransactionRetriever};

/// Result type alias for mempool operations
pub type Result<T> = std::result::Result<T, MempoolError>;

/// Errors that can occur in mempool operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MempoolError {
    /// Entry already exists in the pool
    #[error("entry already exists in pool")]
    AlreadyExists,

    /// Pool is at capacity and cannot accept more entries
    #[error("mempool is full")]
    PoolFull,

    /// A retrieval asked for zero entries
    #[error("max count must be positive, got {0}")]
    InvalidMaxCount(usize),
}
