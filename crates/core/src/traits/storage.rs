//! Content-addressed distributed file store (DFS) traits.
//!
//! Confirmed Deltas are persisted only through the DFS. The engine reads from
//! it on cache misses and writes to it from the hub's publish path.

use async_trait::async_trait;
use bytes::Bytes;
use deltacore_types::{Cid, Delta};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Errors that can occur during DFS operations.
#[derive(Error, Debug, Clone)]
pub enum DfsError {
    /// No content is stored under the address.
    #[error("content not found: {0}")]
    NotFound(Cid),

    /// The store could not be reached or refused the request.
    #[error("dfs unavailable: {0}")]
    Unavailable(String),

    /// An I/O error occurred while transferring content.
    #[error("dfs I/O error: {0}")]
    Io(String),

    /// The caller cancelled the operation.
    #[error("dfs operation cancelled")]
    Cancelled,
}

/// Result type for DFS operations.
pub type DfsResult<T> = Result<T, DfsError>;

/// Read access to the DFS.
#[async_trait]
pub trait DfsReader: Send + Sync {
    /// Fetch the raw content stored under `cid`.
    async fn read(&self, cid: &Cid) -> DfsResult<Bytes>;

    /// Fetch and decode a Delta.
    ///
    /// Returns `None` when the content is missing, cannot be decoded, or fails
    /// structural validation.
    async fn try_read_delta(&self, cid: &Cid) -> Option<Delta> {
        let content = match self.read(cid).await {
            Ok(content) => content,
            Err(e) => {
                debug!(cid = %cid, error = %e, "DFS read failed");
                return None;
            }
        };

        match Delta::from_rlp(&content) {
            Ok(delta) if delta.is_structurally_valid() => Some(delta),
            Ok(_) => {
                debug!(cid = %cid, "DFS content is not a valid delta");
                None
            }
            Err(e) => {
                debug!(cid = %cid, error = %e, "Failed to decode delta from DFS");
                None
            }
        }
    }
}

/// Write access to the DFS.
#[async_trait]
pub trait DfsWriter: Send + Sync {
    /// Store `content` under a human-readable `name` and return its address.
    ///
    /// Implementations should observe `cancel` and return
    /// [`DfsError::Cancelled`] when it fires.
    async fn add(&self, content: Bytes, name: &str, cancel: &CancellationToken) -> DfsResult<Cid>;
}
