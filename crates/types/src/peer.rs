//! Peer identities.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a peer on the network: its public key bytes.
///
/// Producers, voters and the local node are all identified by `PeerId`.
/// The coinbase reward of a Delta is paid to the producer's public key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PeerId(Bytes);

impl PeerId {
    /// Create a peer ID from raw public key bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw public key bytes.
    pub fn public_key(&self) -> &[u8] {
        &self.0
    }

    /// Owned copy of the public key bytes.
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    /// True when no key material is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Base58 rendering of the public key.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.to_base58())
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
