//! The Delta: the unit of ledger progress.
//!
//! A Delta references its predecessor by [`Cid`], carries the ordered entries it
//! admits and the coinbase reward of its producer. Its canonical byte form is
//! the RLP encoding produced by [`Delta::to_rlp`], which is what the DFS stores.

use crate::{Cid, CoinbaseEntry, ContentHash, Error, PublicEntry, Result};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

/// A candidate or confirmed Delta.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Delta {
    /// DFS address of the Delta this one follows
    pub previous_delta_dfs_hash: Cid,
    /// Digest over the admitted content; equals the candidate hash
    pub merkle_root: ContentHash,
    /// Post-execution state digest
    pub state_root: ContentHash,
    /// Creation time, unix milliseconds
    pub timestamp: u64,
    /// Admitted entries, in shuffle order
    pub public_entries: Vec<PublicEntry>,
    /// Producer rewards
    pub coinbase_entries: Vec<CoinbaseEntry>,
}

impl Delta {
    /// The genesis Delta: empty content at the unix epoch.
    pub fn genesis() -> Self {
        Self::default()
    }

    /// A Delta is usable only when it names its predecessor and its content root.
    ///
    /// Anything read from the DFS that fails this check is treated as absent.
    pub fn is_structurally_valid(&self) -> bool {
        !self.previous_delta_dfs_hash.is_nil() && !self.merkle_root.is_nil()
    }

    /// Entries that call or deploy a contract.
    pub fn contract_entries(&self) -> impl Iterator<Item = &PublicEntry> {
        self.public_entries.iter().filter(|e| e.kind().is_contract())
    }

    /// Total fees of all admitted entries.
    pub fn total_fees(&self) -> u128 {
        self.public_entries
            .iter()
            .fold(0u128, |acc, e| acc.saturating_add(e.fee()))
    }

    /// Canonical byte form.
    pub fn to_rlp(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decodes the canonical byte form.
    pub fn from_rlp(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::InvalidDelta("empty delta data".into()));
        }
        rlp::decode(data).map_err(Error::RlpDecode)
    }
}

impl Encodable for Delta {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(6);
        s.append(&self.previous_delta_dfs_hash);
        s.append(&self.merkle_root);
        s.append(&self.state_root);
        s.append(&self.timestamp);

        s.begin_list(self.public_entries.len());
        for entry in &self.public_entries {
            s.append(entry);
        }

        s.begin_list(self.coinbase_entries.len());
        for entry in &self.coinbase_entries {
            s.append(entry);
        }
    }
}

impl Decodable for Delta {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 6 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            previous_delta_dfs_hash: rlp.val_at(0)?,
            merkle_root: rlp.val_at(1)?,
            state_root: rlp.val_at(2)?,
            timestamp: rlp.val_at(3)?,
            public_entries: rlp.list_at(4)?,
            coinbase_entries: rlp.list_at(5)?,
        })
    }
}
