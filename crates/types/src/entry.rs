//! Ledger entries carried by a Delta.
//!
//! - [`PublicEntry`] - a signed transfer, contract call or contract deployment
//! - [`CoinbaseEntry`] - the producer reward appended to every candidate
//! - [`Signature`] - opaque signature bytes of an entry
//! - [`EntryKind`] - classification of a public entry by its shape

use crate::{Address, Error, Result};
use bytes::Bytes;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque signature bytes of an entry.
///
/// Signatures are not verified by the consensus engine; they only take part in
/// ordering and in the candidate content hash.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Signature(Bytes);

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes of the signature.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{})", hex::encode(&self.0))
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// What a public entry does, derived from which of receiver and data are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Value transfer: receiver set, no data
    Transfer,
    /// Contract call: receiver set, data present
    ContractCall,
    /// Contract deployment: no receiver, init code present
    ContractDeployment,
    /// Neither receiver nor data; never admitted into a Delta
    Invalid,
}

impl EntryKind {
    /// Whether entries of this kind may be included in a Delta.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Whether this kind touches a contract.
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::ContractCall | Self::ContractDeployment)
    }
}

/// A signed public ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicEntry {
    /// Sender nonce
    pub nonce: u64,
    /// Sending account
    pub sender: Address,
    /// Receiving account, `None` for a deployment
    pub receiver: Option<Address>,
    /// Value transferred
    pub amount: u128,
    /// Call data or init code
    pub data: Bytes,
    /// Price paid per unit of gas
    pub gas_price: u128,
    /// Gas the entry may consume
    pub gas_limit: u64,
    /// Submission time, unix milliseconds
    pub timestamp: u64,
    /// Sender signature over the entry
    pub signature: Signature,
}

impl Default for PublicEntry {
    fn default() -> Self {
        Self {
            nonce: 0,
            sender: Address::ZERO,
            receiver: None,
            amount: 0,
            data: Bytes::new(),
            gas_price: 0,
            gas_limit: 21_000,
            timestamp: 0,
            signature: Signature::default(),
        }
    }
}

impl PublicEntry {
    /// Creates a plain value transfer.
    pub fn transfer(sender: Address, receiver: Address, amount: u128) -> Self {
        Self {
            sender,
            receiver: Some(receiver),
            amount,
            ..Self::default()
        }
    }

    /// Creates a contract deployment.
    pub fn deploy(sender: Address, init_code: impl Into<Bytes>) -> Self {
        Self {
            sender,
            data: init_code.into(),
            ..Self::default()
        }
    }

    /// Sets the gas price and gas limit.
    pub fn with_gas(mut self, gas_price: u128, gas_limit: u64) -> Self {
        self.gas_price = gas_price;
        self.gas_limit = gas_limit;
        self
    }

    /// Sets the call data.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Sets the submission timestamp.
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the signature.
    pub fn with_signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.signature = Signature::from_bytes(signature);
        self
    }

    /// Classifies the entry.
    pub fn kind(&self) -> EntryKind {
        match (self.receiver.is_some(), self.data.is_empty()) {
            (true, true) => EntryKind::Transfer,
            (true, false) => EntryKind::ContractCall,
            (false, false) => EntryKind::ContractDeployment,
            (false, true) => EntryKind::Invalid,
        }
    }

    /// Maximum fee the entry pays: `gas_price * gas_limit`.
    pub fn fee(&self) -> u128 {
        self.gas_price.saturating_mul(self.gas_limit as u128)
    }

    /// Canonical byte form.
    pub fn to_rlp(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decodes the canonical byte form.
    pub fn from_rlp(data: &[u8]) -> Result<Self> {
        rlp::decode(data).map_err(Error::RlpDecode)
    }
}

impl Encodable for PublicEntry {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(9);
        s.append(&self.nonce);
        s.append(&self.sender);
        match &self.receiver {
            Some(addr) => s.append(addr),
            None => s.append(&""),
        };
        s.append(&self.amount);
        s.append(&self.data.as_ref());
        s.append(&self.gas_price);
        s.append(&self.gas_limit);
        s.append(&self.timestamp);
        s.append(&self.signature.as_bytes());
    }
}

impl Decodable for PublicEntry {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 9 {
            return Err(DecoderError::RlpIncorrectListLen);
        }

        let receiver_bytes: Vec<u8> = rlp.val_at(2)?;
        let receiver = if receiver_bytes.is_empty() {
            None
        } else {
            Some(Address::from_slice(&receiver_bytes).map_err(|_| DecoderError::RlpInvalidLength)?)
        };
        let data: Vec<u8> = rlp.val_at(4)?;
        let signature: Vec<u8> = rlp.val_at(8)?;

        Ok(Self {
            nonce: rlp.val_at(0)?,
            sender: rlp.val_at(1)?,
            receiver,
            amount: rlp.val_at(3)?,
            data: Bytes::from(data),
            gas_price: rlp.val_at(5)?,
            gas_limit: rlp.val_at(6)?,
            timestamp: rlp.val_at(7)?,
            signature: Signature::from_bytes(signature),
        })
    }
}

/// Reward paid to the producer of a Delta.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CoinbaseEntry {
    /// Sum of the fees of every included entry
    pub amount: u128,
    /// Producer public key receiving the reward
    pub receiver_public_key: Bytes,
}

impl CoinbaseEntry {
    /// Canonical byte form.
    pub fn to_rlp(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }
}

impl Encodable for CoinbaseEntry {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.amount);
        s.append(&self.receiver_public_key.as_ref());
    }
}

impl Decodable for CoinbaseEntry {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let key: Vec<u8> = rlp.val_at(1)?;
        Ok(Self {
            amount: rlp.val_at(0)?,
            receiver_public_key: Bytes::from(key),
        })
    }
}
