//! 32-byte content digests and the content identifiers derived from them.
//!
//! [`ContentHash`] is the raw digest produced by a hash provider. [`Cid`] is the
//! identifier every component uses to refer to a Delta: candidate hashes, cache
//! keys and chain-head entries are all `Cid`s.
//!
//! Both types order by unsigned lexicographic byte comparison, which is the
//! ordering used for shuffling and for every tie-break in the engine.

use crate::{Error, Result};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Size of a digest in bytes
pub const HASH_SIZE: usize = 32;

/// Multibase prefix for lowercase base16.
const CID_MULTIBASE_PREFIX: char = 'f';

/// A 32-byte content digest.
///
/// # Example
///
/// ```rust
/// use deltacore_types::ContentHash;
///
/// let hash = ContentHash::keccak256(b"hello world");
/// assert!(!hash.is_nil());
/// assert_eq!(hash.to_cid().hash(), &hash);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentHash([u8; HASH_SIZE]);

impl ContentHash {
    /// The nil digest (all zeros), used for "no hash".
    pub const NIL: Self = Self([0u8; HASH_SIZE]);

    /// Creates a digest from a 32-byte array.
    #[inline]
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a digest from a slice.
    ///
    /// Returns an error if the slice length is not exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != HASH_SIZE {
            return Err(Error::InvalidLength {
                expected: HASH_SIZE,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Computes the Keccak256 digest of the given data.
    pub fn keccak256(data: &[u8]) -> Self {
        Self::keccak256_concat(&[data])
    }

    /// Computes the Keccak256 digest of several slices as if they were concatenated.
    pub fn keccak256_concat(data: &[&[u8]]) -> Self {
        let mut hasher = Keccak256::new();
        for slice in data {
            hasher.update(slice);
        }
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Returns the digest as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the digest as a fixed-size byte array.
    #[inline]
    pub const fn as_fixed_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Checks if this is the nil digest.
    #[inline]
    pub fn is_nil(&self) -> bool {
        self == &Self::NIL
    }

    /// Wraps this digest into a content identifier.
    #[inline]
    pub const fn to_cid(self) -> Cid {
        Cid(self)
    }

    /// Parses a digest from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != HASH_SIZE * 2 {
            return Err(Error::InvalidHash(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }

    /// Returns the hex representation with 0x prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short form for log fields: the first 8 bytes in hex.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<[u8; HASH_SIZE]> for ContentHash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Encodable for ContentHash {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.encoder().encode_value(&self.0);
    }
}

impl Decodable for ContentHash {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        rlp.decoder().decode_value(|bytes| {
            if bytes.len() != HASH_SIZE {
                return Err(DecoderError::RlpInvalidLength);
            }
            let mut arr = [0u8; HASH_SIZE];
            arr.copy_from_slice(bytes);
            Ok(Self(arr))
        })
    }
}

/// A content identifier: the single identity of a Delta across the engine.
///
/// Rendered as multibase base16 (`f` followed by lowercase hex).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cid(ContentHash);

impl Cid {
    /// The empty identifier.
    pub const NIL: Self = Self(ContentHash::NIL);

    /// Returns the digest this identifier wraps.
    #[inline]
    pub const fn hash(&self) -> &ContentHash {
        &self.0
    }

    /// Returns the identifier bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Creates an identifier from raw digest bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        ContentHash::from_slice(slice).map(Self)
    }

    /// Checks if this is the empty identifier.
    #[inline]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Short form for log fields.
    pub fn short(&self) -> String {
        self.0.short()
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CID_MULTIBASE_PREFIX, hex::encode(self.0.as_bytes()))
    }
}

impl FromStr for Cid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix(CID_MULTIBASE_PREFIX)
            .ok_or_else(|| Error::InvalidCid(format!("missing multibase prefix in {s:?}")))?;
        ContentHash::from_hex(body).map(Self)
    }
}

impl From<ContentHash> for Cid {
    fn from(hash: ContentHash) -> Self {
        Self(hash)
    }
}

impl AsRef<[u8]> for Cid {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Serialize for Cid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Encodable for Cid {
    fn rlp_append(&self, s: &mut RlpStream) {
        self.0.rlp_append(s);
    }
}

impl Decodable for Cid {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        ContentHash::decode(rlp).map(Self)
    }
}
