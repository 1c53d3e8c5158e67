//! Hashing and deterministic randomness.
//!
//! Every honest producer must derive the same shuffle for the same previous
//! Delta, so both the content hash and the seeded generator are pure functions
//! of their input.

use deltacore_types::ContentHash;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

/// Domain separator mixed into generator seeds.
const SEED_DOMAIN: &[u8] = b"DELTA_SHUFFLE_SEED";

/// Computes content hashes over byte sequences.
pub trait HashProvider: Send + Sync {
    /// Compute the digest of `data`.
    fn compute(&self, data: &[u8]) -> ContentHash;

    /// Compute the digest of several slices as if they were concatenated.
    fn compute_concat(&self, parts: &[&[u8]]) -> ContentHash {
        self.compute(&parts.concat())
    }
}

/// Keccak-256 content hashing.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakHashProvider;

impl HashProvider for KeccakHashProvider {
    fn compute(&self, data: &[u8]) -> ContentHash {
        ContentHash::keccak256(data)
    }

    fn compute_concat(&self, parts: &[&[u8]]) -> ContentHash {
        ContentHash::keccak256_concat(parts)
    }
}

/// A reproducible pseudo-random generator.
pub trait Prng: Send {
    /// Draw the next signed 32-bit integer.
    fn next_int(&mut self) -> i32;
}

/// Builds reproducible generators from seed bytes.
pub trait DeterministicRandomFactory: Send + Sync {
    /// Same seed, same sequence, on every node.
    fn from_seed(&self, seed: &[u8]) -> Box<dyn Prng>;
}

/// ChaCha20 generator.
pub struct ChaChaPrng(ChaCha20Rng);

impl Prng for ChaChaPrng {
    fn next_int(&mut self) -> i32 {
        self.0.gen()
    }
}

/// Seeds ChaCha20 with `sha256(domain || seed)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaChaRandomFactory;

impl ChaChaRandomFactory {
    /// Build the concrete generator for a seed.
    pub fn generator(seed: &[u8]) -> ChaChaPrng {
        let mut hasher = Sha256::new();
        hasher.update(SEED_DOMAIN);
        hasher.update(seed);

        let mut rng_seed = [0u8; 32];
        rng_seed.copy_from_slice(&hasher.finalize());
        ChaChaPrng(ChaCha20Rng::from_seed(rng_seed))
    }
}

impl DeterministicRandomFactory for ChaChaRandomFactory {
    fn from_seed(&self, seed: &[u8]) -> Box<dyn Prng> {
        Box::new(Self::generator(seed))
    }
}
