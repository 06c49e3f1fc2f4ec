//! Daily keyword sampling
//!
//! The same seed key always yields the same sample, so re-running on the same
//! day searches the same keywords; a new day reshuffles.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

/// Seed derived from the first 8 bytes of SHA-256 of `key`.
pub fn seed_for(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Shuffle a copy of `pool` with a `seed_key`-seeded RNG and keep the first `n`.
pub fn select(pool: &[String], n: usize, seed_key: &str) -> Vec<String> {
    let mut shuffled = pool.to_vec();
    let mut rng = StdRng::seed_from_u64(seed_for(seed_key));
    shuffled.shuffle(&mut rng);
    shuffled.truncate(n.min(pool.len()));
    shuffled
}
