//! Deterministic key hashing.
//!
//! # Responsibilities
//! - Map a request key to an ordinal in [0, domain_size)
//! - Identical (key, domain_size) always yields the identical ordinal
//!
//! # Design Decisions
//! - FNV-1a 64-bit with the published offset basis and prime
//! - No runtime seed: independent worker shards agree on every selection
//!   without coordinating, across restarts of the same build
//! - The algorithm is part of the deployment contract; changing it reshuffles
//!   every key's candidate sequence and must be treated as a topology change

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a 64-bit hash of the key bytes.
pub fn hash_key(key: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Reduce a key to an index in `[0, domain_size)`.
///
/// `domain_size` must be non-zero; empty pools are rejected at config load.
pub fn hash_to_index(key: &str, domain_size: usize) -> usize {
    debug_assert!(domain_size > 0);
    (hash_key(key) % domain_size as u64) as usize
}
