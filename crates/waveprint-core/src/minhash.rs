//! Min-hash / LSH encoding of serialized fingerprints
//!
//! Each fingerprint is reduced to `L` 32-bit hash keys. A key packs `K`
//! min-hash values, each computed under its own fixed permutation of the
//! fingerprint's bit positions. The permutations are generated once from a
//! seed and are part of the persisted schema: changing them invalidates
//! every indexed fingerprint.

use std::sync::{Arc, OnceLock};

use crate::config::FingerprintConfig;
use crate::rng::SplitMix64;

/// Frozen default seed of the permutation table.
pub const DEFAULT_PERMUTATION_SEED: u64 = 42;

/// Min-hash values clamp to one byte on key packing; colliding clamped
/// values are acceptable because verification recomputes exact Hamming
/// similarity.
const MAX_PACKED_VALUE: usize = 0xFF;

/// Immutable table of `L * K` permutations of `[0, bits)`.
#[derive(Debug)]
pub struct PermutationTable {
    seed: u64,
    bits: usize,
    perms: Vec<Vec<u32>>,
}

impl PermutationTable {
    /// Generate `count` permutations of `[0, bits)` from `seed` via
    /// Fisher-Yates over a SplitMix64 stream.
    pub fn generate(seed: u64, bits: usize, count: usize) -> Self {
        let mut rng = SplitMix64::new(seed);
        let mut perms = Vec::with_capacity(count);
        for _ in 0..count {
            let mut perm: Vec<u32> = (0..bits as u32).collect();
            for i in (1..perm.len()).rev() {
                let j = rng.next_below(i as u64 + 1) as usize;
                perm.swap(i, j);
            }
            perms.push(perm);
        }
        Self { seed, bits, perms }
    }

    /// Table matching a configuration. The default geometry reuses a
    /// process-wide table initialized on first use.
    pub fn for_config(config: &FingerprintConfig) -> Arc<Self> {
        let bits = config.signature_bits();
        let count = config.hash_tables * config.keys_per_table;
        let shared = default_table();
        if shared.matches(config.permutation_seed, bits, count) {
            return shared;
        }
        Arc::new(Self::generate(config.permutation_seed, bits, count))
    }

    pub fn matches(&self, seed: u64, bits: usize, count: usize) -> bool {
        self.seed == seed && self.bits == bits && self.perms.len() == count
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fingerprint bit-length the table permutes.
    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn permutation_count(&self) -> usize {
        self.perms.len()
    }

    fn permutation(&self, index: usize) -> &[u32] {
        &self.perms[index]
    }
}

fn default_table() -> Arc<PermutationTable> {
    static TABLE: OnceLock<Arc<PermutationTable>> = OnceLock::new();
    TABLE
        .get_or_init(|| {
            let config = FingerprintConfig::default();
            Arc::new(PermutationTable::generate(
                DEFAULT_PERMUTATION_SEED,
                config.signature_bits(),
                config.hash_tables * config.keys_per_table,
            ))
        })
        .clone()
}

/// Compute the `L` hash keys of a serialized fingerprint.
///
/// Permutation `t * K + k` feeds byte `k` of key `t`; bytes concatenate
/// little-endian into the 32-bit key.
pub fn hash_signature(
    bits: &[u8],
    table: &PermutationTable,
    hash_tables: usize,
    keys_per_table: usize,
) -> Vec<u32> {
    debug_assert_eq!(table.permutation_count(), hash_tables * keys_per_table);
    let mut keys = Vec::with_capacity(hash_tables);
    for t in 0..hash_tables {
        let mut key = 0u32;
        for k in 0..keys_per_table {
            let perm = table.permutation(t * keys_per_table + k);
            let value = min_hash(bits, perm).min(MAX_PACKED_VALUE) as u32;
            key |= value << (8 * k);
        }
        keys.push(key);
    }
    keys
}

/// Smallest `i` such that bit `perm[i]` is set; the sentinel `perm.len()`
/// (the fingerprint bit-length) when no bit is set.
fn min_hash(bits: &[u8], perm: &[u32]) -> usize {
    for (i, &p) in perm.iter().enumerate() {
        let p = p as usize;
        if bits[p / 8] & (1 << (p % 8)) != 0 {
            return i;
        }
    }
    perm.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutations_are_reproducible() {
        let a = PermutationTable::generate(42, 128, 4);
        let b = PermutationTable::generate(42, 128, 4);
        for i in 0..4 {
            assert_eq!(a.permutation(i), b.permutation(i));
        }
        let c = PermutationTable::generate(43, 128, 4);
        assert_ne!(a.permutation(0), c.permutation(0));
    }

    #[test]
    fn permutations_are_valid() {
        let table = PermutationTable::generate(7, 256, 2);
        for i in 0..2 {
            let mut seen = vec![false; 256];
            for &p in table.permutation(i) {
                assert!(!seen[p as usize], "duplicate index {}", p);
                seen[p as usize] = true;
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    fn empty_fingerprint_packs_sentinel_bytes() {
        let config = FingerprintConfig::default();
        let table = PermutationTable::for_config(&config);
        let bits = vec![0u8; config.signature_bytes()];
        let keys = hash_signature(&bits, &table, config.hash_tables, config.keys_per_table);
        assert_eq!(keys.len(), 25);
        // Sentinel 8192 clamps to 255 in every byte.
        assert!(keys.iter().all(|&k| k == 0xFFFF_FFFF));
    }

    #[test]
    fn keys_are_determined_by_bits_and_permutations() {
        let config = FingerprintConfig::default();
        let table = PermutationTable::for_config(&config);
        let mut bits = vec![0u8; config.signature_bytes()];
        for i in (0..bits.len()).step_by(7) {
            bits[i] = 0b1010_0010;
        }
        let a = hash_signature(&bits, &table, config.hash_tables, config.keys_per_table);
        let b = hash_signature(&bits, &table, config.hash_tables, config.keys_per_table);
        assert_eq!(a, b);

        let other = PermutationTable::generate(1234, config.signature_bits(), 100);
        let c = hash_signature(&bits, &other, config.hash_tables, config.keys_per_table);
        assert_ne!(a, c);
    }

    #[test]
    fn key_packing_is_little_endian_bytes() {
        // One permutation per byte over a tiny 16-bit space.
        let table = PermutationTable::generate(5, 16, 4);
        let bits = vec![0xFFu8, 0xFF];
        let keys = hash_signature(&bits, &table, 1, 4);
        // Every bit is set, so every min-hash is 0 and the key is 0.
        assert_eq!(keys, vec![0]);

        let empty = vec![0u8, 0];
        let keys = hash_signature(&empty, &table, 1, 4);
        // Sentinel 16 fits in a byte unclamped.
        assert_eq!(keys, vec![0x1010_1010]);
    }

    #[test]
    fn default_table_is_shared_and_stable() {
        let config = FingerprintConfig::default();
        let a = PermutationTable::for_config(&config);
        let b = PermutationTable::for_config(&config);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.seed(), DEFAULT_PERMUTATION_SEED);
        assert_eq!(a.bits(), 8192);
        assert_eq!(a.permutation_count(), 100);
    }

    #[test]
    fn single_set_bit_yields_its_permuted_position() {
        let table = PermutationTable::generate(11, 64, 1);
        let perm = table.permutation(0);
        // Set only the bit that permutation index 3 points at.
        let target = perm[3] as usize;
        let mut bits = vec![0u8; 8];
        bits[target / 8] |= 1 << (target % 8);
        assert_eq!(min_hash(&bits, perm), 3);
    }
}
