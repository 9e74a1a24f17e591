//! Persisted schema identifier
//!
//! The structural parameters that determine index compatibility. Stores and
//! fingerprint files stamp this identifier and must refuse data produced
//! under a different one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::FingerprintConfig;

/// Schema format version. Bumped on any change that alters fingerprint or
/// hash-key layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Structural parameter tuple identifying an index schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaId {
    pub version: u32,
    pub rows: usize,
    pub cols: usize,
    /// Bits per serialized fingerprint (`2 * rows * cols`).
    pub signature_bits: usize,
    pub hash_tables: usize,
    pub keys_per_table: usize,
    pub permutation_seed: u64,
    pub top_wavelets: usize,
}

impl SchemaId {
    pub fn from_config(config: &FingerprintConfig) -> Self {
        Self {
            version: SCHEMA_VERSION,
            rows: config.rows,
            cols: config.cols,
            signature_bits: config.signature_bits(),
            hash_tables: config.hash_tables,
            keys_per_table: config.keys_per_table,
            permutation_seed: config.permutation_seed,
            top_wavelets: config.top_wavelets,
        }
    }

    /// Canonical string form, e.g. `wfp1:r128c32:n8192:l25:k4:s42:t200`.
    pub fn encode(&self) -> String {
        format!(
            "wfp{}:r{}c{}:n{}:l{}:k{}:s{}:t{}",
            self.version,
            self.rows,
            self.cols,
            self.signature_bits,
            self.hash_tables,
            self.keys_per_table,
            self.permutation_seed,
            self.top_wavelets
        )
    }

    /// Whether data stamped `persisted` can be read under this schema.
    pub fn accepts(&self, persisted: &str) -> bool {
        self.encode() == persisted
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_schema_string() {
        let schema = SchemaId::from_config(&FingerprintConfig::default());
        assert_eq!(schema.encode(), "wfp1:r128c32:n8192:l25:k4:s42:t200");
    }

    #[test]
    fn changed_seed_changes_schema() {
        let base = FingerprintConfig::default();
        let mut reseeded = base.clone();
        reseeded.permutation_seed = 7;
        let a = SchemaId::from_config(&base);
        let b = SchemaId::from_config(&reseeded);
        assert_ne!(a.encode(), b.encode());
        assert!(!a.accepts(&b.encode()));
        assert!(a.accepts(&a.encode()));
    }
}
