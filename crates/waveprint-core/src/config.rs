//! Configuration parameters for the fingerprinting engine
//!
//! Defaults reproduce the canonical geometry: 5512 Hz mono, 2048-sample
//! frames hopped every 64 samples, 128x32 images over 32 logarithmic bands
//! between 318 and 2000 Hz, 200 retained wavelets, 25 hash tables of 4
//! min-hash bytes each.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::stride::Stride;

/// Fingerprint generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Canonical sample rate fingerprints are computed at.
    pub sample_rate: u32,
    /// Samples per analysis frame.
    pub frame_size: usize,
    /// Hop between consecutive frames, in samples.
    pub overlap: usize,
    /// Reduced frames per fingerprint image.
    pub rows: usize,
    /// Logarithmic frequency bands per reduced frame.
    pub cols: usize,
    /// Wavelet coefficients retained per image.
    pub top_wavelets: usize,
    /// Number of LSH hash tables (`L`).
    pub hash_tables: usize,
    /// Min-hash values packed into each table key (`K`, one byte each).
    pub keys_per_table: usize,
    /// Lower bound of the retained frequency range, Hz.
    pub min_freq: f32,
    /// Upper bound of the retained frequency range, Hz.
    pub max_freq: f32,
    /// Seed of the permutation table. Part of the persisted schema.
    pub permutation_seed: u64,
    /// Window placement strategy.
    pub stride: Stride,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            sample_rate: 5512,
            frame_size: 2048,
            overlap: 64,
            rows: 128,
            cols: 32,
            top_wavelets: 200,
            hash_tables: 25,
            keys_per_table: 4,
            min_freq: 318.0,
            max_freq: 2000.0,
            permutation_seed: 42,
            stride: Stride::default_ingest(),
        }
    }
}

impl FingerprintConfig {
    /// Bits per serialized fingerprint: two per image cell.
    pub fn signature_bits(&self) -> usize {
        2 * self.rows * self.cols
    }

    /// Bytes per serialized fingerprint.
    pub fn signature_bytes(&self) -> usize {
        self.signature_bits() / 8
    }

    /// Minimum sample count that yields one fingerprint image.
    pub fn min_samples_per_image(&self) -> usize {
        (self.rows - 1) * self.overlap + self.frame_size
    }

    /// Validate structural consistency. Rejected configurations are fatal at
    /// command build time.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sample_rate == 0 {
            return Err(EngineError::invalid_config("sample_rate must be > 0"));
        }
        if self.frame_size == 0 || !self.frame_size.is_power_of_two() {
            return Err(EngineError::invalid_config(format!(
                "frame_size must be a power of two, got {}",
                self.frame_size
            )));
        }
        if self.overlap == 0 || self.overlap > self.frame_size {
            return Err(EngineError::invalid_config(format!(
                "overlap must be in [1, frame_size], got {}",
                self.overlap
            )));
        }
        if self.rows < 2 || !self.rows.is_power_of_two() {
            return Err(EngineError::invalid_config(format!(
                "rows must be a power of two >= 2, got {}",
                self.rows
            )));
        }
        if self.cols < 2 || !self.cols.is_power_of_two() {
            return Err(EngineError::invalid_config(format!(
                "cols must be a power of two >= 2, got {}",
                self.cols
            )));
        }
        if self.top_wavelets == 0 || self.top_wavelets > self.rows * self.cols {
            return Err(EngineError::invalid_config(format!(
                "top_wavelets must be in [1, rows*cols], got {}",
                self.top_wavelets
            )));
        }
        if self.hash_tables == 0 {
            return Err(EngineError::invalid_config("hash_tables must be > 0"));
        }
        if self.keys_per_table == 0 || self.keys_per_table > 4 {
            return Err(EngineError::invalid_config(format!(
                "keys_per_table must be in [1, 4] to pack into a 32-bit key, got {}",
                self.keys_per_table
            )));
        }
        if 8 * self.hash_tables * self.keys_per_table > self.signature_bits() {
            return Err(EngineError::invalid_config(
                "hash tables oversubscribe fingerprint entropy (8*L*K > 2*rows*cols)",
            ));
        }
        if self.min_freq <= 0.0 || self.min_freq >= self.max_freq {
            return Err(EngineError::invalid_config(format!(
                "frequency range [{}, {}] is empty",
                self.min_freq, self.max_freq
            )));
        }
        if self.max_freq > self.sample_rate as f32 / 2.0 {
            return Err(EngineError::invalid_config(format!(
                "max_freq {} exceeds Nyquist for sample_rate {}",
                self.max_freq, self.sample_rate
            )));
        }
        if let Err(reason) = self.stride.validate() {
            return Err(EngineError::invalid_config(reason));
        }
        Ok(())
    }
}

/// Recognition-time configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Minimum table-hit count before a candidate is verified.
    pub min_hits_per_fp: usize,
    /// Minimum Hamming similarity for a verified hit.
    pub min_similarity: f32,
    /// Minimum distinct matched query fingerprints for a track to be
    /// reported.
    pub threshold_votes: usize,
    /// Stride of the query fingerprint pass.
    pub stride: Stride,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            min_hits_per_fp: 5,
            min_similarity: 0.5,
            threshold_votes: 5,
            stride: Stride::default_query(64),
        }
    }
}

impl QueryConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_hits_per_fp == 0 {
            return Err(EngineError::invalid_config("min_hits_per_fp must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(EngineError::invalid_config(format!(
                "min_similarity must be in [0, 1], got {}",
                self.min_similarity
            )));
        }
        if self.threshold_votes == 0 {
            return Err(EngineError::invalid_config("threshold_votes must be > 0"));
        }
        if let Err(reason) = self.stride.validate() {
            return Err(EngineError::invalid_config(reason));
        }
        Ok(())
    }
}
