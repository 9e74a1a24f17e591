//! .wfp file format structures
//!
//! Layout: fixed little-endian header, schema identifier string, track
//! metadata JSON, then one record per sub-fingerprint. Fingerprint bits
//! use the engine's serialization (little-endian by cell index); hash keys
//! are 4-byte little-endian integers in table order.

use serde::{Deserialize, Serialize};

use waveprint_core::{HashedFingerprint, TrackMetadata};

/// Magic bytes: "WFPR".
pub const MAGIC: [u8; 4] = *b"WFPR";

/// Current format version.
pub const VERSION: u16 = 1;

/// Fixed-size file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WfpHeader {
    /// Magic bytes: "WFPR".
    pub magic: [u8; 4],
    /// Format version.
    pub version: u16,
    /// Reserved flags.
    pub flags: u16,
    /// Number of sub-fingerprint records.
    pub num_fingerprints: u32,
    /// Canonical sample rate the fingerprints were computed at.
    pub sample_rate: u32,
    /// Source duration in milliseconds.
    pub duration_ms: u32,
    /// Bytes per fingerprint bit-vector.
    pub signature_bytes: u32,
    /// Hash keys per fingerprint.
    pub hash_tables: u16,
    /// Reserved.
    pub reserved: u16,
    /// Length of the schema identifier string.
    pub schema_len: u32,
    /// Length of the track metadata JSON.
    pub meta_len: u32,
}

impl WfpHeader {
    pub fn new(
        num_fingerprints: u32,
        sample_rate: u32,
        duration_ms: u32,
        signature_bytes: u32,
        hash_tables: u16,
        schema_len: u32,
        meta_len: u32,
    ) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            num_fingerprints,
            sample_rate,
            duration_ms,
            signature_bytes,
            hash_tables,
            reserved: 0,
            schema_len,
            meta_len,
        }
    }
}

/// Complete .wfp file contents.
#[derive(Debug, Clone)]
pub struct WfpFile {
    pub schema_id: String,
    pub track: TrackMetadata,
    pub sample_rate: u32,
    pub duration_ms: u32,
    pub fingerprints: Vec<HashedFingerprint>,
}

impl WfpFile {
    pub fn new(
        schema_id: String,
        track: TrackMetadata,
        sample_rate: u32,
        duration_ms: u32,
    ) -> Self {
        Self {
            schema_id,
            track,
            sample_rate,
            duration_ms,
            fingerprints: Vec::new(),
        }
    }

    pub fn with_fingerprints(mut self, fingerprints: Vec<HashedFingerprint>) -> Self {
        self.fingerprints = fingerprints;
        self
    }
}
