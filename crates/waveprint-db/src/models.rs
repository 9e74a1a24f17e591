use serde::{Deserialize, Serialize};

/// A track row as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbTrack {
    pub id: i32,
    pub track_id: String,
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub release_year: Option<i16>,
    pub length_seconds: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input structure for inserting a track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrack {
    pub track_id: String,
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub release_year: Option<i16>,
    pub length_seconds: f64,
}

/// A sub-fingerprint row as stored in the database
#[derive(Debug, Clone)]
pub struct DbSubFingerprint {
    pub id: i64,
    pub track_id: i32,
    pub start_offset_seconds: f32,
    pub bits: Vec<u8>,
}

/// Input structure for batch-inserting hash-table entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHashEntry {
    pub table_index: i16,
    /// 32-bit key widened to avoid sign issues in the wire type.
    pub hash_key: i64,
    pub subfp_id: i64,
}
