//! Model store contract and in-memory backend
//!
//! The engine persists tracks, sub-fingerprints, and hash-table entries
//! through this narrow interface. Any backend works: the in-memory store
//! below, the PostgreSQL backend in `waveprint-db`, or a corpus of
//! fingerprint files loaded into memory. The only transactional assumption
//! is that inserts are durable before the next read.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::schema::SchemaId;

/// Track metadata as supplied at ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// ISRC or synthetic identifier.
    pub track_id: String,
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub release_year: Option<u16>,
    pub length_seconds: f64,
}

/// Store-assigned track reference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TrackRef(pub u32);

/// Store-assigned sub-fingerprint reference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SubFpRef(pub u64);

/// One sub-fingerprint as handed to the store at ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct SubFingerprintInsert {
    pub start_offset_seconds: f32,
    pub bits: Vec<u8>,
    /// One key per hash table, in table order.
    pub hash_keys: Vec<u32>,
}

/// One sub-fingerprint as read back for similarity verification.
#[derive(Debug, Clone, PartialEq)]
pub struct SubFingerprintRecord {
    pub track: TrackRef,
    pub start_offset_seconds: f32,
    pub bits: Vec<u8>,
}

/// Narrow persistence contract the engine consumes.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Stamp the store with `schema` or verify the existing stamp.
    /// A disagreeing stamp is fatal.
    async fn bind_schema(&self, schema: &SchemaId) -> Result<(), EngineError>;

    /// Persisted schema identifier, if any data has been stamped.
    async fn schema_id(&self) -> Result<Option<String>, EngineError>;

    async fn insert_track(&self, meta: &TrackMetadata) -> Result<TrackRef, EngineError>;

    /// Insert sub-fingerprints for a track. Idempotent per
    /// `(track, start_offset_seconds)`: retried inserts are safe.
    async fn insert_subfingerprints(
        &self,
        track: TrackRef,
        items: &[SubFingerprintInsert],
    ) -> Result<(), EngineError>;

    /// Sub-fingerprint references filed under `key` in hash table `table`.
    async fn read_subfingerprints_by_hash(
        &self,
        table: usize,
        key: u32,
    ) -> Result<Vec<SubFpRef>, EngineError>;

    async fn read_subfingerprint(
        &self,
        subfp: SubFpRef,
    ) -> Result<SubFingerprintRecord, EngineError>;

    async fn read_track(&self, track: TrackRef) -> Result<TrackMetadata, EngineError>;

    /// Delete a track; its sub-fingerprints and hash entries cascade.
    async fn delete_track(&self, track: TrackRef) -> Result<(), EngineError>;
}

/// In-memory model store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    schema: Option<String>,
    next_track: u32,
    next_subfp: u64,
    tracks: HashMap<u32, TrackMetadata>,
    subfps: HashMap<u64, StoredSubFp>,
    /// `(table, key)` entries; derived from sub-fingerprints.
    tables: HashMap<(usize, u32), Vec<SubFpRef>>,
    /// Idempotency guard: `(track, offset bits)` already inserted.
    seen: HashMap<(u32, u32), SubFpRef>,
}

#[derive(Debug, Clone)]
struct StoredSubFp {
    record: SubFingerprintRecord,
    hash_keys: Vec<u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored sub-fingerprints.
    pub fn subfingerprint_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").subfps.len()
    }

    /// Total stored tracks.
    pub fn track_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").tracks.len()
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn bind_schema(&self, schema: &SchemaId) -> Result<(), EngineError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        match &inner.schema {
            None => {
                inner.schema = Some(schema.encode());
                Ok(())
            }
            Some(persisted) if schema.accepts(persisted) => Ok(()),
            Some(persisted) => Err(EngineError::SchemaMismatch {
                runtime: schema.encode(),
                persisted: persisted.clone(),
            }),
        }
    }

    async fn schema_id(&self) -> Result<Option<String>, EngineError> {
        Ok(self.inner.read().expect("store lock poisoned").schema.clone())
    }

    async fn insert_track(&self, meta: &TrackMetadata) -> Result<TrackRef, EngineError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let id = inner.next_track;
        inner.next_track += 1;
        inner.tracks.insert(id, meta.clone());
        Ok(TrackRef(id))
    }

    async fn insert_subfingerprints(
        &self,
        track: TrackRef,
        items: &[SubFingerprintInsert],
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if !inner.tracks.contains_key(&track.0) {
            return Err(crate::error::StoreError::new(format!(
                "unknown track ref {}",
                track.0
            ))
            .into());
        }
        for item in items {
            let dedup_key = (track.0, item.start_offset_seconds.to_bits());
            if inner.seen.contains_key(&dedup_key) {
                continue;
            }
            let id = inner.next_subfp;
            inner.next_subfp += 1;
            let subfp = SubFpRef(id);
            inner.seen.insert(dedup_key, subfp);
            inner.subfps.insert(
                id,
                StoredSubFp {
                    record: SubFingerprintRecord {
                        track,
                        start_offset_seconds: item.start_offset_seconds,
                        bits: item.bits.clone(),
                    },
                    hash_keys: item.hash_keys.clone(),
                },
            );
            for (table, &key) in item.hash_keys.iter().enumerate() {
                inner.tables.entry((table, key)).or_default().push(subfp);
            }
        }
        Ok(())
    }

    async fn read_subfingerprints_by_hash(
        &self,
        table: usize,
        key: u32,
    ) -> Result<Vec<SubFpRef>, EngineError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .tables
            .get(&(table, key))
            .cloned()
            .unwrap_or_default())
    }

    async fn read_subfingerprint(
        &self,
        subfp: SubFpRef,
    ) -> Result<SubFingerprintRecord, EngineError> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .subfps
            .get(&subfp.0)
            .map(|s| s.record.clone())
            .ok_or_else(|| {
                crate::error::StoreError::new(format!("unknown sub-fingerprint ref {}", subfp.0))
                    .into()
            })
    }

    async fn read_track(&self, track: TrackRef) -> Result<TrackMetadata, EngineError> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .tracks
            .get(&track.0)
            .cloned()
            .ok_or_else(|| {
                crate::error::StoreError::new(format!("unknown track ref {}", track.0)).into()
            })
    }

    async fn delete_track(&self, track: TrackRef) -> Result<(), EngineError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.tracks.remove(&track.0);
        let doomed: Vec<u64> = inner
            .subfps
            .iter()
            .filter(|(_, s)| s.record.track == track)
            .map(|(&id, _)| id)
            .collect();
        for id in doomed {
            let stored = inner.subfps.remove(&id).expect("id collected above");
            for (table, key) in stored.hash_keys.iter().enumerate() {
                if let Some(entries) = inner.tables.get_mut(&(table, *key)) {
                    entries.retain(|r| r.0 != id);
                }
            }
        }
        inner.seen.retain(|&(t, _), _| t != track.0);
        Ok(())
    }
}
