//! PostgreSQL implementation of the engine's model-store contract

use async_trait::async_trait;
use deadpool_postgres::Pool;

use waveprint_core::{
    EngineError, ModelStore, SchemaId, StoreError, SubFingerprintInsert, SubFingerprintRecord,
    SubFpRef, TrackMetadata, TrackRef,
};

use crate::models::{NewHashEntry, NewTrack};
use crate::operations;

/// PostgreSQL-backed model store.
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    /// Wrap an existing pool; the database schema must already be
    /// initialized via [`operations::init_schema`].
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

fn store_err(context: &str, err: anyhow::Error) -> EngineError {
    StoreError::new(format!("{}: {}", context, err)).into()
}

#[async_trait]
impl ModelStore for PostgresStore {
    async fn bind_schema(&self, schema: &SchemaId) -> Result<(), EngineError> {
        let runtime = schema.encode();
        let persisted = operations::get_schema_id(&self.pool)
            .await
            .map_err(|e| store_err("schema read", e))?;
        match persisted {
            None => operations::set_schema_id(&self.pool, &runtime)
                .await
                .map_err(|e| store_err("schema stamp", e)),
            Some(persisted) if schema.accepts(&persisted) => Ok(()),
            Some(persisted) => Err(EngineError::SchemaMismatch { runtime, persisted }),
        }
    }

    async fn schema_id(&self) -> Result<Option<String>, EngineError> {
        operations::get_schema_id(&self.pool)
            .await
            .map_err(|e| store_err("schema read", e))
    }

    async fn insert_track(&self, meta: &TrackMetadata) -> Result<TrackRef, EngineError> {
        let id = operations::insert_track(
            &self.pool,
            &NewTrack {
                track_id: meta.track_id.clone(),
                artist: meta.artist.clone(),
                title: meta.title.clone(),
                album: meta.album.clone(),
                release_year: meta.release_year.map(|y| y as i16),
                length_seconds: meta.length_seconds,
            },
        )
        .await
        .map_err(|e| store_err("track insert", e))?;
        Ok(TrackRef(id as u32))
    }

    async fn insert_subfingerprints(
        &self,
        track: TrackRef,
        items: &[SubFingerprintInsert],
    ) -> Result<(), EngineError> {
        for item in items {
            let subfp_id = operations::insert_subfingerprint(
                &self.pool,
                track.0 as i32,
                item.start_offset_seconds,
                &item.bits,
            )
            .await
            .map_err(|e| store_err("sub-fingerprint insert", e))?;

            let entries: Vec<NewHashEntry> = item
                .hash_keys
                .iter()
                .enumerate()
                .map(|(table, &key)| NewHashEntry {
                    table_index: table as i16,
                    hash_key: key as i64,
                    subfp_id,
                })
                .collect();
            operations::insert_hash_entries_batch(&self.pool, &entries)
                .await
                .map_err(|e| store_err("hash entry insert", e))?;
        }
        Ok(())
    }

    async fn read_subfingerprints_by_hash(
        &self,
        table: usize,
        key: u32,
    ) -> Result<Vec<SubFpRef>, EngineError> {
        let ids = operations::get_subfp_ids_by_hash(&self.pool, table as i16, key as i64)
            .await
            .map_err(|e| store_err("hash lookup", e))?;
        Ok(ids.into_iter().map(|id| SubFpRef(id as u64)).collect())
    }

    async fn read_subfingerprint(
        &self,
        subfp: SubFpRef,
    ) -> Result<SubFingerprintRecord, EngineError> {
        let row = operations::get_subfingerprint(&self.pool, subfp.0 as i64)
            .await
            .map_err(|e| store_err("sub-fingerprint read", e))?
            .ok_or_else(|| {
                EngineError::from(StoreError::new(format!(
                    "unknown sub-fingerprint ref {}",
                    subfp.0
                )))
            })?;
        Ok(SubFingerprintRecord {
            track: TrackRef(row.track_id as u32),
            start_offset_seconds: row.start_offset_seconds,
            bits: row.bits,
        })
    }

    async fn read_track(&self, track: TrackRef) -> Result<TrackMetadata, EngineError> {
        let row = operations::get_track(&self.pool, track.0 as i32)
            .await
            .map_err(|e| store_err("track read", e))?
            .ok_or_else(|| {
                EngineError::from(StoreError::new(format!("unknown track ref {}", track.0)))
            })?;
        Ok(TrackMetadata {
            track_id: row.track_id,
            artist: row.artist,
            title: row.title,
            album: row.album,
            release_year: row.release_year.map(|y| y as u16),
            length_seconds: row.length_seconds,
        })
    }

    async fn delete_track(&self, track: TrackRef) -> Result<(), EngineError> {
        operations::delete_track(&self.pool, track.0 as i32)
            .await
            .map_err(|e| store_err("track delete", e))
    }
}
