use anyhow::{Context, Result};
use deadpool_postgres::Pool;

use crate::models::*;

/// Create tables and indexes when absent.
pub async fn init_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;

    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS schema_info (
                 id BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (id),
                 schema_id TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS tracks (
                 id SERIAL PRIMARY KEY,
                 track_id TEXT NOT NULL,
                 artist TEXT NOT NULL,
                 title TEXT NOT NULL,
                 album TEXT,
                 release_year SMALLINT,
                 length_seconds DOUBLE PRECISION NOT NULL,
                 created_at TIMESTAMPTZ NOT NULL DEFAULT now()
             );
             CREATE TABLE IF NOT EXISTS subfingerprints (
                 id BIGSERIAL PRIMARY KEY,
                 track_id INTEGER NOT NULL REFERENCES tracks(id) ON DELETE CASCADE,
                 start_offset_seconds REAL NOT NULL,
                 bits BYTEA NOT NULL,
                 UNIQUE (track_id, start_offset_seconds)
             );
             CREATE TABLE IF NOT EXISTS hash_entries (
                 table_index SMALLINT NOT NULL,
                 hash_key BIGINT NOT NULL,
                 subfp_id BIGINT NOT NULL REFERENCES subfingerprints(id) ON DELETE CASCADE,
                 PRIMARY KEY (table_index, hash_key, subfp_id)
             );
             CREATE INDEX IF NOT EXISTS idx_hash_entries_lookup
                 ON hash_entries (table_index, hash_key);",
        )
        .await
        .context("Failed to initialize database schema")?;

    Ok(())
}

/// Persisted schema identifier, if stamped.
pub async fn get_schema_id(pool: &Pool) -> Result<Option<String>> {
    let client = pool.get().await?;

    let row = client
        .query_opt("SELECT schema_id FROM schema_info", &[])
        .await
        .context("Failed to read schema id")?;

    Ok(row.map(|r| r.get(0)))
}

/// Stamp the schema identifier. First write wins; later writes must match.
pub async fn set_schema_id(pool: &Pool, schema_id: &str) -> Result<()> {
    let client = pool.get().await?;

    client
        .execute(
            "INSERT INTO schema_info (schema_id) VALUES ($1)
             ON CONFLICT (id) DO NOTHING",
            &[&schema_id],
        )
        .await
        .context("Failed to stamp schema id")?;

    Ok(())
}

/// Insert a track and return its reference.
pub async fn insert_track(pool: &Pool, track: &NewTrack) -> Result<i32> {
    let client = pool.get().await?;

    let row = client
        .query_one(
            "INSERT INTO tracks
             (track_id, artist, title, album, release_year, length_seconds)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
            &[
                &track.track_id,
                &track.artist,
                &track.title,
                &track.album,
                &track.release_year,
                &track.length_seconds,
            ],
        )
        .await
        .context("Failed to insert track")?;

    Ok(row.get(0))
}

/// Insert one sub-fingerprint, idempotent per `(track, start_offset)`.
/// Returns the row id whether freshly inserted or already present.
pub async fn insert_subfingerprint(
    pool: &Pool,
    track_id: i32,
    start_offset_seconds: f32,
    bits: &[u8],
) -> Result<i64> {
    let client = pool.get().await?;

    let row = client
        .query_one(
            "INSERT INTO subfingerprints (track_id, start_offset_seconds, bits)
             VALUES ($1, $2, $3)
             ON CONFLICT (track_id, start_offset_seconds)
             DO UPDATE SET bits = EXCLUDED.bits
             RETURNING id",
            &[&track_id, &start_offset_seconds, &bits],
        )
        .await
        .context("Failed to insert sub-fingerprint")?;

    Ok(row.get(0))
}

/// Batch insert hash-table entries using JSONB
pub async fn insert_hash_entries_batch(pool: &Pool, entries: &[NewHashEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let client = pool.get().await?;

    let json_array = serde_json::to_value(entries).context("Failed to serialize hash entries")?;

    client
        .execute(
            "INSERT INTO hash_entries (table_index, hash_key, subfp_id)
             SELECT
                 (e->>'table_index')::SMALLINT,
                 (e->>'hash_key')::BIGINT,
                 (e->>'subfp_id')::BIGINT
             FROM jsonb_array_elements($1::jsonb) AS e
             ON CONFLICT DO NOTHING",
            &[&json_array],
        )
        .await
        .context("Failed to batch insert hash entries")?;

    Ok(())
}

/// Sub-fingerprint ids filed under a hash key in one table.
pub async fn get_subfp_ids_by_hash(pool: &Pool, table_index: i16, hash_key: i64) -> Result<Vec<i64>> {
    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT subfp_id FROM hash_entries
             WHERE table_index = $1 AND hash_key = $2",
            &[&table_index, &hash_key],
        )
        .await
        .context("Failed to query hash entries")?;

    Ok(rows.iter().map(|r| r.get(0)).collect())
}

/// Load one sub-fingerprint row.
pub async fn get_subfingerprint(pool: &Pool, id: i64) -> Result<Option<DbSubFingerprint>> {
    let client = pool.get().await?;

    let row = client
        .query_opt(
            "SELECT id, track_id, start_offset_seconds, bits
             FROM subfingerprints
             WHERE id = $1",
            &[&id],
        )
        .await
        .context("Failed to get sub-fingerprint")?;

    Ok(row.map(|r| DbSubFingerprint {
        id: r.get(0),
        track_id: r.get(1),
        start_offset_seconds: r.get(2),
        bits: r.get(3),
    }))
}

/// Load one track row.
pub async fn get_track(pool: &Pool, id: i32) -> Result<Option<DbTrack>> {
    let client = pool.get().await?;

    let row = client
        .query_opt(
            "SELECT id, track_id, artist, title, album, release_year, length_seconds, created_at
             FROM tracks
             WHERE id = $1",
            &[&id],
        )
        .await
        .context("Failed to get track")?;

    Ok(row.map(|r| DbTrack {
        id: r.get(0),
        track_id: r.get(1),
        artist: r.get(2),
        title: r.get(3),
        album: r.get(4),
        release_year: r.get(5),
        length_seconds: r.get(6),
        created_at: r.get(7),
    }))
}

/// Delete a track; sub-fingerprints and hash entries cascade.
pub async fn delete_track(pool: &Pool, id: i32) -> Result<()> {
    let client = pool.get().await?;

    client
        .execute("DELETE FROM tracks WHERE id = $1", &[&id])
        .await
        .context("Failed to delete track")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    // These are integration tests and require a running PostgreSQL
    // instance; run with: cargo test --package waveprint-db -- --ignored

    use super::*;
    use crate::connection::create_pool;

    async fn pool() -> deadpool_postgres::Pool {
        create_pool(
            "localhost",
            5432,
            "waveprint",
            "waveprint_user",
            "waveprint_pass",
            4,
        )
        .unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn insert_and_read_back_round_trip() {
        let pool = pool().await;
        init_schema(&pool).await.unwrap();

        let track_id = insert_track(
            &pool,
            &NewTrack {
                track_id: "TEST-1".into(),
                artist: "a".into(),
                title: "t".into(),
                album: None,
                release_year: None,
                length_seconds: 10.0,
            },
        )
        .await
        .unwrap();

        let subfp_id = insert_subfingerprint(&pool, track_id, 0.0, &[1, 2, 3, 4])
            .await
            .unwrap();
        insert_hash_entries_batch(
            &pool,
            &[NewHashEntry {
                table_index: 0,
                hash_key: 77,
                subfp_id,
            }],
        )
        .await
        .unwrap();

        let ids = get_subfp_ids_by_hash(&pool, 0, 77).await.unwrap();
        assert!(ids.contains(&subfp_id));

        delete_track(&pool, track_id).await.unwrap();
        assert!(get_subfingerprint(&pool, subfp_id).await.unwrap().is_none());
    }
}
