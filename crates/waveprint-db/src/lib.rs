//! Waveprint Database Layer
//!
//! PostgreSQL integration for track and sub-fingerprint storage.

pub mod connection;
pub mod models;
pub mod operations;
pub mod store;

pub use connection::{create_pool, test_connection, DbPool};
pub use models::{DbSubFingerprint, DbTrack, NewHashEntry, NewTrack};
pub use operations::{
    delete_track, get_schema_id, get_subfingerprint, get_subfp_ids_by_hash, get_track,
    init_schema, insert_hash_entries_batch, insert_subfingerprint, insert_track, set_schema_id,
};
pub use store::PostgresStore;
