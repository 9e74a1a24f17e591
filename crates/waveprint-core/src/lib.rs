//! Waveprint Core - Audio Fingerprinting and Recognition Engine
//!
//! Produces compact, noise-robust binary fingerprints from audio and
//! identifies which previously ingested track a sample came from. The
//! pipeline resamples to a canonical rate, computes a Hann-windowed
//! magnitude spectrogram, collapses it onto a logarithmic band grid, stacks
//! reduced frames into images, applies a 2-D Haar decomposition, keeps the
//! top wavelet signs, and indexes the resulting bit-vectors under min-hash
//! LSH keys. Recognition gathers hash collisions, verifies candidates by
//! exact Hamming similarity, and votes per track.
//!
//! External collaborators (audio decoding, FFT, persistence) enter through
//! explicit capability parameters: [`audio::AudioProvider`],
//! [`spectral::SpectrumProvider`], and [`store::ModelStore`].

pub mod audio;
pub mod bands;
pub mod command;
pub mod config;
pub mod error;
pub mod image;
pub mod minhash;
pub mod query;
pub mod schema;
pub mod spectral;
pub mod store;
pub mod stride;
pub mod wavelet;

mod rng;

pub use command::{
    CancellationToken, FingerprintCommand, FingerprintCommandBuilder, HashedFingerprint,
};
pub use config::{FingerprintConfig, QueryConfig};
pub use error::{EngineError, ProviderError, StoreError};
pub use query::{QueryEngine, RecognitionResult, TrackMatch};
pub use schema::SchemaId;
pub use store::{
    MemoryStore, ModelStore, SubFingerprintInsert, SubFingerprintRecord, SubFpRef, TrackMetadata,
    TrackRef,
};
pub use stride::Stride;

/// Generate hashed fingerprints from an audio file.
pub fn fingerprint_file(
    path: &str,
    config: &FingerprintConfig,
) -> Result<Vec<HashedFingerprint>, EngineError> {
    FingerprintCommandBuilder::new()
        .from_file(path)
        .with_config(config.clone())
        .build()?
        .compute()
}

/// Ingest one track: compute its fingerprints and persist them.
///
/// The store receives nothing when the command is cancelled or fails; the
/// full fingerprint set is computed before the first insert. Returns the
/// track reference and the number of stored sub-fingerprints.
pub async fn ingest_track(
    store: &dyn ModelStore,
    meta: &TrackMetadata,
    command: &FingerprintCommand,
) -> Result<(TrackRef, usize), EngineError> {
    store.bind_schema(&command.schema_id()).await?;
    let fingerprints = command.compute()?;
    let track = store.insert_track(meta).await?;
    let items: Vec<SubFingerprintInsert> = fingerprints
        .into_iter()
        .map(|fp| SubFingerprintInsert {
            start_offset_seconds: fp.start_offset_seconds,
            bits: fp.bits,
            hash_keys: fp.hash_keys,
        })
        .collect();
    store.insert_subfingerprints(track, &items).await?;
    Ok((track, items.len()))
}

/// Recognize a query sample against the store.
pub async fn recognize(
    store: &dyn ModelStore,
    command: &FingerprintCommand,
    query_config: &QueryConfig,
) -> Result<RecognitionResult, EngineError> {
    store.bind_schema(&command.schema_id()).await?;
    let fingerprints = command.compute()?;
    QueryEngine::new(store, query_config.clone())?
        .query(&fingerprints)
        .await
}
