//! End-to-end recognition scenarios over synthetic audio
//!
//! Tracks are synthesized deterministically (seeded noise plus a slow
//! chirp, so fingerprints vary over time), ingested into the in-memory
//! store, and queried back under various conditions.

use waveprint_core::{
    ingest_track, recognize, CancellationToken, EngineError, FingerprintCommand,
    FingerprintCommandBuilder, FingerprintConfig, MemoryStore, QueryConfig, Stride, TrackMetadata,
};

const SAMPLE_RATE: u32 = 5512;

/// SplitMix64 step, used here only to synthesize reproducible noise.
struct TestRng(u64);

impl TestRng {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z = z ^ (z >> 31);
        (z >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0
    }
}

/// A chirp from 400 to 900 Hz with seeded background noise. The frequency
/// drift keeps fingerprint windows distinguishable across time.
fn chirp_track(seconds: f64, noise_seed: u64, noise_amp: f32) -> Vec<f32> {
    let len = (seconds * SAMPLE_RATE as f64) as usize;
    let mut rng = TestRng(noise_seed);
    let mut phase = 0.0_f64;
    (0..len)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            let freq = 400.0 + 500.0 * t / seconds;
            phase += 2.0 * std::f64::consts::PI * freq / SAMPLE_RATE as f64;
            0.6 * phase.sin() as f32 + noise_amp * rng.next_f32()
        })
        .collect()
}

fn noise_only(seconds: f64, seed: u64) -> Vec<f32> {
    let len = (seconds * SAMPLE_RATE as f64) as usize;
    let mut rng = TestRng(seed);
    (0..len).map(|_| 0.5 * rng.next_f32()).collect()
}

fn meta(id: &str, seconds: f64) -> TrackMetadata {
    TrackMetadata {
        track_id: id.into(),
        artist: "Synthetic".into(),
        title: id.into(),
        album: Some("Test Corpus".into()),
        release_year: Some(2024),
        length_seconds: seconds,
    }
}

fn ingest_command(samples: Vec<f32>) -> FingerprintCommand {
    FingerprintCommandBuilder::new()
        .from_samples(samples)
        .build()
        .expect("valid ingest command")
}

/// Query stride aligned with the ingest stride so exact window matches
/// exist; offsets are sliced on frame boundaries for the same reason.
fn query_command(samples: Vec<f32>) -> FingerprintCommand {
    FingerprintCommandBuilder::new()
        .from_samples(samples)
        .with_stride(Stride::Incremental { step: 512 })
        .build()
        .expect("valid query command")
}

#[tokio::test]
async fn self_query_identifies_the_ingested_track() {
    let store = MemoryStore::new();
    let samples = chirp_track(30.0, 1, 0.05);

    let (track, stored) = ingest_track(&store, &meta("IDENTITY", 30.0), &ingest_command(samples.clone()))
        .await
        .unwrap();
    assert!(stored > 100, "expected a dense fingerprint set, got {}", stored);

    let result = recognize(&store, &query_command(samples), &QueryConfig::default())
        .await
        .unwrap();

    assert!(result.is_successful());
    let best = result.best_match().unwrap();
    assert_eq!(best.track, track);
    assert_eq!(best.metadata.track_id, "IDENTITY");
    assert!(best.matched_fingerprints >= 25, "matched {}", best.matched_fingerprints);
    assert!(best.score > 20.0, "score {}", best.score);
}

#[tokio::test]
async fn mild_noise_does_not_break_recognition() {
    let store = MemoryStore::new();
    let samples = chirp_track(30.0, 1, 0.05);
    let (track, _) = ingest_track(&store, &meta("NOISY", 30.0), &ingest_command(samples.clone()))
        .await
        .unwrap();

    let clean = recognize(&store, &query_command(samples.clone()), &QueryConfig::default())
        .await
        .unwrap();
    let clean_score = clean.best_match().unwrap().score;

    let mut rng = TestRng(99);
    let degraded: Vec<f32> = samples.iter().map(|&s| s + 0.01 * rng.next_f32()).collect();
    let result = recognize(&store, &query_command(degraded), &QueryConfig::default())
        .await
        .unwrap();

    assert!(result.is_successful());
    let best = result.best_match().unwrap();
    assert_eq!(best.track, track);
    assert!(
        best.score >= 0.3 * clean_score,
        "degraded score {} against clean {}",
        best.score,
        clean_score
    );
}

#[tokio::test]
async fn offset_query_matches_and_offsets_cluster() {
    let store = MemoryStore::new();
    let samples = chirp_track(30.0, 1, 0.05);
    let (track, _) = ingest_track(&store, &meta("OFFSET", 30.0), &ingest_command(samples.clone()))
        .await
        .unwrap();

    // Roughly five seconds in, cut on a frame boundary (432 * 64 samples),
    // ten seconds long.
    let start = 432 * 64;
    let query_start_seconds = start as f32 / SAMPLE_RATE as f32;
    let end = start + 10 * SAMPLE_RATE as usize;
    let result = recognize(
        &store,
        &query_command(samples[start..end].to_vec()),
        &QueryConfig::default(),
    )
    .await
    .unwrap();

    assert!(result.is_successful());
    let best = result.best_match().unwrap();
    assert_eq!(best.track, track);

    // Verified candidates sit where the query audio lives in the track.
    let min = best
        .matched_offsets
        .iter()
        .cloned()
        .fold(f32::INFINITY, f32::min);
    let max = best
        .matched_offsets
        .iter()
        .cloned()
        .fold(f32::NEG_INFINITY, f32::max);
    assert!(
        (min - query_start_seconds).abs() < 1.0,
        "earliest matched offset {} far from {}",
        min,
        query_start_seconds
    );
    assert!(
        max <= query_start_seconds + 10.5,
        "latest matched offset {} beyond the queried span",
        max
    );
}

#[tokio::test]
async fn unrelated_audio_is_rejected() {
    let store = MemoryStore::new();
    let samples = chirp_track(30.0, 1, 0.05);
    ingest_track(&store, &meta("CORPUS", 30.0), &ingest_command(samples))
        .await
        .unwrap();

    let result = recognize(
        &store,
        &query_command(noise_only(10.0, 12345)),
        &QueryConfig::default(),
    )
    .await
    .unwrap();

    assert!(!result.is_successful());
    assert!(result.best_match().is_none());
}

#[tokio::test]
async fn two_track_corpus_ranks_the_right_track_first() {
    let store = MemoryStore::new();
    let first = chirp_track(20.0, 1, 0.05);
    let second = noise_only(20.0, 777);

    ingest_track(&store, &meta("FIRST", 20.0), &ingest_command(first))
        .await
        .unwrap();
    let (second_ref, _) = ingest_track(&store, &meta("SECOND", 20.0), &ingest_command(second.clone()))
        .await
        .unwrap();

    let result = recognize(&store, &query_command(second), &QueryConfig::default())
        .await
        .unwrap();
    assert!(result.is_successful());
    assert_eq!(result.best_match().unwrap().track, second_ref);
}

#[tokio::test]
async fn too_short_input_is_not_an_error() {
    let store = MemoryStore::new();
    let samples = chirp_track(30.0, 1, 0.05);
    ingest_track(&store, &meta("CORPUS", 30.0), &ingest_command(samples))
        .await
        .unwrap();

    // Shorter than one fingerprint image.
    let result = recognize(
        &store,
        &query_command(noise_only(0.5, 3)),
        &QueryConfig::default(),
    )
    .await
    .unwrap();
    assert!(!result.is_successful());

    // Ingest of the same clip stores zero sub-fingerprints.
    let before = store.subfingerprint_count();
    let (_, stored) = ingest_track(
        &store,
        &meta("SHORT", 0.5),
        &ingest_command(noise_only(0.5, 3)),
    )
    .await
    .unwrap();
    assert_eq!(stored, 0);
    assert_eq!(store.subfingerprint_count(), before);
}

#[tokio::test]
async fn cancelled_ingest_persists_nothing() {
    let store = MemoryStore::new();
    let token = CancellationToken::new();
    token.cancel();

    let command = FingerprintCommandBuilder::new()
        .from_samples(chirp_track(30.0, 1, 0.05))
        .with_cancellation(token)
        .build()
        .unwrap();

    let err = ingest_track(&store, &meta("CANCELLED", 30.0), &command)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert_eq!(store.track_count(), 0);
    assert_eq!(store.subfingerprint_count(), 0);
}

#[tokio::test]
async fn reseeded_query_hits_schema_mismatch() {
    let store = MemoryStore::new();
    let samples = chirp_track(20.0, 1, 0.05);
    ingest_track(&store, &meta("SEEDED", 20.0), &ingest_command(samples.clone()))
        .await
        .unwrap();

    let reseeded = FingerprintCommandBuilder::new()
        .from_samples(samples)
        .with_config(FingerprintConfig {
            permutation_seed: 7,
            ..Default::default()
        })
        .build()
        .unwrap();

    let err = recognize(&store, &reseeded, &QueryConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SchemaMismatch { .. }));
}
