//! Query resolution: candidate gathering, verification, voting, ranking
//!
//! For each query fingerprint, hash-table lookups gather candidate
//! sub-fingerprints; candidates with enough table hits are verified by
//! exact Hamming similarity against the stored bits; verified hits
//! aggregate into per-track votes and scores; tracks clearing the vote
//! threshold are ranked.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::command::HashedFingerprint;
use crate::config::QueryConfig;
use crate::error::EngineError;
use crate::store::{ModelStore, TrackMetadata, TrackRef};
use crate::wavelet;

/// One track surviving the vote threshold.
#[derive(Debug, Clone, Serialize)]
pub struct TrackMatch {
    pub track: TrackRef,
    pub metadata: TrackMetadata,
    /// Sum of Hamming similarities over all verified hits.
    pub score: f64,
    /// Distinct query fingerprints with at least one verified hit.
    pub matched_fingerprints: usize,
    /// Track-side start offsets of the verified hits, seconds. Offsets
    /// cluster around the query's true position within the track.
    pub matched_offsets: Vec<f32>,
}

/// Ranked recognition outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecognitionResult {
    /// Tracks clearing the vote threshold, best first.
    pub matches: Vec<TrackMatch>,
}

impl RecognitionResult {
    pub fn best_match(&self) -> Option<&TrackMatch> {
        self.matches.first()
    }

    pub fn is_successful(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Resolves query fingerprints against a model store.
pub struct QueryEngine<'a> {
    store: &'a dyn ModelStore,
    config: QueryConfig,
}

struct TrackTally {
    score: f64,
    matched: HashSet<usize>,
    offsets: Vec<f32>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a dyn ModelStore, config: QueryConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Resolve a query fingerprint sequence to ranked track matches.
    ///
    /// An empty query yields an unsuccessful result; store failures
    /// propagate untouched.
    pub async fn query(
        &self,
        fingerprints: &[HashedFingerprint],
    ) -> Result<RecognitionResult, EngineError> {
        let mut tallies: HashMap<TrackRef, TrackTally> = HashMap::new();

        for (query_index, fingerprint) in fingerprints.iter().enumerate() {
            let total_bits = fingerprint.bits.len() * 8;

            // Candidate gathering: union of per-table bucket contents,
            // counting how many tables each candidate appeared in.
            let mut table_hits: HashMap<crate::store::SubFpRef, usize> = HashMap::new();
            for (table, &key) in fingerprint.hash_keys.iter().enumerate() {
                for candidate in self.store.read_subfingerprints_by_hash(table, key).await? {
                    *table_hits.entry(candidate).or_insert(0) += 1;
                }
            }

            // Similarity verification over sufficiently colliding candidates.
            let mut candidates: Vec<_> = table_hits
                .into_iter()
                .filter(|&(_, hits)| hits >= self.config.min_hits_per_fp)
                .map(|(subfp, _)| subfp)
                .collect();
            candidates.sort_unstable();

            for subfp in candidates {
                let record = self.store.read_subfingerprint(subfp).await?;
                let sim = wavelet::similarity(&fingerprint.bits, &record.bits, total_bits);
                if sim < self.config.min_similarity {
                    continue;
                }
                let tally = tallies.entry(record.track).or_insert_with(|| TrackTally {
                    score: 0.0,
                    matched: HashSet::new(),
                    offsets: Vec::new(),
                });
                tally.score += sim as f64;
                tally.matched.insert(query_index);
                tally.offsets.push(record.start_offset_seconds);
            }
        }

        // Track aggregation and thresholding.
        let mut matches = Vec::new();
        for (track, tally) in tallies {
            if tally.matched.len() < self.config.threshold_votes {
                continue;
            }
            let metadata = self.store.read_track(track).await?;
            matches.push(TrackMatch {
                track,
                metadata,
                score: tally.score,
                matched_fingerprints: tally.matched.len(),
                matched_offsets: tally.offsets,
            });
        }

        // Rank: score desc, matched fingerprints desc, track ref asc.
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.matched_fingerprints.cmp(&a.matched_fingerprints))
                .then_with(|| a.track.cmp(&b.track))
        });

        Ok(RecognitionResult { matches })
    }
}
