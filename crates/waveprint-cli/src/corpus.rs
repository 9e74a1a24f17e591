//! Filesystem corpus: a directory of .wfp files loaded into memory
//!
//! The filesystem backend keeps one .wfp file per ingested track. Queries
//! load the whole directory into the in-memory model store; files that
//! fail to parse or carry a foreign schema are skipped with a warning.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;

use waveprint_core::{MemoryStore, ModelStore, SchemaId, SubFingerprintInsert, TrackMetadata};
use waveprint_fp::{WfpFile, WfpReader};

/// Load every .wfp file under `dir` into a fresh in-memory store.
/// Returns the store and the number of tracks loaded.
pub async fn load_corpus(dir: &Path, schema: &SchemaId) -> Result<(MemoryStore, usize)> {
    let store = MemoryStore::new();
    store.bind_schema(schema).await?;

    if !dir.exists() {
        return Ok((store, 0));
    }

    let files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("wfp"))
        .collect();

    log::info!("Found {} .wfp files, loading in parallel...", files.len());

    let expected = schema.encode();
    let loaded: Vec<WfpFile> = files
        .par_iter()
        .filter_map(|path| match WfpReader::read_validated(path, &expected) {
            Ok(file) => Some(file),
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    let count = loaded.len();
    for file in loaded {
        let track = store.insert_track(&file.track).await?;
        let items: Vec<SubFingerprintInsert> = file
            .fingerprints
            .into_iter()
            .map(|fp| SubFingerprintInsert {
                start_offset_seconds: fp.start_offset_seconds,
                bits: fp.bits,
                hash_keys: fp.hash_keys,
            })
            .collect();
        store.insert_subfingerprints(track, &items).await?;
    }

    Ok((store, count))
}

/// Filename for a track's .wfp file inside the corpus directory.
pub fn corpus_path(dir: &Path, track: &TrackMetadata) -> PathBuf {
    let stem: String = track
        .track_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{}.wfp", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use waveprint_core::{FingerprintConfig, HashedFingerprint};
    use waveprint_fp::WfpWriter;

    fn meta(id: &str) -> TrackMetadata {
        TrackMetadata {
            track_id: id.into(),
            artist: "a".into(),
            title: "t".into(),
            album: None,
            release_year: None,
            length_seconds: 5.0,
        }
    }

    fn schema() -> SchemaId {
        SchemaId::from_config(&FingerprintConfig::default())
    }

    fn wfp(id: &str, schema_id: String) -> WfpFile {
        WfpFile::new(schema_id, meta(id), 5512, 5_000).with_fingerprints(vec![HashedFingerprint {
            start_offset_seconds: 0.0,
            bits: vec![1u8; 1024],
            hash_keys: vec![9; 25],
        }])
    }

    #[tokio::test]
    async fn loads_matching_files_and_skips_foreign_schemas() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema();

        WfpWriter::write(&dir.path().join("good.wfp"), &wfp("GOOD", schema.encode())).unwrap();
        WfpWriter::write(
            &dir.path().join("foreign.wfp"),
            &wfp("FOREIGN", "wfp1:r64c16:n2048:l20:k3:s7:t100".into()),
        )
        .unwrap();
        std::fs::write(dir.path().join("junk.wfp"), b"garbage").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), b"not a corpus file").unwrap();

        let (store, count) = load_corpus(dir.path(), &schema).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.track_count(), 1);
        assert_eq!(store.subfingerprint_count(), 1);
        let hits = store.read_subfingerprints_by_hash(0, 9).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn missing_directory_is_an_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let (store, count) = load_corpus(&missing, &schema()).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(store.track_count(), 0);
    }

    #[test]
    fn corpus_path_sanitizes_identifiers() {
        let dir = Path::new("/tmp/corpus");
        let path = corpus_path(dir, &meta("AB/CD: 12"));
        assert_eq!(path, Path::new("/tmp/corpus/AB_CD__12.wfp"));
    }
}
