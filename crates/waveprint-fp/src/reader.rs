//! .wfp file reader

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

use waveprint_core::{HashedFingerprint, TrackMetadata};

use crate::format::{WfpFile, WfpHeader, MAGIC, VERSION};

pub struct WfpReader;

impl WfpReader {
    /// Read a .wfp file.
    pub fn read(path: &Path) -> Result<WfpFile> {
        let file = File::open(path)
            .with_context(|| format!("failed to open .wfp file: {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let header = Self::read_header(&mut reader)?;
        if header.magic != MAGIC {
            anyhow::bail!("invalid .wfp file: magic bytes mismatch");
        }
        if header.version != VERSION {
            anyhow::bail!(
                "unsupported .wfp version {} (expected {})",
                header.version,
                VERSION
            );
        }

        let mut schema_bytes = vec![0u8; header.schema_len as usize];
        reader.read_exact(&mut schema_bytes)?;
        let schema_id = String::from_utf8(schema_bytes).context("schema id is not UTF-8")?;

        let mut meta_bytes = vec![0u8; header.meta_len as usize];
        reader.read_exact(&mut meta_bytes)?;
        let track: TrackMetadata =
            serde_json::from_slice(&meta_bytes).context("failed to parse track metadata")?;

        let mut fingerprints = Vec::with_capacity(header.num_fingerprints as usize);
        for _ in 0..header.num_fingerprints {
            let start_offset_seconds = Self::read_f32(&mut reader)?;
            let mut bits = vec![0u8; header.signature_bytes as usize];
            reader.read_exact(&mut bits)?;
            let mut hash_keys = Vec::with_capacity(header.hash_tables as usize);
            for _ in 0..header.hash_tables {
                hash_keys.push(Self::read_u32(&mut reader)?);
            }
            fingerprints.push(HashedFingerprint {
                start_offset_seconds,
                bits,
                hash_keys,
            });
        }

        Ok(WfpFile {
            schema_id,
            track,
            sample_rate: header.sample_rate,
            duration_ms: header.duration_ms,
            fingerprints,
        })
    }

    /// Read a .wfp file and refuse it when stamped with a different schema.
    pub fn read_validated(path: &Path, expected_schema: &str) -> Result<WfpFile> {
        let file = Self::read(path)?;
        if file.schema_id != expected_schema {
            anyhow::bail!(
                "schema mismatch in {}: file {}, runtime {}",
                path.display(),
                file.schema_id,
                expected_schema
            );
        }
        Ok(file)
    }

    fn read_header(reader: &mut BufReader<File>) -> Result<WfpHeader> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        Ok(WfpHeader {
            magic,
            version: Self::read_u16(reader)?,
            flags: Self::read_u16(reader)?,
            num_fingerprints: Self::read_u32(reader)?,
            sample_rate: Self::read_u32(reader)?,
            duration_ms: Self::read_u32(reader)?,
            signature_bytes: Self::read_u32(reader)?,
            hash_tables: Self::read_u16(reader)?,
            reserved: Self::read_u16(reader)?,
            schema_len: Self::read_u32(reader)?,
            meta_len: Self::read_u32(reader)?,
        })
    }

    fn read_u16(reader: &mut BufReader<File>) -> Result<u16> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(reader: &mut BufReader<File>) -> Result<u32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_f32(reader: &mut BufReader<File>) -> Result<f32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WfpWriter;

    fn sample_file() -> WfpFile {
        let track = TrackMetadata {
            track_id: "USRC17607839".into(),
            artist: "Artist".into(),
            title: "Title".into(),
            album: Some("Album".into()),
            release_year: Some(1976),
            length_seconds: 30.0,
        };
        let fingerprints = vec![
            HashedFingerprint {
                start_offset_seconds: 0.0,
                bits: vec![0xAA; 1024],
                hash_keys: (0..25).collect(),
            },
            HashedFingerprint {
                start_offset_seconds: 1.486,
                bits: vec![0x55; 1024],
                hash_keys: (100..125).collect(),
            },
        ];
        WfpFile::new("wfp1:r128c32:n8192:l25:k4:s42:t200".into(), track, 5512, 30_000)
            .with_fingerprints(fingerprints)
    }

    #[test]
    fn round_trip_preserves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.wfp");
        let original = sample_file();

        WfpWriter::write(&path, &original).unwrap();
        let loaded = WfpReader::read(&path).unwrap();

        assert_eq!(loaded.schema_id, original.schema_id);
        assert_eq!(loaded.track, original.track);
        assert_eq!(loaded.sample_rate, 5512);
        assert_eq!(loaded.duration_ms, 30_000);
        assert_eq!(loaded.fingerprints, original.fingerprints);
    }

    #[test]
    fn garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.wfp");
        std::fs::write(&path, b"not a fingerprint file at all........").unwrap();
        assert!(WfpReader::read(&path).is_err());
    }

    #[test]
    fn schema_validation_refuses_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.wfp");
        WfpWriter::write(&path, &sample_file()).unwrap();

        assert!(WfpReader::read_validated(&path, "wfp1:r128c32:n8192:l25:k4:s42:t200").is_ok());
        let err = WfpReader::read_validated(&path, "wfp1:r64c16:n2048:l20:k3:s7:t100").unwrap_err();
        assert!(err.to_string().contains("schema mismatch"));
    }
}
