//! .wfp file writer

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::format::{WfpFile, WfpHeader};

pub struct WfpWriter;

impl WfpWriter {
    /// Write a .wfp file.
    pub fn write(path: &Path, file: &WfpFile) -> Result<()> {
        let schema_bytes = file.schema_id.as_bytes();
        let meta_json = serde_json::to_vec(&file.track).context("failed to serialize track metadata")?;

        let signature_bytes = file
            .fingerprints
            .first()
            .map(|fp| fp.bits.len() as u32)
            .unwrap_or(0);
        let hash_tables = file
            .fingerprints
            .first()
            .map(|fp| fp.hash_keys.len() as u16)
            .unwrap_or(0);

        let header = WfpHeader::new(
            file.fingerprints.len() as u32,
            file.sample_rate,
            file.duration_ms,
            signature_bytes,
            hash_tables,
            schema_bytes.len() as u32,
            meta_json.len() as u32,
        );

        let out = File::create(path)
            .with_context(|| format!("failed to create .wfp file: {}", path.display()))?;
        let mut writer = BufWriter::new(out);

        Self::write_header(&mut writer, &header)?;
        writer.write_all(schema_bytes)?;
        writer.write_all(&meta_json)?;

        for fp in &file.fingerprints {
            writer.write_all(&fp.start_offset_seconds.to_le_bytes())?;
            writer.write_all(&fp.bits)?;
            for &key in &fp.hash_keys {
                writer.write_all(&key.to_le_bytes())?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    fn write_header(writer: &mut BufWriter<File>, header: &WfpHeader) -> Result<()> {
        writer.write_all(&header.magic)?;
        writer.write_all(&header.version.to_le_bytes())?;
        writer.write_all(&header.flags.to_le_bytes())?;
        writer.write_all(&header.num_fingerprints.to_le_bytes())?;
        writer.write_all(&header.sample_rate.to_le_bytes())?;
        writer.write_all(&header.duration_ms.to_le_bytes())?;
        writer.write_all(&header.signature_bytes.to_le_bytes())?;
        writer.write_all(&header.hash_tables.to_le_bytes())?;
        writer.write_all(&header.reserved.to_le_bytes())?;
        writer.write_all(&header.schema_len.to_le_bytes())?;
        writer.write_all(&header.meta_len.to_le_bytes())?;
        Ok(())
    }
}
