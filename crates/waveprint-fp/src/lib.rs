//! Waveprint fingerprint file format
//!
//! A `.wfp` file carries one track's metadata and its complete set of
//! hashed sub-fingerprints, stamped with the schema identifier they were
//! computed under. Readers refuse files from an incompatible schema.

pub mod format;
pub mod reader;
pub mod writer;

pub use format::{WfpFile, WfpHeader, MAGIC, VERSION};
pub use reader::WfpReader;
pub use writer::WfpWriter;
