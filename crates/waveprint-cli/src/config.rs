//! Storage configuration for the CLI tools
//!
//! Provides TOML-based configuration for selecting the storage backend
//! (filesystem corpus of .wfp files vs PostgreSQL) and query thresholds.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub query: QuerySection,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                filesystem: FilesystemConfig::default(),
                postgresql: PostgresqlConfig::default(),
            },
            query: QuerySection::default(),
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    #[serde(default)]
    pub filesystem: FilesystemConfig,
    #[serde(default)]
    pub postgresql: PostgresqlConfig,
}

/// Storage backend type
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    Postgresql,
}

/// Filesystem backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesystemConfig {
    #[serde(default = "default_base_directory")]
    pub base_directory: String,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            base_directory: default_base_directory(),
        }
    }
}

fn default_base_directory() -> String {
    "./corpus".to_string()
}

/// PostgreSQL backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgresqlConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for PostgresqlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    5432
}
fn default_database() -> String {
    "waveprint".to_string()
}
fn default_user() -> String {
    "waveprint_user".to_string()
}
fn default_password() -> String {
    "waveprint_pass".to_string()
}
fn default_max_connections() -> u32 {
    10
}

/// Query thresholds exposed through the config file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuerySection {
    #[serde(default = "default_min_hits_per_fp")]
    pub min_hits_per_fp: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
    #[serde(default = "default_threshold_votes")]
    pub threshold_votes: usize,
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            min_hits_per_fp: default_min_hits_per_fp(),
            min_similarity: default_min_similarity(),
            threshold_votes: default_threshold_votes(),
        }
    }
}

fn default_min_hits_per_fp() -> usize {
    5
}
fn default_min_similarity() -> f32 {
    0.5
}
fn default_threshold_votes() -> usize {
    5
}

impl CliConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: CliConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        Ok(config)
    }

    /// Resolve: explicit path, else ./waveprint.toml when present, else
    /// defaults.
    pub fn resolve(explicit: Option<&str>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(Path::new(path)),
            None => {
                let default_path = Path::new("waveprint.toml");
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn query_config(&self) -> waveprint_core::QueryConfig {
        waveprint_core::QueryConfig {
            min_hits_per_fp: self.query.min_hits_per_fp,
            min_similarity: self.query.min_similarity,
            threshold_votes: self.query.threshold_votes,
            ..Default::default()
        }
    }
}
