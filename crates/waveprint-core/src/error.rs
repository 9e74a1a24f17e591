//! Error types for the fingerprinting engine
//!
//! All fallible operations return tagged errors. The engine never retries
//! and never logs; callers decide how to recover.

use thiserror::Error;

/// Top-level error returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration rejected at command build time. Fatal.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// An audio or spectrum provider failed. No partial state was produced.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A model-store operation failed. Inserts are idempotent per
    /// `(track_ref, start_offset)`, so callers may retry.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Persisted schema identifier disagrees with the runtime. Fatal.
    #[error("schema mismatch: runtime {runtime}, persisted {persisted}")]
    SchemaMismatch { runtime: String, persisted: String },

    /// The command observed its cancellation token and discarded all work.
    #[error("command cancelled")]
    Cancelled,
}

impl EngineError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Failure raised by an audio or spectrum provider.
#[derive(Debug, Error)]
#[error("provider failure: {message}")]
pub struct ProviderError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Failure raised by a model-store backend.
#[derive(Debug, Error)]
#[error("store failure: {message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_wraps_into_engine_error() {
        let err: EngineError = ProviderError::new("decode failed").into();
        assert!(matches!(err, EngineError::Provider(_)));
        assert!(err.to_string().contains("decode failed"));
    }

    #[test]
    fn store_error_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = StoreError::with_source("write failed", io);
        let source = std::error::Error::source(&err).expect("source should be set");
        assert!(source.to_string().contains("disk gone"));
    }
}
