//! Error types for locsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or validating a [`crate::config::SyncConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error, with the file it came from.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML parse error from an in-memory document.
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// The config parsed but cannot drive a run.
    #[error("invalid config: {0}")]
    Invalid(String),
}
