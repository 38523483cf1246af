//! Error types for locsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use locsync_core::ConfigError;

/// Failures reported by a [`crate::api::TranslationApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Network or server hiccup; safe to retry.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service refused on policy grounds (plan limits and the like).
    #[error("rejected by policy: {0}")]
    PolicyRejected(String),

    /// Any other non-retryable refusal.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// Invocation-wide failures. Per-file problems are reported in stage outcomes
/// instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (ledger).
    #[error("ledger JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("could not resolve a branch: {0}")]
    BranchUnresolved(String),

    #[error("no source locale for {file_name}")]
    MissingSourceLocale { file_name: String },

    #[error("vcs error: {0}")]
    Vcs(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
