//! locsync core library: domain types, content identity, configuration.
//!
//! - [`types`]: newtype ids, content units, references, jobs, ledger entries
//! - [`identity`]: `compute_file_id` / `compute_version_id`
//! - [`config`]: [`SyncConfig`] and its YAML loader
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use config::{BranchingConfig, RetryConfig, SyncConfig};
pub use error::ConfigError;
pub use identity::{compute_file_id, compute_version_id, sha256_hex};
pub use types::{
    file_queries, Branch, BranchContext, BranchId, ContentUnit, DataFormat, FileFormat, FileId,
    FileMove, FileQuery, FileReference, Job, JobId, JobState, OrphanedFile, TranslationKey,
    VersionId, VersionLedgerEntry,
};
