//! # locsync-sync
//!
//! Synchronization engine between a project's source content and a remote
//! translation service.
//!
//! Call [`pipeline::run`] for a full Branch → Upload → Enqueue → Poll →
//! Download pass, or drive the stages individually ([`resolve_branch`],
//! [`upload`], [`enqueue`], [`poll`], [`download`]). Every stage takes the
//! [`TranslationApi`] client explicitly.

pub mod api;
pub mod branch;
pub mod download;
pub mod enqueue;
pub mod error;
pub mod ledger;
pub mod moves;
pub mod observer;
pub mod pipeline;
pub mod poll;
pub mod retry;
pub mod tracker;
pub mod upload;
pub mod vcs;
pub mod writer;

pub use api::TranslationApi;
pub use branch::resolve_branch;
pub use download::{download, DownloadOptions, DownloadOutcome, OutputResolver};
pub use enqueue::{enqueue, EnqueueOptions, EnqueueOutcome};
pub use error::{ApiError, SyncError};
pub use ledger::VersionLedger;
pub use moves::detect_moves;
pub use observer::{NoopObserver, RecordingObserver, Stage, SyncEvent, SyncObserver};
pub use pipeline::{SyncContext, SyncReport};
pub use poll::{poll, PollOptions, PollOutcome};
pub use retry::RetryPolicy;
pub use tracker::{FileStatus, FileStatusTracker};
pub use upload::{upload, UploadOutcome};
pub use vcs::{BranchDetector, DetectedBranches, GitBranchDetector};
