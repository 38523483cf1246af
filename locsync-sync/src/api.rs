//! The remote translation service, as seen by the sync stages.
//!
//! One client instance is built per invocation and passed by reference to
//! every stage. Wire encoding belongs to the implementor; this module only
//! fixes the request and response shapes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use locsync_core::types::{
    Branch, BranchId, ContentUnit, FileId, FileMove, FileReference, Job, JobId, JobState,
    OrphanedFile, TranslationKey, VersionId,
};

use crate::error::ApiError;

/// Branch registry lookup result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchData {
    pub branches: Vec<Branch>,
    pub default_branch: Option<Branch>,
}

impl BranchData {
    pub fn find(&self, name: &str) -> Option<&Branch> {
        self.branches
            .iter()
            .chain(self.default_branch.iter())
            .find(|b| b.name == name)
    }
}

/// A (file, version, branch) triple whose source record may exist remotely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileQuery {
    pub file_id: FileId,
    pub version_id: VersionId,
    pub branch_id: BranchId,
}

/// Translation record for one key. `completed_at` is `None` until the
/// translated artifact is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    pub key: TranslationKey,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Server answer for one requested move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResult {
    pub old_file_id: FileId,
    pub new_file_id: FileId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A source file to upload, borrowed from the caller's content unit.
#[derive(Debug, Clone)]
pub struct SourceUpload<'a> {
    pub unit: &'a ContentUnit,
    pub branch_id: BranchId,
    pub incoming_branch_id: Option<BranchId>,
    pub checked_out_branch_id: Option<BranchId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOptions {
    pub source_locale: String,
    pub model_provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub source_locale: String,
    pub target_locales: Vec<String>,
    pub publish: bool,
    pub require_approval: bool,
    pub model_provider: Option<String>,
    pub force: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub jobs: Vec<Job>,
    pub locales: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    pub job_id: JobId,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub key: TranslationKey,
    pub data: String,
}

/// Result of one batch download call. Keys missing from both lists count as
/// failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDownload {
    pub files: Vec<DownloadedFile>,
    pub failed: Vec<TranslationKey>,
}

/// Remote operations consumed by the sync stages.
#[async_trait]
pub trait TranslationApi: Send + Sync {
    /// Look up branches by name; also reports the project default branch.
    async fn query_branch_data(&self, names: &[String]) -> Result<BranchData, ApiError>;

    /// Create a branch, or fetch it if it already exists.
    async fn create_branch(&self, name: &str, is_default: bool) -> Result<Branch, ApiError>;

    /// Return the subset of `files` the server already holds.
    async fn query_source_files(
        &self,
        files: &[SourceFileQuery],
    ) -> Result<Vec<SourceFileQuery>, ApiError>;

    async fn query_translated_files(
        &self,
        keys: &[TranslationKey],
    ) -> Result<Vec<TranslationRecord>, ApiError>;

    /// Files on `branch_id` whose ids are not in `known_file_ids`.
    async fn get_orphaned_files(
        &self,
        branch_id: &BranchId,
        known_file_ids: &[FileId],
    ) -> Result<Vec<OrphanedFile>, ApiError>;

    async fn process_file_moves(
        &self,
        moves: &[FileMove],
        branch_id: &BranchId,
    ) -> Result<Vec<MoveResult>, ApiError>;

    async fn upload_source_files(
        &self,
        files: &[SourceUpload<'_>],
        options: &UploadOptions,
    ) -> Result<Vec<FileReference>, ApiError>;

    async fn enqueue_files(
        &self,
        refs: &[FileReference],
        request: &EnqueueRequest,
    ) -> Result<EnqueueResponse, ApiError>;

    async fn check_job_status(&self, job_ids: &[JobId])
        -> Result<Vec<JobStatusReport>, ApiError>;

    async fn download_files(&self, keys: &[TranslationKey]) -> Result<BatchDownload, ApiError>;
}
