//! Per-key status tracking for one invocation.
//!
//! Every key lives in exactly one of four collections: completed, in
//! progress, failed, skipped. The tracker stores a single status per key, so
//! membership is exclusive by construction; transitions go through
//! [`FileStatusTracker::move_key`], which only fires from the expected state.

use std::collections::BTreeMap;

use locsync_core::types::{FileQuery, TranslationKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Completed,
    InProgress,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    pub file_name: String,
    pub status: FileStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStatusTracker {
    files: BTreeMap<TranslationKey, TrackedFile>,
}

impl FileStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every query starts in progress.
    pub fn from_queries(queries: &[FileQuery]) -> Self {
        Self::with_status(queries, FileStatus::InProgress)
    }

    /// Staging shortcut: treat every query as already completed.
    pub fn assume_completed(queries: &[FileQuery]) -> Self {
        Self::with_status(queries, FileStatus::Completed)
    }

    fn with_status(queries: &[FileQuery], status: FileStatus) -> Self {
        let mut tracker = Self::new();
        for q in queries {
            tracker.insert(q, status);
        }
        tracker
    }

    /// Insert or overwrite a key.
    pub fn insert(&mut self, query: &FileQuery, status: FileStatus) {
        self.files.insert(
            query.key.clone(),
            TrackedFile {
                file_name: query.file_name.clone(),
                status,
                error: None,
            },
        );
    }

    /// Move `key` from `from` to `to`. Returns false (and changes nothing) if
    /// the key is unknown or not currently in `from`.
    pub fn move_key(&mut self, key: &TranslationKey, from: FileStatus, to: FileStatus) -> bool {
        match self.files.get_mut(key) {
            Some(file) if file.status == from => {
                file.status = to;
                true
            }
            _ => false,
        }
    }

    /// Move an in-progress key to failed, keeping the reason.
    pub fn fail(&mut self, key: &TranslationKey, error: Option<String>) -> bool {
        if !self.move_key(key, FileStatus::InProgress, FileStatus::Failed) {
            return false;
        }
        if let Some(file) = self.files.get_mut(key) {
            file.error = error;
        }
        true
    }

    pub fn status(&self, key: &TranslationKey) -> Option<FileStatus> {
        self.files.get(key).map(|f| f.status)
    }

    pub fn get(&self, key: &TranslationKey) -> Option<&TrackedFile> {
        self.files.get(key)
    }

    /// Keys currently in `status`, in key order.
    pub fn keys(&self, status: FileStatus) -> Vec<TranslationKey> {
        self.files
            .iter()
            .filter(|(_, f)| f.status == status)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.values().filter(|f| f.status == status).count()
    }

    pub fn completed(&self) -> Vec<TranslationKey> {
        self.keys(FileStatus::Completed)
    }

    pub fn in_progress(&self) -> Vec<TranslationKey> {
        self.keys(FileStatus::InProgress)
    }

    pub fn failed(&self) -> Vec<TranslationKey> {
        self.keys(FileStatus::Failed)
    }

    pub fn skipped(&self) -> Vec<TranslationKey> {
        self.keys(FileStatus::Skipped)
    }

    /// True once nothing is in progress.
    pub fn is_settled(&self) -> bool {
        self.files.values().all(|f| f.status != FileStatus::InProgress)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TranslationKey, &TrackedFile)> {
        self.files.iter()
    }
}
