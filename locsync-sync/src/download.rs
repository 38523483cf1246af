//! Download stage: fetch completed translations and write them to disk.
//!
//! 1. Re-query translated-file records for `completed` keys only.
//! 2. Keep records with a completion timestamp.
//! 3. Resolve output paths; keys the resolver declines move to `skipped`.
//! 4. Optionally clear the targeted locale directories (once, before writes).
//! 5. Batch-download, retrying only the failed subset with backoff.
//! 6. Write atomically and record each delivery in the ledger.
//!
//! Per-file failures are counted, not raised. The stage fails only when
//! nothing succeeded and something failed.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;

use locsync_core::types::{TranslationKey, VersionLedgerEntry};

use crate::api::{BatchDownload, DownloadedFile, TranslationApi, TranslationRecord};
use crate::error::SyncError;
use crate::ledger::VersionLedger;
use crate::observer::{warn, SyncEvent, SyncObserver};
use crate::retry::RetryPolicy;
use crate::tracker::{FileStatus, FileStatusTracker};
use crate::writer::{
    atomic_write, build_exclude_set, clear_locale_dirs, file_digest, locale_dir, WriteResult,
};

/// Maps a source file and target locale to the path its translation is
/// written to. `None` means the file is not part of the configured output.
pub trait OutputResolver: Send + Sync {
    fn resolve_output_path(&self, source_file_name: &str, locale: &str) -> Option<PathBuf>;
}

impl<F> OutputResolver for F
where
    F: Fn(&str, &str) -> Option<PathBuf> + Send + Sync,
{
    fn resolve_output_path(&self, source_file_name: &str, locale: &str) -> Option<PathBuf> {
        self(source_file_name, locale)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub project_root: PathBuf,
    pub force_download: bool,
    pub retry: RetryPolicy,
    pub clear_locale_dirs: bool,
    /// Globs, relative to `project_root`, never removed by clearing.
    pub clear_exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub success: bool,
    pub written: usize,
    /// Downloaded, but the file on disk already had these bytes.
    pub unchanged: usize,
    /// Not downloaded: the ledger and the file on disk agree.
    pub up_to_date: usize,
    /// Declined by the output resolver.
    pub skipped: usize,
    /// Completed in the tracker but without a completion timestamp remotely.
    pub not_ready: usize,
    pub cleared: usize,
    pub failed: Vec<TranslationKey>,
}

pub async fn download(
    api: &dyn TranslationApi,
    tracker: &mut FileStatusTracker,
    resolver: &dyn OutputResolver,
    ledger: &mut VersionLedger,
    options: &DownloadOptions,
    observer: &dyn SyncObserver,
) -> Result<DownloadOutcome, SyncError> {
    let mut outcome = DownloadOutcome::default();
    let completed = tracker.completed();
    if completed.is_empty() {
        outcome.success = true;
        return Ok(outcome);
    }

    let records = query_with_retry(api, &completed, &options.retry).await?;
    let ready: HashSet<TranslationKey> = records
        .into_iter()
        .filter(|r| r.completed_at.is_some())
        .map(|r| r.key)
        .collect();

    let mut targets: Vec<(TranslationKey, PathBuf)> = Vec::new();
    for key in completed {
        if !ready.contains(&key) {
            outcome.not_ready += 1;
            continue;
        }
        let Some(file_name) = tracker.get(&key).map(|f| f.file_name.clone()) else {
            continue;
        };
        match resolver.resolve_output_path(&file_name, &key.locale) {
            Some(path) => targets.push((key, path)),
            None => {
                tracker.move_key(&key, FileStatus::Completed, FileStatus::Skipped);
                outcome.skipped += 1;
            }
        }
    }

    if options.clear_locale_dirs {
        let dirs: BTreeSet<PathBuf> = targets
            .iter()
            .filter_map(|(key, path)| locale_dir(path, &key.locale))
            .collect();
        let exclude = build_exclude_set(&options.clear_exclude)?;
        outcome.cleared = clear_locale_dirs(&dirs, &options.project_root, &exclude);
    }

    // Clearing removes what the ledger vouches for, so only skip without it.
    let skip_current = !options.force_download && !options.clear_locale_dirs;
    let mut paths: HashMap<TranslationKey, PathBuf> = HashMap::new();
    for (key, path) in targets {
        if skip_current && is_up_to_date(ledger, &key, &path) {
            outcome.up_to_date += 1;
            continue;
        }
        paths.insert(key, path);
    }

    let mut wanted: Vec<TranslationKey> = paths.keys().cloned().collect();
    wanted.sort();
    let (files, failed) = fetch_with_retry(api, wanted, &options.retry).await;
    outcome.failed = failed;

    for file in files {
        let Some(path) = paths.get(&file.key) else {
            continue;
        };
        match atomic_write(path, &file.data) {
            Ok(result) => {
                match &result {
                    WriteResult::Written { .. } => outcome.written += 1,
                    WriteResult::Unchanged { .. } => outcome.unchanged += 1,
                }
                ledger.record(VersionLedgerEntry {
                    file_id: file.key.file_id.clone(),
                    branch_id: file.key.branch_id.clone(),
                    version_id: file.key.version_id.clone(),
                    locale: file.key.locale.clone(),
                    updated_at: Utc::now(),
                    post_process_hash: result.digest().to_string(),
                });
                observer.on_event(&SyncEvent::FileWritten {
                    key: file.key,
                    path: path.clone(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %file.key, "failed to write translation");
                outcome.failed.push(file.key);
            }
        }
    }

    if !outcome.failed.is_empty() {
        warn(
            observer,
            format!("{} translation(s) could not be downloaded", outcome.failed.len()),
        );
    }
    let delivered = outcome.written + outcome.unchanged + outcome.up_to_date;
    outcome.success = !(delivered == 0 && !outcome.failed.is_empty());
    tracing::info!(
        written = outcome.written,
        unchanged = outcome.unchanged,
        up_to_date = outcome.up_to_date,
        skipped = outcome.skipped,
        failed = outcome.failed.len(),
        "download stage finished"
    );
    Ok(outcome)
}

/// An unreadable file is never up to date; the write that follows reports it.
fn is_up_to_date(ledger: &VersionLedger, key: &TranslationKey, path: &Path) -> bool {
    let Some(record) =
        ledger.get(&key.branch_id, &key.file_id, &key.version_id, &key.locale)
    else {
        return false;
    };
    match file_digest(path) {
        Ok(digest) => digest.as_deref() == Some(record.post_process_hash.as_str()),
        Err(e) => {
            tracing::warn!(error = %e, key = %key, "could not hash existing translation");
            false
        }
    }
}

/// Completion records for `keys`, retrying transient failures.
async fn query_with_retry(
    api: &dyn TranslationApi,
    keys: &[TranslationKey],
    policy: &RetryPolicy,
) -> Result<Vec<TranslationRecord>, SyncError> {
    let mut retries = policy.retries();
    loop {
        match api.query_translated_files(keys).await {
            Ok(records) => return Ok(records),
            Err(e) if e.is_transient() => {
                let Some(attempt) = retries.next() else {
                    return Err(e.into());
                };
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(error = %e, attempt, ?delay, "completion query failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Download `keys`, retrying only the ones that failed. Returns the fetched
/// files and the keys still missing once retries run out.
async fn fetch_with_retry(
    api: &dyn TranslationApi,
    keys: Vec<TranslationKey>,
    policy: &RetryPolicy,
) -> (Vec<DownloadedFile>, Vec<TranslationKey>) {
    let mut fetched = Vec::new();
    let mut pending = keys;
    let mut retries = policy.retries();

    while !pending.is_empty() {
        let batch = match api.download_files(&pending).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, files = pending.len(), "batch download failed");
                BatchDownload::default()
            }
        };

        let requested: HashSet<&TranslationKey> = pending.iter().collect();
        let mut got: HashSet<TranslationKey> = HashSet::new();
        for file in batch.files {
            if requested.contains(&file.key) && got.insert(file.key.clone()) {
                fetched.push(file);
            }
        }
        pending.retain(|k| !got.contains(k));
        if pending.is_empty() {
            break;
        }

        let Some(attempt) = retries.next() else {
            break;
        };
        let delay = policy.delay_for_attempt(attempt);
        tracing::debug!(attempt, remaining = pending.len(), ?delay, "retrying failed downloads");
        tokio::time::sleep(delay).await;
    }
    (fetched, pending)
}
