//! Poll stage: wait for translation jobs until every key settles or the
//! timeout passes.
//!
//! Per key: in progress → completed | failed, or still in progress when the
//! timeout fires (terminal for this run only). Keys backed by a job are
//! resolved from job status; keys without a job (the server skipped
//! unchanged content) are resolved from translated-file records. Unless
//! `force_retranslation` is set, an existing completed record also resolves a
//! job-backed key.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use locsync_core::types::{FileQuery, Job, JobId, JobState, TranslationKey};

use crate::api::{JobStatusReport, TranslationApi, TranslationRecord};
use crate::error::{ApiError, SyncError};
use crate::observer::{SyncEvent, SyncObserver};
use crate::tracker::{FileStatus, FileStatusTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
    pub force_retranslation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub tracker: FileStatusTracker,
    /// No key failed and the loop did not time out.
    pub success: bool,
    pub timed_out: bool,
}

pub async fn poll(
    api: &dyn TranslationApi,
    queries: &[FileQuery],
    jobs: &[Job],
    options: &PollOptions,
    observer: &dyn SyncObserver,
) -> Result<PollOutcome, SyncError> {
    let mut tracker = FileStatusTracker::from_queries(queries);

    let mut job_by_key: HashMap<TranslationKey, JobId> = HashMap::new();
    let mut key_by_job: HashMap<JobId, TranslationKey> = HashMap::new();
    for job in jobs {
        let key = job.key();
        if tracker.status(&key).is_none() {
            tracing::debug!(job = %job.job_id, key = %key, "ignoring job for untracked key");
            continue;
        }
        job_by_key.insert(key.clone(), job.job_id.clone());
        key_by_job.insert(job.job_id.clone(), key);
    }

    let deadline = Instant::now() + options.timeout;
    let mut timed_out = false;
    let mut round = 0u32;

    while !tracker.is_settled() {
        round += 1;
        let pending = tracker.in_progress();
        let job_ids: Vec<JobId> = pending
            .iter()
            .filter_map(|k| job_by_key.get(k).cloned())
            .collect();
        let record_keys: Vec<TranslationKey> = pending
            .into_iter()
            .filter(|k| !options.force_retranslation || !job_by_key.contains_key(k))
            .collect();

        let (reports, records) = tokio::join!(
            job_status(api, &job_ids),
            translated_records(api, &record_keys)
        );

        let mut resolved = Vec::new();
        match reports {
            Ok(reports) => apply_reports(&mut tracker, &key_by_job, reports, &mut resolved),
            Err(e) => tolerate(e, "job status query failed")?,
        }
        match records {
            Ok(records) => apply_records(&mut tracker, records, &mut resolved),
            Err(e) => tolerate(e, "translated file query failed")?,
        }
        for (key, status) in resolved {
            observer.on_event(&SyncEvent::KeyResolved { key, status });
        }

        tracing::debug!(
            round,
            completed = tracker.count(FileStatus::Completed),
            failed = tracker.count(FileStatus::Failed),
            pending = tracker.count(FileStatus::InProgress),
            "poll round"
        );

        if tracker.is_settled() {
            break;
        }
        let now = Instant::now();
        if now >= deadline {
            timed_out = true;
            break;
        }
        tokio::time::sleep(options.interval.min(deadline - now)).await;
    }

    let failed = tracker.count(FileStatus::Failed);
    if timed_out {
        tracing::warn!(
            pending = tracker.count(FileStatus::InProgress),
            completed = tracker.count(FileStatus::Completed),
            "timed out waiting for translations"
        );
    }
    if failed > 0 {
        tracing::warn!(failed, "some translations failed");
    }

    Ok(PollOutcome {
        success: !timed_out && failed == 0,
        timed_out,
        tracker,
    })
}

async fn job_status(
    api: &dyn TranslationApi,
    job_ids: &[JobId],
) -> Result<Vec<JobStatusReport>, ApiError> {
    if job_ids.is_empty() {
        return Ok(Vec::new());
    }
    api.check_job_status(job_ids).await
}

async fn translated_records(
    api: &dyn TranslationApi,
    keys: &[TranslationKey],
) -> Result<Vec<TranslationRecord>, ApiError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    api.query_translated_files(keys).await
}

fn apply_reports(
    tracker: &mut FileStatusTracker,
    key_by_job: &HashMap<JobId, TranslationKey>,
    reports: Vec<JobStatusReport>,
    resolved: &mut Vec<(TranslationKey, FileStatus)>,
) {
    for report in reports.into_iter().filter(|r| r.state.is_terminal()) {
        let Some(key) = key_by_job.get(&report.job_id) else {
            continue;
        };
        if report.state == JobState::Completed {
            if tracker.move_key(key, FileStatus::InProgress, FileStatus::Completed) {
                resolved.push((key.clone(), FileStatus::Completed));
            }
        } else if tracker.fail(key, report.error) {
            tracing::warn!(key = %key, "translation job failed");
            resolved.push((key.clone(), FileStatus::Failed));
        }
    }
}

fn apply_records(
    tracker: &mut FileStatusTracker,
    records: Vec<TranslationRecord>,
    resolved: &mut Vec<(TranslationKey, FileStatus)>,
) {
    for record in records {
        if record.completed_at.is_none() {
            continue;
        }
        if tracker.move_key(&record.key, FileStatus::InProgress, FileStatus::Completed) {
            resolved.push((record.key, FileStatus::Completed));
        }
    }
}

/// Transient query failures are retried on the next round; others abort.
fn tolerate(e: ApiError, what: &str) -> Result<(), SyncError> {
    if e.is_transient() {
        tracing::warn!(error = %e, "{what}; retrying next round");
        return Ok(());
    }
    Err(e.into())
}
