//! Upload stage: send only the source content the server does not have.
//!
//! Units are partitioned three ways:
//! - already known: the server holds this exact (file, version, branch);
//! - moved: same content as an orphaned server file, migrated server-side;
//! - needs upload: everything else.
//!
//! Every unit lands in exactly one bucket, so re-running with unchanged
//! content uploads nothing.

use std::collections::HashSet;

use locsync_core::types::{BranchContext, ContentUnit, FileId, FileReference};

use crate::api::{SourceFileQuery, SourceUpload, TranslationApi, UploadOptions};
use crate::error::SyncError;
use crate::moves::detect_moves;
use crate::observer::{warn, SyncEvent, SyncObserver};
use crate::retry::RetryPolicy;

/// Upload stage result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Uploaded references followed by references synthesised for skipped units.
    pub references: Vec<FileReference>,
    pub uploaded: usize,
    pub already_known: usize,
    pub moved: usize,
    /// Detected moves the server did not apply; those files were uploaded.
    pub failed_moves: usize,
}

pub async fn upload(
    api: &dyn TranslationApi,
    units: &[ContentUnit],
    branch: &BranchContext,
    options: &UploadOptions,
    retry: &RetryPolicy,
    observer: &dyn SyncObserver,
) -> Result<UploadOutcome, SyncError> {
    if options.source_locale.trim().is_empty() {
        if let Some(unit) = units.iter().find(|u| u.locale.trim().is_empty()) {
            return Err(SyncError::MissingSourceLocale {
                file_name: unit.file_name.clone(),
            });
        }
    }
    if units.is_empty() {
        return Ok(UploadOutcome::default());
    }

    let branch_id = &branch.current_branch.id;
    let queries: Vec<SourceFileQuery> = units
        .iter()
        .map(|u| SourceFileQuery {
            file_id: u.file_id.clone(),
            version_id: u.version_id.clone(),
            branch_id: branch_id.clone(),
        })
        .collect();
    let known_ids: Vec<FileId> = units.iter().map(|u| u.file_id.clone()).collect();

    let (existing, orphans) = tokio::join!(
        api.query_source_files(&queries),
        api.get_orphaned_files(branch_id, &known_ids)
    );
    let existing: HashSet<SourceFileQuery> = existing?.into_iter().collect();
    let orphans = orphans.unwrap_or_else(|e| {
        warn(
            observer,
            format!("could not list orphaned files ({e}); skipping move detection"),
        );
        Vec::new()
    });

    // Only units the server doesn't already hold can be moves.
    let candidates = units
        .iter()
        .zip(&queries)
        .filter(|(_, q)| !existing.contains(*q))
        .map(|(u, _)| u);
    let moves = detect_moves(candidates, &orphans);

    let mut migrated: HashSet<FileId> = HashSet::new();
    if !moves.is_empty() {
        match api.process_file_moves(&moves, branch_id).await {
            Ok(results) => {
                for r in results.into_iter().filter(|r| r.success) {
                    migrated.insert(r.new_file_id);
                }
            }
            Err(e) => tracing::warn!(error = %e, "file move request failed"),
        }
    }
    let failed_moves = moves
        .iter()
        .filter(|m| !migrated.contains(&m.new_file_id))
        .count();
    if failed_moves > 0 {
        warn(
            observer,
            format!("{failed_moves} file move(s) failed; uploading those files instead"),
        );
    }

    let incoming_branch_id = branch.incoming_branch.as_ref().map(|b| b.id.clone());
    let checked_out_branch_id = branch.checked_out_branch.as_ref().map(|b| b.id.clone());

    let mut outcome = UploadOutcome {
        failed_moves,
        ..UploadOutcome::default()
    };
    let mut skipped_refs = Vec::new();
    let mut to_upload = Vec::new();
    for (unit, query) in units.iter().zip(&queries) {
        if existing.contains(query) {
            outcome.already_known += 1;
            skipped_refs.push(unit.reference(branch_id));
        } else if migrated.contains(&unit.file_id) {
            outcome.moved += 1;
            skipped_refs.push(unit.reference(branch_id));
        } else {
            to_upload.push(SourceUpload {
                unit,
                branch_id: branch_id.clone(),
                incoming_branch_id: incoming_branch_id.clone(),
                checked_out_branch_id: checked_out_branch_id.clone(),
            });
        }
    }

    if !to_upload.is_empty() {
        outcome.references = upload_with_retry(api, &to_upload, options, retry).await?;
        outcome.uploaded = to_upload.len();
    }
    outcome.references.extend(skipped_refs);

    tracing::info!(
        uploaded = outcome.uploaded,
        already_known = outcome.already_known,
        moved = outcome.moved,
        "upload stage finished"
    );
    observer.on_event(&SyncEvent::FilesUploaded {
        count: outcome.uploaded,
    });
    if outcome.moved > 0 {
        observer.on_event(&SyncEvent::FilesMoved {
            count: outcome.moved,
        });
    }
    Ok(outcome)
}

async fn upload_with_retry(
    api: &dyn TranslationApi,
    files: &[SourceUpload<'_>],
    options: &UploadOptions,
    retry: &RetryPolicy,
) -> Result<Vec<FileReference>, SyncError> {
    let mut retries = retry.retries();
    loop {
        match api.upload_source_files(files, options).await {
            Ok(refs) => return Ok(refs),
            Err(e) if e.is_transient() => {
                let Some(attempt) = retries.next() else {
                    return Err(e.into());
                };
                let delay = retry.delay_for_attempt(attempt);
                tracing::warn!(error = %e, attempt, ?delay, "upload failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
