//! Shared sync pipeline entrypoint.
//!
//! Stages run strictly in sequence: Branch → Upload → Enqueue → Poll →
//! Download → ledger save. The ledger is read before any remote call, so a
//! corrupt ledger fails the run up front. Each stage sees the full output of
//! the previous one. Re-running is safe: identity and dedup make every stage
//! idempotent.

use std::path::Path;

use locsync_core::types::{file_queries, BranchContext, ContentUnit};
use locsync_core::SyncConfig;

use crate::api::{TranslationApi, UploadOptions};
use crate::branch::resolve_branch;
use crate::download::{download, DownloadOptions, DownloadOutcome, OutputResolver};
use crate::enqueue::{enqueue, EnqueueOptions, EnqueueOutcome};
use crate::error::SyncError;
use crate::ledger;
use crate::observer::{Stage, SyncEvent, SyncObserver};
use crate::poll::{poll, PollOptions, PollOutcome};
use crate::retry::RetryPolicy;
use crate::tracker::FileStatusTracker;
use crate::upload::{upload, UploadOutcome};
use crate::vcs::BranchDetector;

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub branch: BranchContext,
    pub upload: UploadOutcome,
    pub enqueue: EnqueueOutcome,
    pub poll: PollOutcome,
    pub download: DownloadOutcome,
    /// Poll and download both succeeded.
    pub success: bool,
}

/// Collaborators for one invocation.
pub struct SyncContext<'a> {
    pub api: &'a dyn TranslationApi,
    pub detector: &'a dyn BranchDetector,
    pub resolver: &'a dyn OutputResolver,
    pub observer: &'a dyn SyncObserver,
}

/// Run the whole pipeline for `units`.
///
/// `project_root` holds the ledger and bounds locale-directory clearing.
pub async fn run(
    ctx: &SyncContext<'_>,
    units: &[ContentUnit],
    config: &SyncConfig,
    project_root: &Path,
) -> Result<SyncReport, SyncError> {
    config.validate()?;
    let target_locales = config.effective_target_locales();
    let retry = RetryPolicy::from(&config.retry);
    let mut versions = ledger::load_at(project_root)?;

    ctx.observer.on_event(&SyncEvent::StageStarted(Stage::Branch));
    let branch = resolve_branch(ctx.api, ctx.detector, &config.branching, ctx.observer).await?;
    finished(ctx, Stage::Branch, true);

    ctx.observer.on_event(&SyncEvent::StageStarted(Stage::Upload));
    let upload_options = UploadOptions {
        source_locale: config.source_locale.clone(),
        model_provider: config.model_provider.clone(),
    };
    let uploaded = upload(ctx.api, units, &branch, &upload_options, &retry, ctx.observer).await?;
    finished(ctx, Stage::Upload, true);

    ctx.observer.on_event(&SyncEvent::StageStarted(Stage::Enqueue));
    let enqueue_options = EnqueueOptions {
        source_locale: config.source_locale.clone(),
        publish: config.publish,
        require_approval: config.require_approval,
        force: config.force,
        model_provider: config.model_provider.clone(),
    };
    let enqueued = enqueue(
        ctx.api,
        &uploaded.references,
        &target_locales,
        &enqueue_options,
        ctx.observer,
    )
    .await?;
    finished(ctx, Stage::Enqueue, true);

    let queries = file_queries(&uploaded.references, &enqueued.locales);

    ctx.observer.on_event(&SyncEvent::StageStarted(Stage::Poll));
    let polled = if config.assume_complete {
        PollOutcome {
            tracker: FileStatusTracker::assume_completed(&queries),
            success: true,
            timed_out: false,
        }
    } else {
        let poll_options = PollOptions {
            timeout: config.timeout(),
            interval: config.poll_interval(),
            force_retranslation: config.force,
        };
        poll(ctx.api, &queries, &enqueued.jobs, &poll_options, ctx.observer).await?
    };
    finished(ctx, Stage::Poll, polled.success);

    ctx.observer.on_event(&SyncEvent::StageStarted(Stage::Download));
    let mut tracker = polled.tracker.clone();
    let download_options = DownloadOptions {
        project_root: project_root.to_path_buf(),
        force_download: config.force_download,
        retry,
        clear_locale_dirs: config.experimental_clear_locale_dirs,
        clear_exclude: config.clear_locale_dirs_exclude.clone(),
    };
    let downloaded = download(
        ctx.api,
        &mut tracker,
        ctx.resolver,
        &mut versions,
        &download_options,
        ctx.observer,
    )
    .await?;
    ledger::save_at(project_root, &versions)?;
    finished(ctx, Stage::Download, downloaded.success);

    let success = polled.success && downloaded.success;
    Ok(SyncReport {
        branch,
        upload: uploaded,
        enqueue: enqueued,
        poll: PollOutcome { tracker, ..polled },
        download: downloaded,
        success,
    })
}

fn finished(ctx: &SyncContext<'_>, stage: Stage, success: bool) {
    ctx.observer
        .on_event(&SyncEvent::StageFinished { stage, success });
}
