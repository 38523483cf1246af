//! Enqueue stage: one request for all references across all target locales.
//!
//! Not retried here. A duplicate enqueue is harmless because the server
//! dedups by content hash.

use locsync_core::types::{FileReference, Job};

use crate::api::{EnqueueRequest, TranslationApi};
use crate::error::SyncError;
use crate::observer::{SyncEvent, SyncObserver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub source_locale: String,
    pub publish: bool,
    pub require_approval: bool,
    /// Bypass the server's unchanged-content skip.
    pub force: bool,
    pub model_provider: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOutcome {
    pub jobs: Vec<Job>,
    pub locales: Vec<String>,
    pub message: String,
}

pub async fn enqueue(
    api: &dyn TranslationApi,
    refs: &[FileReference],
    target_locales: &[String],
    options: &EnqueueOptions,
    observer: &dyn SyncObserver,
) -> Result<EnqueueOutcome, SyncError> {
    if refs.is_empty() || target_locales.is_empty() {
        return Ok(EnqueueOutcome {
            jobs: Vec::new(),
            locales: target_locales.to_vec(),
            message: "nothing to enqueue".to_string(),
        });
    }

    let request = EnqueueRequest {
        source_locale: options.source_locale.clone(),
        target_locales: target_locales.to_vec(),
        publish: options.publish,
        require_approval: options.require_approval,
        model_provider: options.model_provider.clone(),
        force: options.force,
    };
    let response = api.enqueue_files(refs, &request).await?;

    tracing::info!(
        files = refs.len(),
        locales = response.locales.len(),
        jobs = response.jobs.len(),
        message = %response.message,
        "enqueued translation jobs"
    );
    observer.on_event(&SyncEvent::JobsEnqueued {
        count: response.jobs.len(),
    });

    let locales = if response.locales.is_empty() {
        request.target_locales
    } else {
        response.locales
    };
    Ok(EnqueueOutcome {
        jobs: response.jobs,
        locales,
        message: response.message,
    })
}
