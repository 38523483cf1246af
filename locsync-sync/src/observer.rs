//! Progress reporting, kept apart from stage logic.
//!
//! Stages emit [`SyncEvent`]s to an injected [`SyncObserver`]; terminal UIs or
//! CI annotators subscribe by implementing the trait.

use std::path::PathBuf;
use std::sync::Mutex;

use locsync_core::types::TranslationKey;

use crate::tracker::FileStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Branch,
    Upload,
    Enqueue,
    Poll,
    Download,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    StageStarted(Stage),
    StageFinished { stage: Stage, success: bool },
    FilesUploaded { count: usize },
    FilesMoved { count: usize },
    JobsEnqueued { count: usize },
    KeyResolved { key: TranslationKey, status: FileStatus },
    FileWritten { key: TranslationKey, path: PathBuf },
    Warning(String),
}

pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {
    fn on_event(&self, _event: &SyncEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<SyncEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SyncEvent::Warning(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }
}

impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: &SyncEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Log a warning and forward it to the observer.
pub(crate) fn warn(observer: &dyn SyncObserver, message: String) {
    tracing::warn!("{message}");
    observer.on_event(&SyncEvent::Warning(message));
}
