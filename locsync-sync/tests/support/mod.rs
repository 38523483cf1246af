//! In-memory translation service and branch detector shared by the
//! integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use locsync_core::types::{
    Branch, BranchId, ContentUnit, DataFormat, FileFormat, FileId, FileMove, FileReference, Job,
    JobId, JobState, OrphanedFile, TranslationKey, VersionId,
};
use locsync_sync::api::{
    BatchDownload, BranchData, DownloadedFile, EnqueueRequest, EnqueueResponse, JobStatusReport,
    MoveResult, SourceFileQuery, SourceUpload, TranslationRecord, UploadOptions,
};
use locsync_sync::vcs::{BranchDetector, DetectedBranches};
use locsync_sync::{ApiError, SyncError, TranslationApi};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("locsync_sync=debug")
        .with_test_writer()
        .try_init();
}

pub fn unit(name: &str, content: &str) -> ContentUnit {
    ContentUnit::new(name, FileFormat::Json, Some(DataFormat::Icu), content, "en")
}

pub fn branch(id: &str, name: &str) -> Branch {
    Branch {
        id: BranchId::from(id),
        name: name.to_string(),
    }
}

/// `<root>/locales/<locale>/<file_name>`
pub fn locale_resolver(root: &Path) -> impl Fn(&str, &str) -> Option<PathBuf> + Send + Sync {
    let root = root.to_path_buf();
    move |file_name: &str, locale: &str| Some(root.join("locales").join(locale).join(file_name))
}

/// What a job does once enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPlan {
    CompleteAfter(Duration),
    Fail,
    Never,
}

#[derive(Debug, Clone)]
struct FakeJob {
    job: Job,
    enqueued_at: Instant,
}

#[derive(Debug, Default)]
struct FakeState {
    branches: Vec<Branch>,
    default_branch: Option<Branch>,
    reject_branch_creation: bool,
    reject_default_creation: bool,
    next_id: usize,
    sources: HashSet<SourceFileQuery>,
    contents: HashMap<(FileId, VersionId), String>,
    names: HashMap<FileId, String>,
    orphans: Vec<OrphanedFile>,
    failing_moves: HashSet<FileId>,
    transient_upload_failures: u32,
    transient_record_failures: u32,
    omit_enqueue_locales: bool,
    plans: HashMap<(String, String), JobPlan>,
    jobs: Vec<FakeJob>,
    translations: HashMap<TranslationKey, String>,
    download_failures: HashMap<TranslationKey, u32>,
}

/// Records of what the engine asked for.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    pub calls: Vec<&'static str>,
    pub branch_queries: Vec<Vec<String>>,
    pub created_branches: Vec<(String, bool)>,
    pub uploads: Vec<Vec<(String, BranchId, Option<BranchId>)>>,
    pub moves: Vec<Vec<FileMove>>,
    pub enqueues: Vec<EnqueueRequest>,
    pub downloads: Vec<(Instant, Vec<TranslationKey>)>,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
    log: Mutex<CallLog>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_branch(self, b: Branch) -> Self {
        self.state.lock().unwrap().default_branch = Some(b);
        self
    }

    pub fn with_branch(self, b: Branch) -> Self {
        self.state.lock().unwrap().branches.push(b);
        self
    }

    pub fn rejecting_branch_creation(self) -> Self {
        self.state.lock().unwrap().reject_branch_creation = true;
        self
    }

    pub fn rejecting_default_creation(self) -> Self {
        self.state.lock().unwrap().reject_default_creation = true;
        self
    }

    pub fn with_orphan(self, u: &ContentUnit) -> Self {
        self.state.lock().unwrap().orphans.push(OrphanedFile {
            file_id: u.file_id.clone(),
            version_id: u.version_id.clone(),
            file_name: u.file_name.clone(),
        });
        self
    }

    pub fn failing_move_to(self, new_file: &ContentUnit) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_moves
            .insert(new_file.file_id.clone());
        self
    }

    pub fn with_transient_upload_failures(self, n: u32) -> Self {
        self.state.lock().unwrap().transient_upload_failures = n;
        self
    }

    /// The next `n` translated-file queries fail with a transport error.
    pub fn with_transient_record_failures(self, n: u32) -> Self {
        self.state.lock().unwrap().transient_record_failures = n;
        self
    }

    /// Enqueue responses leave `locales` empty.
    pub fn omitting_enqueue_locales(self) -> Self {
        self.state.lock().unwrap().omit_enqueue_locales = true;
        self
    }

    /// Pretend `u` was uploaded on `branch_id` in an earlier run.
    pub fn with_source(self, u: &ContentUnit, branch_id: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.sources.insert(SourceFileQuery {
                file_id: u.file_id.clone(),
                version_id: u.version_id.clone(),
                branch_id: BranchId::from(branch_id),
            });
            state
                .contents
                .insert((u.file_id.clone(), u.version_id.clone()), u.content.clone());
            state.names.insert(u.file_id.clone(), u.file_name.clone());
        }
        self
    }

    /// Pretend a translation already exists and is complete.
    pub fn with_translation(self, key: TranslationKey, data: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .translations
            .insert(key, data.to_string());
        self
    }

    pub fn plan(self, file_name: &str, locale: &str, plan: JobPlan) -> Self {
        self.state
            .lock()
            .unwrap()
            .plans
            .insert((file_name.to_string(), locale.to_string()), plan);
        self
    }

    /// `key` fails the next `n` download attempts.
    pub fn failing_download(self, key: TranslationKey, n: u32) -> Self {
        self.state.lock().unwrap().download_failures.insert(key, n);
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.lock().unwrap().clone()
    }

    pub fn uploaded_count(&self) -> usize {
        self.log().uploads.iter().map(Vec::len).sum()
    }

    fn record(&self, call: &'static str) {
        self.log.lock().unwrap().calls.push(call);
    }

    /// Seeded orphans plus every source on `branch_id`.
    fn orphans_on(state: &FakeState, branch_id: &BranchId) -> Vec<OrphanedFile> {
        let mut out = state.orphans.clone();
        for source in state.sources.iter().filter(|s| &s.branch_id == branch_id) {
            if out.iter().any(|o| o.file_id == source.file_id) {
                continue;
            }
            out.push(OrphanedFile {
                file_id: source.file_id.clone(),
                version_id: source.version_id.clone(),
                file_name: state.names.get(&source.file_id).cloned().unwrap_or_default(),
            });
        }
        out
    }

    /// Re-key the old file's source record and translations to the new id.
    fn migrate(state: &mut FakeState, orphan: &OrphanedFile, m: &FileMove, branch_id: &BranchId) {
        state.sources.retain(|s| s.file_id != m.old_file_id);
        state.sources.insert(SourceFileQuery {
            file_id: m.new_file_id.clone(),
            version_id: orphan.version_id.clone(),
            branch_id: branch_id.clone(),
        });
        if let Some(content) = state
            .contents
            .get(&(m.old_file_id.clone(), orphan.version_id.clone()))
            .cloned()
        {
            state
                .contents
                .insert((m.new_file_id.clone(), orphan.version_id.clone()), content);
        }
        state.names.insert(m.new_file_id.clone(), m.new_file_name.clone());
        let moved: Vec<(TranslationKey, String)> = state
            .translations
            .iter()
            .filter(|(k, _)| k.file_id == m.old_file_id)
            .map(|(k, v)| {
                let mut key = k.clone();
                key.file_id = m.new_file_id.clone();
                (key, v.clone())
            })
            .collect();
        state.translations.extend(moved);
        state.orphans.retain(|o| o.file_id != m.old_file_id);
    }

    fn translation_for(state: &FakeState, key: &TranslationKey) -> String {
        let content = state
            .contents
            .get(&(key.file_id.clone(), key.version_id.clone()))
            .cloned()
            .unwrap_or_default();
        format!("[{}] {}", key.locale, content)
    }

    /// Advance jobs whose plan says they are done by now.
    fn settle_jobs(state: &mut FakeState) {
        let now = Instant::now();
        let mut done = Vec::new();
        for fj in &state.jobs {
            let name = state.names.get(&fj.job.file_id).cloned().unwrap_or_default();
            let plan = state
                .plans
                .get(&(name, fj.job.target_locale.clone()))
                .copied()
                .unwrap_or(JobPlan::CompleteAfter(Duration::ZERO));
            if let JobPlan::CompleteAfter(after) = plan {
                if now >= fj.enqueued_at + after {
                    done.push(fj.job.key());
                }
            }
        }
        for key in done {
            if !state.translations.contains_key(&key) {
                let data = Self::translation_for(state, &key);
                state.translations.insert(key, data);
            }
        }
    }

    fn job_state(state: &FakeState, job: &Job) -> JobState {
        let name = state.names.get(&job.file_id).cloned().unwrap_or_default();
        match state.plans.get(&(name, job.target_locale.clone())) {
            Some(JobPlan::Fail) => JobState::Failed,
            _ if state.translations.contains_key(&job.key()) => JobState::Completed,
            _ => JobState::Pending,
        }
    }
}

#[async_trait]
impl TranslationApi for FakeApi {
    async fn query_branch_data(&self, names: &[String]) -> Result<BranchData, ApiError> {
        self.record("query_branch_data");
        self.log.lock().unwrap().branch_queries.push(names.to_vec());
        let state = self.state.lock().unwrap();
        Ok(BranchData {
            branches: state
                .branches
                .iter()
                .filter(|b| names.contains(&b.name))
                .cloned()
                .collect(),
            default_branch: state.default_branch.clone(),
        })
    }

    async fn create_branch(&self, name: &str, is_default: bool) -> Result<Branch, ApiError> {
        self.record("create_branch");
        self.log
            .lock()
            .unwrap()
            .created_branches
            .push((name.to_string(), is_default));
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.branches.iter().find(|b| b.name == name) {
            return Ok(existing.clone());
        }
        if state.reject_branch_creation && !is_default {
            return Err(ApiError::PolicyRejected("branch limit reached".to_string()));
        }
        if state.reject_default_creation && is_default {
            return Err(ApiError::Rejected {
                status: 403,
                message: "forbidden".to_string(),
            });
        }
        state.next_id += 1;
        let created = branch(&format!("b-new-{}", state.next_id), name);
        state.branches.push(created.clone());
        if is_default {
            state.default_branch = Some(created.clone());
        }
        Ok(created)
    }

    async fn query_source_files(
        &self,
        files: &[SourceFileQuery],
    ) -> Result<Vec<SourceFileQuery>, ApiError> {
        self.record("query_source_files");
        let state = self.state.lock().unwrap();
        Ok(files
            .iter()
            .filter(|f| state.sources.contains(*f))
            .cloned()
            .collect())
    }

    async fn query_translated_files(
        &self,
        keys: &[TranslationKey],
    ) -> Result<Vec<TranslationRecord>, ApiError> {
        self.record("query_translated_files");
        let mut state = self.state.lock().unwrap();
        if state.transient_record_failures > 0 {
            state.transient_record_failures -= 1;
            return Err(ApiError::Transport("gateway timeout".to_string()));
        }
        Self::settle_jobs(&mut state);
        Ok(keys
            .iter()
            .map(|k| TranslationRecord {
                key: k.clone(),
                completed_at: state.translations.contains_key(k).then(Utc::now),
            })
            .collect())
    }

    async fn get_orphaned_files(
        &self,
        branch_id: &BranchId,
        known_file_ids: &[FileId],
    ) -> Result<Vec<OrphanedFile>, ApiError> {
        self.record("get_orphaned_files");
        let state = self.state.lock().unwrap();
        Ok(Self::orphans_on(&state, branch_id)
            .into_iter()
            .filter(|o| !known_file_ids.contains(&o.file_id))
            .collect())
    }

    async fn process_file_moves(
        &self,
        moves: &[FileMove],
        branch_id: &BranchId,
    ) -> Result<Vec<MoveResult>, ApiError> {
        self.record("process_file_moves");
        self.log.lock().unwrap().moves.push(moves.to_vec());
        let mut state = self.state.lock().unwrap();
        let mut results = Vec::new();
        for m in moves {
            let orphan = Self::orphans_on(&state, branch_id)
                .into_iter()
                .find(|o| o.file_id == m.old_file_id);
            let success = orphan.is_some() && !state.failing_moves.contains(&m.new_file_id);
            if let (true, Some(orphan)) = (success, orphan) {
                Self::migrate(&mut state, &orphan, m, branch_id);
            }
            results.push(MoveResult {
                old_file_id: m.old_file_id.clone(),
                new_file_id: m.new_file_id.clone(),
                success,
                error: (!success).then(|| "move failed".to_string()),
            });
        }
        Ok(results)
    }

    async fn upload_source_files(
        &self,
        files: &[SourceUpload<'_>],
        _options: &UploadOptions,
    ) -> Result<Vec<FileReference>, ApiError> {
        self.record("upload_source_files");
        let mut state = self.state.lock().unwrap();
        if state.transient_upload_failures > 0 {
            state.transient_upload_failures -= 1;
            return Err(ApiError::Transport("connection reset".to_string()));
        }
        self.log.lock().unwrap().uploads.push(
            files
                .iter()
                .map(|f| {
                    (
                        f.unit.file_name.clone(),
                        f.branch_id.clone(),
                        f.checked_out_branch_id.clone(),
                    )
                })
                .collect(),
        );
        let mut refs = Vec::new();
        for f in files {
            state.sources.insert(SourceFileQuery {
                file_id: f.unit.file_id.clone(),
                version_id: f.unit.version_id.clone(),
                branch_id: f.branch_id.clone(),
            });
            state.contents.insert(
                (f.unit.file_id.clone(), f.unit.version_id.clone()),
                f.unit.content.clone(),
            );
            state
                .names
                .insert(f.unit.file_id.clone(), f.unit.file_name.clone());
            refs.push(f.unit.reference(&f.branch_id));
        }
        Ok(refs)
    }

    async fn enqueue_files(
        &self,
        refs: &[FileReference],
        request: &EnqueueRequest,
    ) -> Result<EnqueueResponse, ApiError> {
        self.record("enqueue_files");
        self.log.lock().unwrap().enqueues.push(request.clone());
        let mut state = self.state.lock().unwrap();
        let mut jobs = Vec::new();
        for r in refs {
            for locale in &request.target_locales {
                let key = r.key(locale);
                if state.translations.contains_key(&key) && !request.force {
                    continue;
                }
                if request.force {
                    state.translations.remove(&key);
                }
                state.next_id += 1;
                let job = Job {
                    job_id: JobId::from(format!("job-{}", state.next_id)),
                    source_file_id: r.file_id.clone(),
                    file_id: r.file_id.clone(),
                    version_id: r.version_id.clone(),
                    branch_id: r.branch_id.clone(),
                    target_locale: locale.clone(),
                    force: request.force,
                    model_provider: request.model_provider.clone(),
                };
                state.jobs.push(FakeJob {
                    job: job.clone(),
                    enqueued_at: Instant::now(),
                });
                jobs.push(job);
            }
        }
        let locales = if state.omit_enqueue_locales {
            Vec::new()
        } else {
            request.target_locales.clone()
        };
        Ok(EnqueueResponse {
            message: format!("enqueued {} job(s)", jobs.len()),
            jobs,
            locales,
        })
    }

    async fn check_job_status(
        &self,
        job_ids: &[JobId],
    ) -> Result<Vec<JobStatusReport>, ApiError> {
        self.record("check_job_status");
        let mut state = self.state.lock().unwrap();
        Self::settle_jobs(&mut state);
        Ok(state
            .jobs
            .iter()
            .filter(|fj| job_ids.contains(&fj.job.job_id))
            .map(|fj| {
                let job_state = Self::job_state(&state, &fj.job);
                JobStatusReport {
                    job_id: fj.job.job_id.clone(),
                    state: job_state,
                    error: (job_state == JobState::Failed).then(|| "model error".to_string()),
                }
            })
            .collect())
    }

    async fn download_files(&self, keys: &[TranslationKey]) -> Result<BatchDownload, ApiError> {
        self.record("download_files");
        self.log
            .lock()
            .unwrap()
            .downloads
            .push((Instant::now(), keys.to_vec()));
        let mut state = self.state.lock().unwrap();
        let mut batch = BatchDownload::default();
        for key in keys {
            if let Some(remaining) = state.download_failures.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    batch.failed.push(key.clone());
                    continue;
                }
            }
            match state.translations.get(key) {
                Some(data) => batch.files.push(DownloadedFile {
                    key: key.clone(),
                    data: data.clone(),
                }),
                None => batch.failed.push(key.clone()),
            }
        }
        Ok(batch)
    }
}

/// Detector with canned answers that counts how often it is asked.
#[derive(Debug)]
pub struct StaticDetector {
    answer: Result<DetectedBranches, String>,
    calls: AtomicUsize,
}

impl StaticDetector {
    pub fn found(current: &str, incoming: &[&str], checked_out: &[&str]) -> Self {
        Self {
            answer: Ok(DetectedBranches {
                current: Some(current.to_string()),
                incoming: incoming.iter().map(|s| s.to_string()).collect(),
                checked_out: checked_out.iter().map(|s| s.to_string()).collect(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: Err("not a git repository".to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BranchDetector for StaticDetector {
    async fn current_branch(&self) -> Result<Option<String>, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(found) => Ok(found.current.clone()),
            Err(msg) => Err(SyncError::Vcs(msg.clone())),
        }
    }

    async fn incoming_branches(&self) -> Result<Vec<String>, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(found) => Ok(found.incoming.clone()),
            Err(msg) => Err(SyncError::Vcs(msg.clone())),
        }
    }

    async fn checked_out_branches(&self) -> Result<Vec<String>, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(found) => Ok(found.checked_out.clone()),
            Err(msg) => Err(SyncError::Vcs(msg.clone())),
        }
    }
}
