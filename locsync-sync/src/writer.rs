//! Atomic writer for downloaded translations, and locale-directory clearing.
//!
//! ## `atomic_write`
//!
//! 1. Hash the content (SHA-256).
//! 2. If the file on disk already hashes the same, leave it untouched.
//! 3. Write to `<path>.locsync.tmp`.
//! 4. Rename to the final path (atomic on POSIX).

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use locsync_core::sha256_hex;

use crate::error::{io_err, SyncError};

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf, digest: String },
    /// On-disk content already matched.
    Unchanged { path: PathBuf, digest: String },
}

impl WriteResult {
    pub fn digest(&self) -> &str {
        match self {
            WriteResult::Written { digest, .. } | WriteResult::Unchanged { digest, .. } => digest,
        }
    }
}

/// Atomically write `content` to `path`, creating parent directories.
pub fn atomic_write(path: &Path, content: &str) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.locsync.tmp", path.display()));
    atomic_write_with_tmp(path, content, &tmp)
}

fn atomic_write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<WriteResult, SyncError> {
    let digest = sha256_hex(content.as_bytes());

    if file_digest(path)?.as_deref() == Some(digest.as_str()) {
        tracing::debug!("unchanged: {}", path.display());
        return Ok(WriteResult::Unchanged {
            path: path.to_path_buf(),
            digest,
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
        digest,
    })
}

/// SHA-256 of the file at `path`, or `None` if it does not exist.
pub fn file_digest(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(sha256_hex(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

// ---------------------------------------------------------------------------
// Locale directory clearing
// ---------------------------------------------------------------------------

/// The directory of `output_path` named after `locale`: the prefix up to and
/// including the first directory component equal to `locale`.
///
/// `public/locales/es/common.json` → `public/locales/es`;
/// `content/es.json` → `None`.
pub fn locale_dir(output_path: &Path, locale: &str) -> Option<PathBuf> {
    let parent = output_path.parent()?;
    let mut prefix = PathBuf::new();
    for component in parent.components() {
        prefix.push(component.as_os_str());
        if let Component::Normal(name) = component {
            if name == locale {
                return Some(prefix);
            }
        }
    }
    None
}

pub fn build_exclude_set(patterns: &[String]) -> Result<GlobSet, SyncError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Delete every file under `dirs` whose project-relative path is not matched
/// by `exclude`. Directories outside `project_root` (or equal to it) are left
/// alone. Files that cannot be removed are logged and kept. Returns the number
/// of files removed.
pub fn clear_locale_dirs(
    dirs: &BTreeSet<PathBuf>,
    project_root: &Path,
    exclude: &GlobSet,
) -> usize {
    let mut removed = 0;
    for dir in dirs {
        if !dir.starts_with(project_root) || dir == project_root {
            tracing::warn!(dir = %dir.display(), "refusing to clear directory outside project");
            continue;
        }
        let files = match collect_files(dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "could not list locale directory"
                );
                continue;
            }
        };
        for file in files {
            let relative = file.strip_prefix(project_root).unwrap_or(&file);
            if exclude.is_match(relative) {
                continue;
            }
            match std::fs::remove_file(&file) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        file = %file.display(),
                        error = %e,
                        "could not remove stale file"
                    );
                }
            }
        }
        tracing::info!(dir = %dir.display(), "cleared locale directory");
    }
    removed
}

fn collect_files(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut dirs = vec![root.to_path_buf()];
    let mut files = Vec::new();
    let mut cursor = 0;
    while cursor < dirs.len() {
        let current = dirs[cursor].clone();
        cursor += 1;
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&current, err)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&current, e))?;
            let ty = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
            if ty.is_dir() {
                dirs.push(entry.path());
            } else {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
