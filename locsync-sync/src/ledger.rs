//! Version ledger: which translation version was delivered, and its bytes.
//!
//! Persists a [`VersionLedger`] JSON document at
//! `<project_root>/.locsync/ledger.json`, keyed
//! branch → file → version → locale → `{ updatedAt, postProcessHash }`.
//! Writes use the atomic `.tmp` + rename pattern. One writer per project
//! directory per run; concurrent runs against the same ledger are not guarded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use locsync_core::types::{BranchId, FileId, VersionId, VersionLedgerEntry};

use crate::error::{io_err, SyncError};

pub const LEDGER_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub updated_at: DateTime<Utc>,
    pub post_process_hash: String,
}

pub type LocaleRecords = BTreeMap<String, LedgerRecord>;
pub type VersionRecords = BTreeMap<VersionId, LocaleRecords>;
pub type FileRecords = BTreeMap<FileId, VersionRecords>;

/// On-disk ledger payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLedger {
    #[serde(default = "format_version")]
    pub version: u32,
    #[serde(default)]
    pub branches: BTreeMap<BranchId, FileRecords>,
}

fn format_version() -> u32 {
    LEDGER_FORMAT_VERSION
}

impl Default for VersionLedger {
    fn default() -> Self {
        Self {
            version: LEDGER_FORMAT_VERSION,
            branches: BTreeMap::new(),
        }
    }
}

impl VersionLedger {
    /// Record a delivery, overwriting any previous record for the same
    /// (branch, file, version, locale). Records of other versions of the same
    /// file and locale are dropped.
    pub fn record(&mut self, entry: VersionLedgerEntry) {
        let files = self.branches.entry(entry.branch_id).or_default();
        let versions = files.entry(entry.file_id).or_default();
        for (version, locales) in versions.iter_mut() {
            if *version != entry.version_id {
                locales.remove(&entry.locale);
            }
        }
        versions.retain(|_, locales| !locales.is_empty());
        versions.entry(entry.version_id).or_default().insert(
            entry.locale,
            LedgerRecord {
                updated_at: entry.updated_at,
                post_process_hash: entry.post_process_hash,
            },
        );
    }

    pub fn get(
        &self,
        branch_id: &BranchId,
        file_id: &FileId,
        version_id: &VersionId,
        locale: &str,
    ) -> Option<&LedgerRecord> {
        self.branches
            .get(branch_id)?
            .get(file_id)?
            .get(version_id)?
            .get(locale)
    }

    /// Flattened view, in key order.
    pub fn entries(&self) -> Vec<VersionLedgerEntry> {
        let mut out = Vec::new();
        for (branch_id, files) in &self.branches {
            for (file_id, versions) in files {
                for (version_id, locales) in versions {
                    for (locale, record) in locales {
                        out.push(VersionLedgerEntry {
                            file_id: file_id.clone(),
                            branch_id: branch_id.clone(),
                            version_id: version_id.clone(),
                            locale: locale.clone(),
                            updated_at: record.updated_at,
                            post_process_hash: record.post_process_hash.clone(),
                        });
                    }
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.branches
            .values()
            .flat_map(|files| files.values())
            .flat_map(|versions| versions.values())
            .map(|locales| locales.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Path to the ledger JSON for a project.
///
/// `<project_root>/.locsync/ledger.json`
pub fn ledger_path_at(project_root: &Path) -> PathBuf {
    project_root.join(".locsync").join("ledger.json")
}

/// Load the ledger for `project_root`.
///
/// Returns an empty ledger if the file does not yet exist.
pub fn load_at(project_root: &Path) -> Result<VersionLedger, SyncError> {
    let path = ledger_path_at(project_root);
    if !path.exists() {
        return Ok(VersionLedger::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the ledger atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(project_root: &Path, ledger: &VersionLedger) -> Result<(), SyncError> {
    let path = ledger_path_at(project_root);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid ledger path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(ledger)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}
