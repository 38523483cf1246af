//! Domain types for the localization sync engine.
//!
//! Identifiers are newtypes over the hex digests produced by
//! [`crate::identity`] (or the opaque ids handed out by the translation
//! service). Every type is serde-serializable; wire names are camelCase.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{compute_file_id, compute_version_id};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

id_newtype!(
    /// Stable hash of a project-relative path.
    FileId
);
id_newtype!(
    /// Stable hash of file content.
    VersionId
);
id_newtype!(
    /// Server-assigned branch identifier.
    BranchId
);
id_newtype!(
    /// Server-assigned translation job identifier.
    JobId
);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// On-disk format of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileFormat {
    Json,
    Yaml,
    Md,
    Mdx,
    Js,
    Ts,
    Jsx,
    Tsx,
    Html,
    Txt,
    Po,
    Gtjson,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileFormat::Json => "JSON",
            FileFormat::Yaml => "YAML",
            FileFormat::Md => "MD",
            FileFormat::Mdx => "MDX",
            FileFormat::Js => "JS",
            FileFormat::Ts => "TS",
            FileFormat::Jsx => "JSX",
            FileFormat::Tsx => "TSX",
            FileFormat::Html => "HTML",
            FileFormat::Txt => "TXT",
            FileFormat::Po => "PO",
            FileFormat::Gtjson => "GTJSON",
        };
        f.write_str(s)
    }
}

/// Message syntax used inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataFormat {
    Jsx,
    Icu,
    I18next,
    String,
}

/// Remote state of a translation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

// ---------------------------------------------------------------------------
// Content units and references
// ---------------------------------------------------------------------------

/// One pre-extracted piece of source content.
///
/// `file_id` and `version_id` are derived by [`ContentUnit::new`]; renaming a
/// file changes only the former, editing it only the latter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUnit {
    pub file_name: String,
    pub file_format: FileFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_format: Option<DataFormat>,
    pub content: String,
    pub file_id: FileId,
    pub version_id: VersionId,
    pub locale: String,
}

impl ContentUnit {
    pub fn new(
        file_name: impl Into<String>,
        file_format: FileFormat,
        data_format: Option<DataFormat>,
        content: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        let file_name = file_name.into();
        let content = content.into();
        Self {
            file_id: compute_file_id(&file_name),
            version_id: compute_version_id(&content),
            file_name,
            file_format,
            data_format,
            content,
            locale: locale.into(),
        }
    }

    /// Address of this unit on `branch_id`, without its content.
    pub fn reference(&self, branch_id: &BranchId) -> FileReference {
        FileReference {
            file_id: self.file_id.clone(),
            version_id: self.version_id.clone(),
            branch_id: branch_id.clone(),
            file_name: self.file_name.clone(),
            file_format: self.file_format,
            data_format: self.data_format,
        }
    }
}

/// Minimal cross-stage address of an uploaded source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub file_id: FileId,
    pub version_id: VersionId,
    pub branch_id: BranchId,
    pub file_name: String,
    pub file_format: FileFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_format: Option<DataFormat>,
}

impl FileReference {
    pub fn key(&self, locale: &str) -> TranslationKey {
        TranslationKey {
            branch_id: self.branch_id.clone(),
            file_id: self.file_id.clone(),
            version_id: self.version_id.clone(),
            locale: locale.to_owned(),
        }
    }
}

/// A file the server knows on a branch that this run did not produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedFile {
    pub file_id: FileId,
    pub version_id: VersionId,
    pub file_name: String,
}

/// A rename recognised by content equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMove {
    pub old_file_id: FileId,
    pub new_file_id: FileId,
    pub new_file_name: String,
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// A named translation lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
}

/// Branch resolution result for one run.
///
/// `incoming_branch` and `checked_out_branch` are lineage hints only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchContext {
    pub current_branch: Branch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_branch: Option<Branch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_out_branch: Option<Branch>,
}

impl BranchContext {
    pub fn on(branch: Branch) -> Self {
        Self {
            current_branch: branch,
            incoming_branch: None,
            checked_out_branch: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Jobs and tracking keys
// ---------------------------------------------------------------------------

/// Identity of one (file version, target locale) translation on a branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationKey {
    pub branch_id: BranchId,
    pub file_id: FileId,
    pub version_id: VersionId,
    pub locale: String,
}

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.branch_id, self.file_id, self.version_id, self.locale
        )
    }
}

/// A key plus the source file name it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub key: TranslationKey,
    pub file_name: String,
}

/// Cross product of `refs` and `locales`, in reference order.
pub fn file_queries(refs: &[FileReference], locales: &[String]) -> Vec<FileQuery> {
    refs.iter()
        .flat_map(|r| {
            locales.iter().map(move |locale| FileQuery {
                key: r.key(locale),
                file_name: r.file_name.clone(),
            })
        })
        .collect()
}

/// A translation job enqueued on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    pub source_file_id: FileId,
    pub file_id: FileId,
    pub version_id: VersionId,
    pub branch_id: BranchId,
    pub target_locale: String,
    #[serde(default)]
    pub force: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_provider: Option<String>,
}

impl Job {
    pub fn key(&self) -> TranslationKey {
        TranslationKey {
            branch_id: self.branch_id.clone(),
            file_id: self.file_id.clone(),
            version_id: self.version_id.clone(),
            locale: self.target_locale.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Delivery metadata for one downloaded translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionLedgerEntry {
    pub file_id: FileId,
    pub branch_id: BranchId,
    pub version_id: VersionId,
    pub locale: String,
    pub updated_at: DateTime<Utc>,
    pub post_process_hash: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
