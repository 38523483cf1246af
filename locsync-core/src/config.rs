//! Run configuration.
//!
//! A [`SyncConfig`] is usually read from a YAML file:
//!
//! ```text
//! source_locale: en
//! target_locales: [es, fr]
//! timeout_secs: 600
//! branching:
//!   enabled: true
//!   auto_detect: true
//! retry:
//!   max_retries: 3
//!   initial_delay_ms: 500
//! ```
//!
//! Every field except `source_locale` and `target_locales` has a default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_BRANCH_NAME: &str = "main";

/// Branch resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchingConfig {
    /// When false every run uses the project's default branch.
    pub enabled: bool,
    /// Ask the VCS for current / incoming / checked-out branch names.
    pub auto_detect: bool,
    /// Explicit branch name, used when detection is off or fails.
    pub branch_name: Option<String>,
    /// Name used when the project has no default branch yet.
    pub default_branch_name: String,
}

impl Default for BranchingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_detect: false,
            branch_name: None,
            default_branch_name: DEFAULT_BRANCH_NAME.to_string(),
        }
    }
}

/// Bounded exponential backoff for transient per-file failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Settings for one sync invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source_locale: String,
    pub target_locales: Vec<String>,
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub require_approval: bool,
    /// Re-translate even when the server already holds a translation.
    #[serde(default)]
    pub force: bool,
    /// Download even when the ledger says the local file is current.
    #[serde(default)]
    pub force_download: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_provider: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Staging shortcut: skip polling and treat every key as completed.
    #[serde(default)]
    pub assume_complete: bool,
    #[serde(default)]
    pub branching: BranchingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub experimental_clear_locale_dirs: bool,
    /// Globs (relative to the project root) never deleted by locale-dir clearing.
    #[serde(default)]
    pub clear_locale_dirs_exclude: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl SyncConfig {
    /// Minimal config with defaults for everything else.
    pub fn new(source_locale: impl Into<String>, target_locales: Vec<String>) -> Self {
        Self {
            source_locale: source_locale.into(),
            target_locales,
            publish: false,
            require_approval: false,
            force: false,
            force_download: false,
            model_provider: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            assume_complete: false,
            branching: BranchingConfig::default(),
            retry: RetryConfig::default(),
            experimental_clear_locale_dirs: false,
            clear_locale_dirs_exclude: Vec::new(),
        }
    }

    /// Reject configs that cannot drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_locale.trim().is_empty() {
            return Err(ConfigError::Invalid("source_locale is empty".to_string()));
        }
        if self.effective_target_locales().is_empty() {
            return Err(ConfigError::Invalid(
                "no target locales besides the source locale".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    /// Target locales in declaration order, de-duplicated, source locale removed.
    pub fn effective_target_locales(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.target_locales.len());
        for locale in &self.target_locales {
            let locale = locale.trim();
            if locale.is_empty() || locale == self.source_locale || out.iter().any(|l| l == locale)
            {
                continue;
            }
            out.push(locale.to_string());
        }
        out
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Parse a config document.
pub fn from_yaml_str(yaml: &str) -> Result<SyncConfig, ConfigError> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Load a config file.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path)
/// if malformed. The result is not validated.
pub fn load_at(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
