//! Config loading error-message and parsing integration tests.

use assert_fs::prelude::*;
use locsync_core::{config, ConfigError};
use predicates::prelude::predicate;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("locsync.yaml");
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("config not found"));
    assert!(err.to_string().contains("locsync.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("locsync.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("locsync.yaml"));
}

#[test]
fn load_missing_required_field_is_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("locsync.yaml");
    file.write_str("target_locales: [es]\n").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("source_locale"), "serde_yaml should name the field, got: {msg}");
}

// ---------------------------------------------------------------------------
// 2. Full document
// ---------------------------------------------------------------------------

#[test]
fn load_full_config() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("locsync.yaml");
    file.write_str(
        r#"
source_locale: en
target_locales: [es, fr, ja]
publish: true
require_approval: true
force: false
force_download: true
model_provider: fast
timeout_secs: 120
poll_interval_secs: 2
assume_complete: false
branching:
  enabled: true
  auto_detect: false
  branch_name: feature/login
retry:
  max_retries: 5
  initial_delay_ms: 100
experimental_clear_locale_dirs: true
clear_locale_dirs_exclude:
  - "public/locales/*/keep.json"
"#,
    )
    .expect("write");
    file.assert(predicate::path::exists());

    let cfg = config::load_at(file.path()).expect("load");
    cfg.validate().expect("valid");
    assert!(cfg.publish && cfg.require_approval && cfg.force_download);
    assert_eq!(cfg.model_provider.as_deref(), Some("fast"));
    assert_eq!(cfg.timeout().as_secs(), 120);
    assert!(cfg.branching.enabled);
    assert!(!cfg.branching.auto_detect);
    assert_eq!(cfg.branching.branch_name.as_deref(), Some("feature/login"));
    assert_eq!(cfg.branching.default_branch_name, "main");
    assert_eq!(cfg.retry.max_retries, 5);
    assert_eq!(cfg.retry.initial_delay_ms, 100);
    assert_eq!(cfg.retry.max_delay_ms, 8_000);
    assert_eq!(cfg.clear_locale_dirs_exclude.len(), 1);
    assert_eq!(cfg.effective_target_locales(), vec!["es", "fr", "ja"]);
}
