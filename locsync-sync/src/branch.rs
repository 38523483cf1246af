//! Branch resolution.
//!
//! Precedence:
//! 1. Branching disabled: the project default branch.
//! 2. Auto-detection enabled and successful: detected names are authoritative.
//! 3. Explicit `branch_name`: used as the current branch, assumed to be checked
//!    out from the default branch.
//! 4. Otherwise: the default branch, with a warning.
//!
//! All candidate names are then looked up in one registry query. Missing
//! branches are created; a policy-rejected creation degrades to the default
//! branch.

use locsync_core::types::{Branch, BranchContext};
use locsync_core::BranchingConfig;

use crate::api::{BranchData, TranslationApi};
use crate::error::{ApiError, SyncError};
use crate::observer::{warn, SyncObserver};
use crate::vcs::BranchDetector;

/// Names chosen before consulting the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BranchPlan {
    current: Option<String>,
    incoming: Vec<String>,
    checked_out: Vec<String>,
    assume_checked_out_from_default: bool,
}

impl BranchPlan {
    fn candidate_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self
            .current
            .iter()
            .chain(self.incoming.iter())
            .chain(self.checked_out.iter())
        {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Determine the branch context for this run.
pub async fn resolve_branch(
    api: &dyn TranslationApi,
    detector: &dyn BranchDetector,
    config: &BranchingConfig,
    observer: &dyn SyncObserver,
) -> Result<BranchContext, SyncError> {
    if !config.enabled {
        let data = api.query_branch_data(&[]).await?;
        let default = ensure_default(api, &data, config).await?;
        tracing::debug!(branch = %default.name, "branching disabled, using default branch");
        return Ok(BranchContext::on(default));
    }

    let plan = plan_names(detector, config, observer).await;
    let data = api.query_branch_data(&plan.candidate_names()).await?;

    let Some(current_name) = plan.current.as_deref() else {
        let default = ensure_default(api, &data, config).await?;
        warn(
            observer,
            format!(
                "no branch detected or configured; falling back to default branch '{}'",
                default.name
            ),
        );
        return Ok(BranchContext::on(default));
    };

    let current = match data.find(current_name) {
        Some(branch) => branch.clone(),
        None => match api.create_branch(current_name, false).await {
            Ok(branch) => {
                tracing::info!(branch = %branch.name, "created branch");
                branch
            }
            Err(ApiError::PolicyRejected(reason)) => {
                let default = ensure_default(api, &data, config).await?;
                warn(
                    observer,
                    format!(
                        "could not create branch '{current_name}' ({reason}); using default branch '{}'",
                        default.name
                    ),
                );
                return Ok(BranchContext::on(default));
            }
            Err(e) => return Err(e.into()),
        },
    };

    let incoming_branch = first_known(&data, &plan.incoming, &current);
    let checked_out_branch = if plan.assume_checked_out_from_default {
        let default = ensure_default(api, &data, config).await?;
        (default.id != current.id).then_some(default)
    } else {
        first_known(&data, &plan.checked_out, &current)
    };

    tracing::info!(
        branch = %current.name,
        incoming = ?incoming_branch.as_ref().map(|b| &b.name),
        checked_out = ?checked_out_branch.as_ref().map(|b| &b.name),
        "resolved branch"
    );
    Ok(BranchContext {
        current_branch: current,
        incoming_branch,
        checked_out_branch,
    })
}

async fn plan_names(
    detector: &dyn BranchDetector,
    config: &BranchingConfig,
    observer: &dyn SyncObserver,
) -> BranchPlan {
    let mut plan = BranchPlan::default();

    if config.auto_detect {
        match detector.detect().await {
            Ok(found) if found.current.is_some() => {
                plan.current = found.current;
                plan.incoming = found.incoming;
                plan.checked_out = found.checked_out;
            }
            Ok(_) => warn(observer, "could not detect the current branch".to_string()),
            Err(e) => warn(observer, format!("branch detection failed: {e}")),
        }
    }

    let explicit = config
        .branch_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    match (&plan.current, explicit) {
        (None, Some(name)) => {
            plan.current = Some(name.to_string());
            plan.assume_checked_out_from_default = true;
        }
        (Some(detected), Some(name)) if detected != name => {
            warn(
                observer,
                format!("ignoring branch_name '{name}'; detected branch is '{detected}'"),
            );
        }
        _ => {}
    }
    plan
}

/// Existing default branch, or create it (create is idempotent remotely).
async fn ensure_default(
    api: &dyn TranslationApi,
    data: &BranchData,
    config: &BranchingConfig,
) -> Result<Branch, SyncError> {
    if let Some(default) = &data.default_branch {
        return Ok(default.clone());
    }
    api.create_branch(&config.default_branch_name, true)
        .await
        .map_err(|e| {
            SyncError::BranchUnresolved(format!(
                "default branch '{}' missing and could not be created: {e}",
                config.default_branch_name
            ))
        })
}

fn first_known(data: &BranchData, candidates: &[String], current: &Branch) -> Option<Branch> {
    candidates
        .iter()
        .filter(|name| **name != current.name)
        .find_map(|name| data.find(name).cloned())
}
