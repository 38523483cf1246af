//! VCS branch detection.
//!
//! [`GitBranchDetector`] shells out to `git` (and honours the GitHub Actions
//! `GITHUB_HEAD_REF` / `GITHUB_BASE_REF` variables). The three lookups are
//! independent and run concurrently in [`BranchDetector::detect`].

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::SyncError;

/// Raw branch names reported by the VCS. Lists are candidates in preference
/// order; the resolver keeps the first one the server knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedBranches {
    pub current: Option<String>,
    pub incoming: Vec<String>,
    pub checked_out: Vec<String>,
}

#[async_trait]
pub trait BranchDetector: Send + Sync {
    async fn current_branch(&self) -> Result<Option<String>, SyncError>;

    /// Branches merged into the current commit.
    async fn incoming_branches(&self) -> Result<Vec<String>, SyncError>;

    /// Branches the current branch was created from.
    async fn checked_out_branches(&self) -> Result<Vec<String>, SyncError>;

    async fn detect(&self) -> Result<DetectedBranches, SyncError> {
        let (current, incoming, checked_out) = tokio::join!(
            self.current_branch(),
            self.incoming_branches(),
            self.checked_out_branches()
        );
        Ok(DetectedBranches {
            current: current?,
            incoming: incoming?,
            checked_out: checked_out?,
        })
    }
}

/// Reads branch names from a git working tree.
#[derive(Debug, Clone)]
pub struct GitBranchDetector {
    repo_dir: PathBuf,
}

impl GitBranchDetector {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String, SyncError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| crate::error::io_err("git", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SyncError::Vcs(format!(
                "git {} failed (status {}): {}",
                args.join(" "),
                output.status,
                stderr
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn head_name(&self) -> Result<Option<String>, SyncError> {
        let name = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if name.is_empty() || name == "HEAD" {
            return Ok(None);
        }
        Ok(Some(name))
    }
}

#[async_trait]
impl BranchDetector for GitBranchDetector {
    async fn current_branch(&self) -> Result<Option<String>, SyncError> {
        if let Some(name) = env_branch("GITHUB_HEAD_REF") {
            return Ok(Some(name));
        }
        self.head_name().await
    }

    async fn incoming_branches(&self) -> Result<Vec<String>, SyncError> {
        let out = self.git(&["log", "-1", "--format=%P%n%s"]).await?;
        let mut lines = out.lines();
        let parents = lines.next().unwrap_or_default().split_whitespace().count();
        if parents < 2 {
            return Ok(Vec::new());
        }
        Ok(lines
            .next()
            .and_then(parse_merge_subject)
            .into_iter()
            .collect())
    }

    async fn checked_out_branches(&self) -> Result<Vec<String>, SyncError> {
        if let Some(name) = env_branch("GITHUB_BASE_REF") {
            return Ok(vec![name]);
        }
        let Some(current) = self.head_name().await? else {
            return Ok(Vec::new());
        };
        let reflog = self.git(&["reflog", "-n", "200", "--format=%gs"]).await?;
        Ok(parse_checkout_sources(&reflog, &current))
    }
}

fn env_branch(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Branch name from a merge commit subject.
///
/// Understands `Merge branch 'x' …` and `Merge pull request #n from owner/x`.
pub fn parse_merge_subject(subject: &str) -> Option<String> {
    let subject = subject.trim();
    if let Some(rest) = subject.strip_prefix("Merge branch '") {
        let name = rest.split('\'').next()?;
        return (!name.is_empty()).then(|| name.to_string());
    }
    if let Some(rest) = subject.strip_prefix("Merge pull request #") {
        let (_, source) = rest.split_once(" from ")?;
        let source = source.split_whitespace().next()?;
        let name = source.split_once('/').map(|(_, b)| b).unwrap_or(source);
        return (!name.is_empty()).then(|| name.to_string());
    }
    None
}

/// Branches `current` was checked out from, most recent first, de-duplicated.
///
/// Reads reflog subjects of the form `checkout: moving from X to Y`.
pub fn parse_checkout_sources(reflog: &str, current: &str) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for line in reflog.lines() {
        let Some(rest) = line.trim().strip_prefix("checkout: moving from ") else {
            continue;
        };
        let Some((from, to)) = rest.split_once(" to ") else {
            continue;
        };
        if to != current || from == current {
            continue;
        }
        if !sources.iter().any(|s| s == from) {
            sources.push(from.to_string());
        }
    }
    sources
}
