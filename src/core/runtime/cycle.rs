//! Automatic and manual commit cycles.
//!
//! Both run synchronously against a [`VersionControl`] and are meant to be
//! driven from a blocking thread by the session loop.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::git::{REMOTE, VersionControl};

/// Source of the operator's commit message for manual cycles.
pub trait CommitPrompt: Send + Sync {
    /// Read one line of input. An empty line cancels the cycle.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be read.
    fn read_message(&self) -> Result<String>;
}

/// Message and path snapshot for one automatic flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub timestamp: String,
    pub message: String,
    pub paths: Vec<String>,
}

impl CommitRequest {
    #[must_use]
    pub fn automatic(timestamp: impl Into<String>, paths: Vec<String>) -> Self {
        let timestamp = timestamp.into();
        let message = auto_commit_message(&timestamp, &paths);
        Self {
            timestamp,
            message,
            paths,
        }
    }
}

/// Build the automatic commit message: header, blank line, then the file list.
#[must_use]
pub fn auto_commit_message(timestamp: &str, paths: &[String]) -> String {
    format!(
        "Auto-commit: {timestamp}\n\nChanged files:\n{}",
        paths.join("\n")
    )
}

/// Current UTC time as RFC 3339 (an ISO-8601 profile).
#[must_use]
pub fn iso8601_now() -> String {
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339).unwrap_or_else(|_| now.to_string())
}

/// Result of a cycle that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    Pushed { commit: String, branch: String },
    NothingToCommit,
}

/// Stage, commit and push the paths captured in `request`.
///
/// The first failing step aborts the rest of the cycle.
///
/// # Errors
/// Returns the error of the step that failed.
pub fn run_auto_cycle(vcs: &dyn VersionControl, request: &CommitRequest) -> Result<CycleReport> {
    info!(event = "commit_start", "Making commit at {}", request.timestamp);

    vcs.stage_all()?;
    info!("Changed files:");
    for path in &request.paths {
        info!("  - {path}");
        vcs.stage_path(path)?;
    }

    let Some(commit) = vcs.commit(&request.message)? else {
        info!(event = "commit_skipped", "no staged changes; nothing to commit");
        return Ok(CycleReport::NothingToCommit);
    };

    let branch = vcs.current_branch()?;
    info!(event = "push_start", %branch, "Pushing changes to remote (branch: {branch})...");
    vcs.push(REMOTE, &branch)?;

    info!(event = "push_done", %commit, %branch, "Commit created and pushed successfully");
    Ok(CycleReport::Pushed { commit, branch })
}

/// How a manual cycle ended.
#[derive(Debug)]
pub enum ManualOutcome {
    /// Empty message; nothing was committed.
    Cancelled,
    /// Broad staging failed before the operator was prompted.
    StageFailed(anyhow::Error),
    /// The prompt itself failed.
    PromptFailed(anyhow::Error),
    NothingToCommit,
    CommitFailed(anyhow::Error),
    /// The commit exists locally but did not reach the remote.
    PushFailed { commit: String, error: anyhow::Error },
    Pushed { commit: String, branch: String },
}

impl ManualOutcome {
    /// Whether a commit was attempted, which supersedes the pending change set.
    #[must_use]
    pub const fn flushed(&self) -> bool {
        !matches!(
            self,
            Self::Cancelled | Self::StageFailed(_) | Self::PromptFailed(_)
        )
    }
}

/// Stage everything, ask for a message, then commit and push.
pub fn run_manual_cycle(vcs: &dyn VersionControl, prompt: &dyn CommitPrompt) -> ManualOutcome {
    if let Err(e) = vcs.stage_all() {
        return ManualOutcome::StageFailed(e);
    }

    let message = match prompt.read_message() {
        Ok(m) => m,
        Err(e) => return ManualOutcome::PromptFailed(e),
    };
    let message = message.trim();
    if message.is_empty() {
        return ManualOutcome::Cancelled;
    }

    let commit = match vcs.commit(message) {
        Ok(Some(commit)) => commit,
        Ok(None) => return ManualOutcome::NothingToCommit,
        Err(e) => return ManualOutcome::CommitFailed(e),
    };
    info!(event = "manual_commit", %commit, "Commit created");

    let pushed = vcs
        .current_branch()
        .and_then(|branch| {
            info!(event = "push_start", %branch, "Pushing changes to remote (branch: {branch})...");
            vcs.push(REMOTE, &branch)
                .with_context(|| format!("push to {REMOTE}/{branch} failed"))
                .map(|()| branch)
        });

    match pushed {
        Ok(branch) => ManualOutcome::Pushed { commit, branch },
        Err(error) => {
            warn!(event = "push_failed", %commit, "commit kept locally; push it manually");
            ManualOutcome::PushFailed { commit, error }
        }
    }
}
