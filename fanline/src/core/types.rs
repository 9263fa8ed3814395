//! Shared deterministic types for the validation and reconciliation engine.
//!
//! These types define stable contracts between components. They carry no I/O
//! handles and are safe to move across worker threads.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file, relative to the worktree root.
    pub path: String,
}

/// Why the gate refused a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    NoChanges,
    MultipleFilesChanged,
    UnsupportedFileKind,
    MissingCompanionTest,
    TestFailed,
    StatusQueryFailed,
    StageOrCommitFailed,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::NoChanges => "no-changes",
            RejectReason::MultipleFilesChanged => "multiple-files-changed",
            RejectReason::UnsupportedFileKind => "unsupported-file-kind",
            RejectReason::MissingCompanionTest => "missing-companion-test",
            RejectReason::TestFailed => "test-failed",
            RejectReason::StatusQueryFailed => "status-query-failed",
            RejectReason::StageOrCommitFailed => "stage-or-commit-failed",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate decision for one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Change tested and committed on the workspace branch.
    Accepted,
    Rejected(RejectReason),
}

/// Result of running the gate against one workspace.
///
/// Ephemeral: produced once per workspace per reconcile run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Workspace identifier (branch name).
    pub workspace: String,
    pub verdict: Verdict,
    /// The single changed path, once the change set has been classified.
    pub changed_path: Option<String>,
    /// Companion test that was located, if the gate got that far.
    pub test_path: Option<PathBuf>,
    /// Captured test-runner output or the error text behind a rejection.
    pub diagnostics: Option<String>,
}

impl ValidationOutcome {
    pub fn rejected(workspace: impl Into<String>, reason: RejectReason) -> Self {
        Self {
            workspace: workspace.into(),
            verdict: Verdict::Rejected(reason),
            changed_path: None,
            test_path: None,
            diagnostics: None,
        }
    }

    pub fn accepted(
        workspace: impl Into<String>,
        changed_path: impl Into<String>,
        test_path: PathBuf,
        diagnostics: String,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            verdict: Verdict::Accepted,
            changed_path: Some(changed_path.into()),
            test_path: Some(test_path),
            diagnostics: Some(diagnostics),
        }
    }

    pub fn with_changed_path(mut self, path: impl Into<String>) -> Self {
        self.changed_path = Some(path.into());
        self
    }

    pub fn with_test_path(mut self, path: PathBuf) -> Self {
        self.test_path = Some(path);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.diagnostics = Some(diagnostics.into());
        self
    }

    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self.verdict {
            Verdict::Accepted => None,
            Verdict::Rejected(reason) => Some(reason),
        }
    }
}

/// What happened when folding an accepted workspace into the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStatus {
    /// Merged and cleanup attempted; see the report's cleanup issues.
    Merged,
    /// Merge conflicted (or git refused); the workspace was left untouched.
    Conflicted { detail: String },
}

/// What happened when re-synchronizing a rejected workspace with the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    Failed { detail: String },
    /// Worktree directory is gone; nothing to synchronize.
    Missing,
}

/// Individual cleanup operation performed after a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStep {
    RemoveWorktree,
    DeleteBranch,
    RemoveDirectory,
}

impl CleanupStep {
    pub fn as_str(self) -> &'static str {
        match self {
            CleanupStep::RemoveWorktree => "remove-worktree",
            CleanupStep::DeleteBranch => "delete-branch",
            CleanupStep::RemoveDirectory => "remove-directory",
        }
    }
}

/// A best-effort cleanup step that failed.
///
/// Kept separate from the accept/reject outcome: the merge already happened,
/// but a lingering worktree or branch keeps the session alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupIssue {
    pub workspace: String,
    pub step: CleanupStep,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_serialize_kebab_case() {
        let json = serde_json::to_string(&RejectReason::MissingCompanionTest).expect("json");
        assert_eq!(json, "\"missing-companion-test\"");
        assert_eq!(
            RejectReason::StageOrCommitFailed.to_string(),
            "stage-or-commit-failed"
        );
    }

    #[test]
    fn rejected_outcome_reports_reason() {
        let outcome = ValidationOutcome::rejected("fanline-1", RejectReason::NoChanges);
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.reason(), Some(RejectReason::NoChanges));
    }
}
