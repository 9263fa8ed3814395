//! Reconciliation: fold workspaces back into the baseline.
//!
//! Two policies share the merge and cleanup primitives:
//!
//! - **Plain** ([`run_plain_reconcile`]): merge every tracked workspace in
//!   session order. The first refused merge aborts the run and leaves the
//!   repository in its merge state for the user.
//! - **Gated** ([`run_gated_reconcile`]): validate all workspaces in parallel,
//!   merge only the accepted ones (a conflict skips that workspace), re-sync the
//!   rejected ones with the advanced baseline, then let the lifecycle check
//!   decide whether the session goes.
//!
//! Both run strictly sequentially once merging starts: the baseline checkout is
//! the one shared mutable resource.

use std::fmt;
use std::fs;

use anyhow::{Context, Result, anyhow};
use tracing::{info, instrument, warn};

use crate::context::RepoContext;
use crate::coordinator::validate_all;
use crate::core::session::{Session, Workspace};
use crate::core::types::{CleanupIssue, CleanupStep, MergeStatus, SyncStatus, ValidationOutcome};
use crate::io::git::{Git, MergeAttempt};
use crate::io::test_runner::TestRunner;
use crate::lifecycle::{LifecycleReport, settle_session};

/// Plain reconcile stopped on a merge git refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflictError {
    pub workspace: String,
    pub detail: String,
    /// Workspaces merged (and cleaned up) before the conflict.
    pub merged_before: Vec<String>,
}

impl fmt::Display for MergeConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "merge of {} refused; resolve or abort the merge, remaining workspaces were not processed",
            self.workspace
        )?;
        if !self.detail.is_empty() {
            write!(f, "\n{}", self.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for MergeConflictError {}

/// Merge result for one accepted workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    pub workspace: String,
    pub status: MergeStatus,
}

/// Re-sync result for one rejected workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    pub workspace: String,
    pub status: SyncStatus,
}

/// Summary of a plain reconcile that completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainReport {
    pub base_branch: String,
    pub merged: Vec<String>,
    pub cleanup_issues: Vec<CleanupIssue>,
    pub session_deleted: bool,
}

/// Summary of the merge phase of a gated reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeReport {
    pub merges: Vec<MergeRecord>,
    pub syncs: Vec<SyncRecord>,
    pub cleanup_issues: Vec<CleanupIssue>,
}

/// Summary of a gated reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedReport {
    pub base_branch: String,
    pub outcomes: Vec<ValidationOutcome>,
    pub merge: MergeReport,
    pub lifecycle: LifecycleReport,
}

/// Merge every tracked workspace unconditionally; any refused merge is fatal.
///
/// On success the session file is deleted regardless of cleanup issues.
#[instrument(skip_all)]
pub fn run_plain_reconcile(ctx: &RepoContext) -> Result<PlainReport> {
    let store = ctx.store();
    let session = store.load()?;
    let git = ctx.git();

    info!(base = %session.base_branch, "checking out baseline");
    git.checkout_branch(&session.base_branch)
        .with_context(|| format!("checkout baseline {}", session.base_branch))?;

    let mut merged = Vec::new();
    let mut cleanup_issues = Vec::new();
    for workspace in session.workspaces() {
        info!(workspace = %workspace.id, "merging");
        match git.merge_no_ff(&workspace.id)? {
            MergeAttempt::Merged => {
                cleanup_issues.extend(remove_workspace(&git, &workspace));
                merged.push(workspace.id);
            }
            MergeAttempt::Refused { detail } => {
                warn!(workspace = %workspace.id, "merge refused, aborting reconcile");
                return Err(MergeConflictError {
                    workspace: workspace.id,
                    detail,
                    merged_before: merged,
                }
                .into());
            }
        }
    }

    let session_deleted = store.delete()?;
    Ok(PlainReport {
        base_branch: session.base_branch,
        merged,
        cleanup_issues,
        session_deleted,
    })
}

/// Validate, merge accepted workspaces, re-sync rejected ones, settle the session.
#[instrument(skip_all)]
pub fn run_gated_reconcile<R: TestRunner + ?Sized>(
    ctx: &RepoContext,
    runner: &R,
) -> Result<GatedReport> {
    let store = ctx.store();
    let session = store.load()?;
    let git = ctx.git();

    // Fail before any workspace gets committed to.
    if !git.branch_exists(&session.base_branch)? {
        return Err(anyhow!(
            "baseline branch {} does not exist",
            session.base_branch
        ));
    }
    // A baseline that cannot be checked out would strand accepted commits.
    info!(base = %session.base_branch, "checking out baseline");
    git.checkout_branch(&session.base_branch)
        .with_context(|| format!("checkout baseline {}", session.base_branch))?;

    let outcomes = validate_all(&session, &ctx.config.gate, runner)?;
    let merge = merge_outcomes(&git, &session, &outcomes)?;
    let lifecycle = settle_session(&store, &git, &session, &ctx.naming)?;

    Ok(GatedReport {
        base_branch: session.base_branch,
        outcomes,
        merge,
        lifecycle,
    })
}

/// Fold accepted workspaces into the baseline, then re-sync rejected ones.
///
/// `outcomes` must be in session order. Only a failed baseline checkout is an
/// error; per-workspace failures are recorded in the report.
pub fn merge_outcomes(
    git: &Git,
    session: &Session,
    outcomes: &[ValidationOutcome],
) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    info!(base = %session.base_branch, "checking out baseline");
    git.checkout_branch(&session.base_branch)
        .with_context(|| format!("checkout baseline {}", session.base_branch))?;

    for outcome in outcomes.iter().filter(|o| o.is_accepted()) {
        let workspace = Workspace {
            id: outcome.workspace.clone(),
            path: session.workspace_path(&outcome.workspace),
        };
        let status = merge_accepted(git, &workspace, &mut report.cleanup_issues);
        report.merges.push(MergeRecord {
            workspace: workspace.id,
            status,
        });
    }

    for outcome in outcomes.iter().filter(|o| !o.is_accepted()) {
        let workspace = Workspace {
            id: outcome.workspace.clone(),
            path: session.workspace_path(&outcome.workspace),
        };
        let status = sync_rejected(&workspace, &session.base_branch);
        report.syncs.push(SyncRecord {
            workspace: workspace.id,
            status,
        });
    }

    Ok(report)
}

#[instrument(skip_all, fields(workspace = %workspace.id))]
fn merge_accepted(
    git: &Git,
    workspace: &Workspace,
    cleanup_issues: &mut Vec<CleanupIssue>,
) -> MergeStatus {
    info!("merging into baseline");
    let detail = match git.merge_no_ff(&workspace.id) {
        Ok(MergeAttempt::Merged) => {
            cleanup_issues.extend(remove_workspace(git, workspace));
            return MergeStatus::Merged;
        }
        Ok(MergeAttempt::Refused { detail }) => detail,
        Err(err) => format!("{err:#}"),
    };
    warn!("merge conflict, workspace left in place");
    if let Err(err) = git.merge_abort() {
        warn!(err = %format!("{err:#}"), "failed to abort conflicted merge");
    }
    MergeStatus::Conflicted { detail }
}

#[instrument(skip_all, fields(workspace = %workspace.id))]
fn sync_rejected(workspace: &Workspace, base_branch: &str) -> SyncStatus {
    if !workspace.path.is_dir() {
        return SyncStatus::Missing;
    }
    let git = Git::new(&workspace.path);
    info!(base = base_branch, "syncing with baseline");
    let detail = match git.merge(base_branch) {
        Ok(MergeAttempt::Merged) => return SyncStatus::Synced,
        Ok(MergeAttempt::Refused { detail }) => detail,
        Err(err) => format!("{err:#}"),
    };
    warn!("sync failed, workspace left as-is");
    if let Err(err) = git.merge_abort() {
        warn!(err = %format!("{err:#}"), "failed to abort sync merge");
    }
    SyncStatus::Failed { detail }
}

/// Remove the worktree, the branch and the directory of a merged workspace.
///
/// Each step is attempted even if an earlier one failed; failures come back as
/// issues instead of errors.
fn remove_workspace(git: &Git, workspace: &Workspace) -> Vec<CleanupIssue> {
    let mut issues = Vec::new();
    let mut record = |step: CleanupStep, err: anyhow::Error| {
        warn!(
            workspace = %workspace.id,
            step = step.as_str(),
            err = %format!("{err:#}"),
            "cleanup failed"
        );
        issues.push(CleanupIssue {
            workspace: workspace.id.clone(),
            step,
            detail: format!("{err:#}"),
        });
    };

    if workspace.path.exists() {
        if let Err(err) = git.worktree_remove_force(&workspace.path) {
            record(CleanupStep::RemoveWorktree, err);
        }
    } else if let Err(err) = git.worktree_prune() {
        record(CleanupStep::RemoveWorktree, err);
    }

    if let Err(err) = git.delete_branch(&workspace.id) {
        record(CleanupStep::DeleteBranch, err);
    }

    if workspace.path.exists() {
        if let Err(err) = fs::remove_dir_all(&workspace.path)
            .with_context(|| format!("remove {}", workspace.path.display()))
        {
            record(CleanupStep::RemoveDirectory, err);
        }
    }

    issues
}
