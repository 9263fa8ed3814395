//! Fan-out: create workspaces from a baseline and record them in the session.

use std::fmt;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::context::RepoContext;
use crate::core::session::{Session, Workspace, merge_append};
use crate::io::editor::{launch_editor, tiling_hint};

/// Workspace count was not a positive integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCount {
    pub input: String,
}

impl fmt::Display for InvalidCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count must be a positive integer (got '{}')",
            self.input
        )
    }
}

impl std::error::Error for InvalidCount {}

/// Parse the workspace count argument.
pub fn parse_count(input: &str) -> Result<u32, InvalidCount> {
    match input.trim().parse::<u32>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(InvalidCount {
            input: input.to_string(),
        }),
    }
}

/// A branch that exists but whose worktree could not be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanBranch {
    pub branch: String,
    pub detail: String,
    /// True if the branch was deleted again; false means it is still there.
    pub rolled_back: bool,
}

/// Summary of a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    pub base_branch: String,
    pub created: Vec<Workspace>,
    /// Branches that could not be created at all, with the git error.
    pub failed: Vec<(String, String)>,
    pub orphans: Vec<OrphanBranch>,
    /// Editors that failed to launch, with the error.
    pub editor_failures: Vec<(String, String)>,
    pub tiling_hint: Option<String>,
    /// Session after the update; `None` if nothing was created and none existed.
    pub session: Option<Session>,
}

/// Create `count` workspaces from `baseline` (current branch if `None`).
///
/// A corrupt session aborts before anything is created. New workspace ids are
/// appended to the existing session, whose baseline and parent stay as they were.
#[instrument(skip_all, fields(count))]
pub fn fan_out(ctx: &RepoContext, count: u32, baseline: Option<&str>) -> Result<FanOutReport> {
    let store = ctx.store();
    let existing = store.load_optional()?;
    let git = ctx.git();
    let parent_dir = ctx.parent_dir()?;

    let base_branch = match baseline {
        Some(base) => base.to_string(),
        None => git.current_branch().context("determine baseline")?,
    };

    let existing_branches = git
        .list_branches(&ctx.naming.branch_glob())
        .context("list existing workspace branches")?;
    let mut next = ctx
        .naming
        .next_index(existing_branches.iter().map(String::as_str));

    let mut report = FanOutReport {
        base_branch: base_branch.clone(),
        created: Vec::new(),
        failed: Vec::new(),
        orphans: Vec::new(),
        editor_failures: Vec::new(),
        tiling_hint: None,
        session: None,
    };

    for _ in 0..count {
        // Skip indices whose directory is already taken by something else.
        while parent_dir.join(ctx.naming.name(next)).exists() {
            next += 1;
        }
        let id = ctx.naming.name(next);
        next += 1;
        let path = parent_dir.join(&id);

        info!(branch = %id, base = %base_branch, "creating branch");
        if let Err(err) = git.create_branch(&id, &base_branch) {
            warn!(branch = %id, err = %format!("{err:#}"), "branch creation failed");
            report.failed.push((id, format!("{err:#}")));
            continue;
        }

        info!(branch = %id, path = %path.display(), "adding worktree");
        if let Err(err) = git.worktree_add(&path, &id) {
            warn!(
                branch = %id,
                err = %format!("{err:#}"),
                "worktree creation failed, branch orphaned"
            );
            let rolled_back = match git.force_delete_branch(&id) {
                Ok(()) => true,
                Err(rollback_err) => {
                    warn!(
                        branch = %id,
                        err = %format!("{rollback_err:#}"),
                        "could not delete orphaned branch"
                    );
                    false
                }
            };
            report.orphans.push(OrphanBranch {
                branch: id,
                detail: format!("{err:#}"),
                rolled_back,
            });
            continue;
        }

        if let Err(err) = launch_editor(&ctx.config.editor.command, &path) {
            warn!(branch = %id, err = %format!("{err:#}"), "editor launch failed");
            report.editor_failures.push((id.clone(), format!("{err:#}")));
        }
        report.created.push(Workspace { id, path });
    }

    if !report.created.is_empty() && !ctx.config.editor.command.is_empty() {
        report.tiling_hint = Some(tiling_hint(report.created.len()));
    }

    if report.created.is_empty() && existing.is_none() {
        return Ok(report);
    }
    let new_ids: Vec<String> = report.created.iter().map(|ws| ws.id.clone()).collect();
    let session = merge_append(existing, &new_ids, &base_branch, &parent_dir);
    store.save(&session)?;
    info!(tracked = session.branches.len(), "session saved");
    report.session = Some(session);
    Ok(report)
}
