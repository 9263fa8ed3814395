//! `fanline status`: the session next to what actually exists on disk.

use anyhow::Result;

use crate::context::RepoContext;
use crate::lifecycle::derive_live_state;

/// Live view of one tracked workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceStatus {
    pub id: String,
    pub dir_exists: bool,
    pub branch_exists: bool,
}

/// Session contents plus live state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub base_branch: String,
    pub workspaces: Vec<WorkspaceStatus>,
    /// Namespace branches the session does not track (e.g. orphans).
    pub untracked_branches: Vec<String>,
    /// True if the lifecycle check would delete the session now.
    pub fully_resolved: bool,
}

pub fn session_status(ctx: &RepoContext) -> Result<StatusReport> {
    let session = ctx.store().load()?;
    let git = ctx.git();
    let live = derive_live_state(&git, &session, &ctx.naming);

    let workspaces = session
        .workspaces()
        .into_iter()
        .map(|ws| WorkspaceStatus {
            dir_exists: live.remaining_dirs.contains(&ws.path),
            branch_exists: live.remaining_branches.contains(&ws.id),
            id: ws.id,
        })
        .collect();
    let untracked_branches = live
        .remaining_branches
        .iter()
        .filter(|branch| !session.branches.contains(*branch))
        .cloned()
        .collect();

    Ok(StatusReport {
        base_branch: session.base_branch,
        workspaces,
        untracked_branches,
        fully_resolved: live.fully_resolved(),
    })
}
