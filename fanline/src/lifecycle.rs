//! Session lifecycle: decide from live state whether the session can go.
//!
//! Nothing here trusts counters from the current run. Directories and branches
//! are looked up again, so the decision is idempotent and survives partial
//! failures and manual edits.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::naming::NamingConvention;
use crate::core::session::Session;
use crate::io::git::Git;
use crate::io::session_store::SessionStore;

/// What is still alive for a session right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveState {
    /// Tracked workspace directories that still exist.
    pub remaining_dirs: Vec<PathBuf>,
    /// Local branches in the workspace naming namespace.
    pub remaining_branches: Vec<String>,
    /// Set when branches could not be listed; the state is then unknown.
    pub branch_query_error: Option<String>,
}

impl LiveState {
    pub fn fully_resolved(&self) -> bool {
        self.remaining_dirs.is_empty()
            && self.remaining_branches.is_empty()
            && self.branch_query_error.is_none()
    }
}

/// Outcome of the lifecycle check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleReport {
    pub live: LiveState,
    pub session_deleted: bool,
}

/// Look up which tracked directories and namespace branches exist.
pub fn derive_live_state(git: &Git, session: &Session, naming: &NamingConvention) -> LiveState {
    let remaining_dirs = session
        .workspaces()
        .into_iter()
        .map(|ws| ws.path)
        .filter(|path| path.exists())
        .collect();

    let (remaining_branches, branch_query_error) = match git.list_branches(&naming.branch_glob()) {
        Ok(branches) => (
            branches
                .into_iter()
                .filter(|b| naming.in_namespace(b))
                .collect(),
            None,
        ),
        Err(err) => {
            warn!(err = %format!("{err:#}"), "could not list workspace branches");
            (Vec::new(), Some(format!("{err:#}")))
        }
    };

    LiveState {
        remaining_dirs,
        remaining_branches,
        branch_query_error,
    }
}

/// Delete the session only if no tracked directory and no namespace branch remain.
#[instrument(skip_all)]
pub fn settle_session(
    store: &SessionStore,
    git: &Git,
    session: &Session,
    naming: &NamingConvention,
) -> Result<LifecycleReport> {
    let live = derive_live_state(git, session, naming);
    if !live.fully_resolved() {
        info!(
            dirs = live.remaining_dirs.len(),
            branches = live.remaining_branches.len(),
            "workspaces remain, session kept"
        );
        return Ok(LifecycleReport {
            live,
            session_deleted: false,
        });
    }
    store.delete()?;
    Ok(LifecycleReport {
        live,
        session_deleted: true,
    })
}
