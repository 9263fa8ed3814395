//! Repository context shared by every command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::core::naming::NamingConvention;
use crate::io::config::{FanlineConfig, config_path, load_config};
use crate::io::git::Git;
use crate::io::session_store::SessionStore;

/// Baseline repository root plus its loaded configuration.
#[derive(Debug, Clone)]
pub struct RepoContext {
    pub root: PathBuf,
    pub config: FanlineConfig,
    pub naming: NamingConvention,
}

impl RepoContext {
    /// Resolve the repository containing `cwd` and load its config.
    pub fn discover(cwd: &Path) -> Result<Self> {
        let root = Git::new(cwd)
            .toplevel()
            .with_context(|| format!("resolve repository for {}", cwd.display()))?;
        Self::open(root)
    }

    /// Use `root` as the repository root without asking git.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = load_config(&config_path(&root))?;
        let naming = NamingConvention::new(&config.workspace_prefix)?;
        debug!(root = %root.display(), prefix = naming.prefix(), "repository context");
        Ok(Self {
            root,
            config,
            naming,
        })
    }

    pub fn git(&self) -> Git {
        Git::new(&self.root)
    }

    pub fn store(&self) -> SessionStore {
        SessionStore::for_repo(&self.root)
    }

    /// Directory new workspaces are created in: the repository's parent.
    pub fn parent_dir(&self) -> Result<PathBuf> {
        self.root
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("repository root {} has no parent", self.root.display()))
    }
}
