//! Session persistence (`.fanline/session.json`).
//!
//! Missing and corrupt files are distinct, typed conditions: a reconcile
//! command must be able to tell "nothing to do" from "refuse to guess".

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::session::Session;

/// No session file exists at the expected path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNotFound {
    pub path: PathBuf,
}

impl fmt::Display for SessionNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no session found at {} (run `fanline fan-out` first)",
            self.path.display()
        )
    }
}

impl std::error::Error for SessionNotFound {}

/// The session file exists but does not decode as a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCorrupt {
    pub path: PathBuf,
    pub detail: String,
}

impl fmt::Display for SessionCorrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session file {} is corrupt: {}",
            self.path.display(),
            self.detail
        )
    }
}

impl std::error::Error for SessionCorrupt {}

/// Loads, saves and deletes the session file for one repository root.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the canonical location under `repo_root`.
    pub fn for_repo(repo_root: &Path) -> Self {
        Self::new(session_path(repo_root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session.
    ///
    /// Fails with [`SessionNotFound`] when the file is absent and with
    /// [`SessionCorrupt`] when it cannot be parsed; both are recoverable via
    /// `anyhow::Error::downcast_ref`.
    pub fn load(&self) -> Result<Session> {
        debug!(path = %self.path.display(), "loading session");
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(SessionNotFound {
                    path: self.path.clone(),
                }
                .into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read session {}", self.path.display()));
            }
        };
        let session: Session = serde_json::from_str(&contents).map_err(|err| SessionCorrupt {
            path: self.path.clone(),
            detail: err.to_string(),
        })?;
        debug!(
            base_branch = %session.base_branch,
            branches = session.branches.len(),
            "session loaded"
        );
        Ok(session)
    }

    /// Load the session, mapping only [`SessionNotFound`] to `None`.
    pub fn load_optional(&self) -> Result<Option<Session>> {
        match self.load() {
            Ok(session) => Ok(Some(session)),
            Err(err) if err.downcast_ref::<SessionNotFound>().is_some() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Atomically write the session to disk (temp file + rename).
    pub fn save(&self, session: &Session) -> Result<()> {
        debug!(
            path = %self.path.display(),
            branches = session.branches.len(),
            "writing session"
        );
        let mut buf = serde_json::to_string_pretty(session).context("serialize session")?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }

    /// Remove the session file. Returns `false` if it was already gone.
    pub fn delete(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "session deleted");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("remove session {}", self.path.display()))
            }
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Canonical session path for a repository root.
pub fn session_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".fanline").join("session.json")
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("session path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp session {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace session {}", path.display()))?;
    Ok(())
}
