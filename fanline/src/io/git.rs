//! Git adapter for fanline commands.
//!
//! Branch, worktree, status, commit and merge primitives are all delegated to
//! the `git` CLI; we keep a small, explicit wrapper around the subprocess calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::core::types::StatusEntry;
use crate::io::process::{CommandOutput, run_command_with_timeout};

const STATUS_ARGS: [&str; 4] = ["status", "--porcelain=v1", "-z", "-uall"];

/// Result of a merge that git was able to attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAttempt {
    Merged,
    /// Non-zero exit: a conflict, an unknown ref, or a dirty tree git refused.
    Refused { detail: String },
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Absolute path of the repository (or worktree) top level.
    pub fn toplevel(&self) -> Result<PathBuf> {
        let out = self
            .run_capture(&["rev-parse", "--show-toplevel"])
            .context("not inside a git work tree")?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Return the current branch name (errors on detached HEAD).
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        if name == "HEAD" {
            warn!("detached HEAD detected");
            return Err(anyhow!("detached HEAD (pass a baseline explicitly)"));
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Get status entries (including untracked) in porcelain format.
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let out = self.run_checked(&STATUS_ARGS)?;
        parse_status(&out.stdout)
    }

    /// Like [`Git::status_porcelain`], but bounded by a timeout.
    ///
    /// A timeout, a non-zero exit or truncated output are all errors: a partial
    /// change set must never be classified.
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    pub fn status_porcelain_within(
        &self,
        timeout: Duration,
        output_limit_bytes: usize,
    ) -> Result<Vec<StatusEntry>> {
        let mut cmd = Command::new("git");
        cmd.args(STATUS_ARGS).current_dir(&self.workdir);
        let output = run_command_with_timeout(cmd, timeout, output_limit_bytes)
            .context("run git status")?;
        status_entries(&output, timeout, output_limit_bytes)
    }

    /// Check whether a local branch exists.
    pub fn branch_exists(&self, branch: &str) -> Result<bool> {
        let status = self
            .run(&[
                "show-ref",
                "--verify",
                "--quiet",
                &format!("refs/heads/{branch}"),
            ])?
            .status;
        Ok(status.success())
    }

    /// List local branch names matching a `git branch --list` pattern.
    pub fn list_branches(&self, pattern: &str) -> Result<Vec<String>> {
        let out = self.run_capture(&[
            "branch",
            "--list",
            "--format=%(refname:short)",
            pattern,
        ])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Create `branch` at `start_point` without checking it out.
    #[instrument(skip_all, fields(branch, start_point))]
    pub fn create_branch(&self, branch: &str, start_point: &str) -> Result<()> {
        debug!(branch, start_point, "creating branch");
        self.run_checked(&["branch", branch, start_point])?;
        Ok(())
    }

    /// Checkout an existing branch.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "checking out branch");
        self.run_checked(&["checkout", branch])?;
        Ok(())
    }

    /// Attach a new worktree at `path` on an existing `branch`.
    #[instrument(skip_all, fields(branch))]
    pub fn worktree_add(&self, path: &Path, branch: &str) -> Result<()> {
        debug!(path = %path.display(), branch, "adding worktree");
        let path = path_arg(path)?;
        self.run_checked(&["worktree", "add", path, branch])?;
        Ok(())
    }

    /// Remove a worktree even if it has local modifications.
    pub fn worktree_remove_force(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "removing worktree");
        let path = path_arg(path)?;
        self.run_checked(&["worktree", "remove", "--force", path])?;
        Ok(())
    }

    /// Drop administrative entries for worktrees whose directories are gone.
    pub fn worktree_prune(&self) -> Result<()> {
        self.run_checked(&["worktree", "prune"])?;
        Ok(())
    }

    /// Delete a branch that is fully merged (`git branch -d`).
    pub fn delete_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "deleting branch");
        self.run_checked(&["branch", "-d", branch])?;
        Ok(())
    }

    /// Delete a branch regardless of merge state (`git branch -D`).
    pub fn force_delete_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "force deleting branch");
        self.run_checked(&["branch", "-D", branch])?;
        Ok(())
    }

    /// Stage a single path (additions, modifications and deletions alike).
    pub fn add_path(&self, path: &str) -> Result<()> {
        self.run_checked(&["add", "-A", "--", path])?;
        Ok(())
    }

    /// Drop a path from the index, keeping the working-tree change.
    pub fn unstage_path(&self, path: &str) -> Result<()> {
        self.run_checked(&["reset", "-q", "--", path])?;
        Ok(())
    }

    /// Commit whatever is staged; errors if git refuses (e.g. nothing staged).
    #[instrument(skip_all)]
    pub fn commit(&self, message: &str) -> Result<()> {
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(())
    }

    /// `git merge --no-ff --no-edit <branch>` into the checked-out branch.
    #[instrument(skip_all, fields(branch))]
    pub fn merge_no_ff(&self, branch: &str) -> Result<MergeAttempt> {
        self.merge_with(&["merge", "--no-ff", "--no-edit", branch])
    }

    /// `git merge --no-edit <branch>` into the checked-out branch.
    #[instrument(skip_all, fields(branch))]
    pub fn merge(&self, branch: &str) -> Result<MergeAttempt> {
        self.merge_with(&["merge", "--no-edit", branch])
    }

    /// True while a merge is in progress (`MERGE_HEAD` exists).
    pub fn merge_in_progress(&self) -> Result<bool> {
        let out = self.run(&["rev-parse", "-q", "--verify", "MERGE_HEAD"])?;
        Ok(out.status.success())
    }

    /// Abort an in-progress merge; a no-op when none is in progress.
    pub fn merge_abort(&self) -> Result<()> {
        if !self.merge_in_progress()? {
            return Ok(());
        }
        debug!("aborting merge");
        self.run_checked(&["merge", "--abort"])?;
        Ok(())
    }

    fn merge_with(&self, args: &[&str]) -> Result<MergeAttempt> {
        let output = self.run(args)?;
        if output.status.success() {
            debug!("merge succeeded");
            return Ok(MergeAttempt::Merged);
        }
        let mut detail = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !detail.is_empty() {
                detail.push('\n');
            }
            detail.push_str(stderr.trim());
        }
        warn!(args = %args.join(" "), "merge refused");
        Ok(MergeAttempt::Refused { detail })
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("non-UTF-8 path {}", path.display()))
}

fn status_entries(
    output: &CommandOutput,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<Vec<StatusEntry>> {
    if output.timed_out {
        return Err(anyhow!("git status timed out after {timeout:?}"));
    }
    if !output.status.success() {
        return Err(anyhow!(
            "git status failed: {}",
            output.stderr_text().trim()
        ));
    }
    if output.stdout_truncated > 0 {
        return Err(anyhow!(
            "git status output exceeded {output_limit_bytes} bytes"
        ));
    }
    parse_status(&output.stdout)
}

/// Parse `git status --porcelain=v1 -z` output.
///
/// Records are NUL-terminated and paths are raw, so non-ASCII names arrive
/// unescaped. A rename or copy record is followed by a record holding the
/// original path, which is skipped.
fn parse_status(out: &[u8]) -> Result<Vec<StatusEntry>> {
    let mut entries = Vec::new();
    let mut records = out.split(|b| *b == 0).filter(|r| !r.is_empty());
    while let Some(record) = records.next() {
        let record = std::str::from_utf8(record).map_err(|_| {
            anyhow!(
                "non-UTF-8 path in git status: {}",
                String::from_utf8_lossy(record)
            )
        })?;
        let entry = parse_status_record(record)?;
        if entry.code.contains(['R', 'C']) && records.next().is_none() {
            return Err(anyhow!("rename record without original path: '{record}'"));
        }
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_status_record(record: &str) -> Result<StatusEntry> {
    if record.len() < 4 || !record.is_char_boundary(2) || record.as_bytes()[2] != b' ' {
        return Err(anyhow!("unexpected porcelain record: '{record}'"));
    }
    Ok(StatusEntry {
        code: record[..2].to_string(),
        path: record[3..].to_string(),
    })
}
