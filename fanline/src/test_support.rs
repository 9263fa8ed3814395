//! Test-only helpers: throwaway git repositories and scripted test runners.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::session::Workspace;
use crate::io::config::{FanlineConfig, config_path, write_config};
use crate::io::session_store::SessionStore;
use crate::io::test_runner::{TestReport, TestRequest, TestRunner};

/// A real git repository at `<tmp>/repo` on branch `main` with one commit.
///
/// Worktrees created for it land next to it in `<tmp>`, mirroring the layout
/// fan-out produces. The editor is disabled in its config, which leaves
/// `.fanline/` untracked in the baseline checkout, as in a real repository.
pub struct TestRepo {
    temp: TempDir,
    root: PathBuf,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        Self::with_files(&[])
    }

    /// Like [`TestRepo::new`], with extra files in the initial commit.
    pub fn with_files(files: &[(&str, &str)]) -> Result<Self> {
        let temp = tempfile::tempdir().context("tempdir")?;
        let root = temp.path().join("repo");
        fs::create_dir_all(&root).context("create repo dir")?;

        run_git(&root, &["init", "-q"])?;
        run_git(&root, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        run_git(&root, &["config", "user.name", "Fanline Test"])?;
        run_git(&root, &["config", "user.email", "fanline-test@local.invalid"])?;
        run_git(&root, &["config", "commit.gpgsign", "false"])?;

        fs::write(root.join("README.md"), "# fixture\n").context("write README")?;
        for (path, contents) in files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::write(&full, contents).with_context(|| format!("write {}", full.display()))?;
        }
        run_git(&root, &["add", "."])?;
        run_git(&root, &["commit", "-q", "-m", "initial"])?;

        let cfg = FanlineConfig {
            editor: crate::io::config::EditorConfig {
                command: Vec::new(),
            },
            ..FanlineConfig::default()
        };
        write_config(&config_path(&root), &cfg)?;

        Ok(Self { temp, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the repo and its worktrees.
    pub fn parent_dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::for_repo(&self.root)
    }

    /// Create branch `id` from `main` with a worktree at `<tmp>/<id>`.
    pub fn add_workspace(&self, id: &str) -> Result<Workspace> {
        let path = self.parent_dir().join(id);
        run_git(&self.root, &["branch", id, "main"])?;
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("non-UTF-8 temp path"))?;
        run_git(&self.root, &["worktree", "add", "-q", path_str, id])?;
        Ok(Workspace {
            id: id.to_string(),
            path,
        })
    }

    /// Commit a file directly on the checked-out branch of `dir`.
    pub fn commit_file(&self, dir: &Path, path: &str, contents: &str, message: &str) -> Result<()> {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&full, contents).with_context(|| format!("write {}", full.display()))?;
        run_git(dir, &["add", "--", path])?;
        run_git(dir, &["commit", "-q", "-m", message])?;
        Ok(())
    }

    /// Run a command in `dir`, panicking on failure, and return trimmed stdout.
    pub fn capture(&self, dir: &Path, args: &[&str]) -> String {
        let out = Command::new(args[0])
            .args(&args[1..])
            .current_dir(dir)
            .output()
            .expect("run command");
        assert!(
            out.status.success(),
            "command failed: {args:?}: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    pub fn branch_exists(&self, branch: &str) -> bool {
        Command::new("git")
            .args(["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(&self.root)
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("run git {args:?}"))?;
    if !output.status.success() {
        return Err(anyhow!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Test runner that returns predetermined reports without spawning processes.
///
/// Reports and delays can be overridden per workspace, keyed by the
/// workspace directory name.
pub struct ScriptedTestRunner {
    default: TestReport,
    overrides: HashMap<String, TestReport>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl ScriptedTestRunner {
    pub fn passing() -> Self {
        Self::with_default(TestReport {
            passed: true,
            timed_out: false,
            output: "1 passed in 0.01s".to_string(),
        })
    }

    pub fn failing(output: &str) -> Self {
        Self::with_default(TestReport {
            passed: false,
            timed_out: false,
            output: output.to_string(),
        })
    }

    fn with_default(default: TestReport) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make the test for workspace `id` fail with `output`.
    pub fn failing_for(mut self, id: &str, output: &str) -> Self {
        self.overrides.insert(
            id.to_string(),
            TestReport {
                passed: false,
                timed_out: false,
                output: output.to_string(),
            },
        );
        self
    }

    /// Sleep before reporting for workspace `id`.
    pub fn delayed_for(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    /// Number of test invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TestRunner for ScriptedTestRunner {
    fn run(&self, request: &TestRequest) -> Result<TestReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = request
            .workdir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Some(delay) = self.delays.get(&key) {
            thread::sleep(*delay);
        }
        Ok(self
            .overrides
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}
