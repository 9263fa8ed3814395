//! Test-runner adapter for the validation gate.
//!
//! The [`TestRunner`] trait decouples the gate from the concrete runner
//! (pytest by default). Tests use scripted runners that return predetermined
//! reports without spawning processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument};

use crate::io::process::run_command_with_timeout;

/// Parameters for one test-runner invocation.
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// Workspace root; the runner's working directory.
    pub workdir: PathBuf,
    /// Companion test file to run.
    pub test_path: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

/// What the test runner reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub passed: bool,
    pub timed_out: bool,
    /// Combined stdout/stderr, bounded by the request's output limit.
    pub output: String,
}

/// Abstraction over external test runners.
///
/// Implementations are shared across validation workers, hence `Sync`.
pub trait TestRunner: Sync {
    /// Run the test. `Err` means the runner could not be run at all.
    fn run(&self, request: &TestRequest) -> Result<TestReport>;
}

/// Runs `command... <test_path>` in the workspace.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    command: Vec<String>,
}

impl CommandTestRunner {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(anyhow!("test command must be non-empty"));
        }
        Ok(Self { command })
    }
}

impl TestRunner for CommandTestRunner {
    #[instrument(
        skip_all,
        fields(test = %request.test_path.display(), timeout_secs = request.timeout.as_secs())
    )]
    fn run(&self, request: &TestRequest) -> Result<TestReport> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("test command must be non-empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(&request.test_path)
            .current_dir(&request.workdir);

        info!(workdir = %request.workdir.display(), "running companion test");
        let output = run_command_with_timeout(cmd, request.timeout, request.output_limit_bytes)?;
        let passed = output.succeeded();
        debug!(passed, timed_out = output.timed_out, "test finished");
        Ok(TestReport {
            passed,
            timed_out: output.timed_out,
            output: output.combined_text("test"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(dir: &std::path::Path) -> TestRequest {
        let test_path = dir.join("test_a.py");
        std::fs::write(&test_path, "").expect("write");
        TestRequest {
            workdir: dir.to_path_buf(),
            test_path,
            timeout: Duration::from_secs(10),
            output_limit_bytes: 1024,
        }
    }

    #[test]
    fn zero_exit_passes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = CommandTestRunner::new(vec!["true".to_string()]).expect("runner");
        let report = runner.run(&request(temp.path())).expect("run");
        assert!(report.passed);
    }

    #[test]
    fn non_zero_exit_fails_with_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = CommandTestRunner::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 1 failed; exit 1".to_string(),
        ])
        .expect("runner");
        let report = runner.run(&request(temp.path())).expect("run");
        assert!(!report.passed);
        assert!(report.output.contains("1 failed"));
    }

    #[test]
    fn forking_test_command_times_out_promptly() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = CommandTestRunner::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "sleep 15; true".to_string(),
        ])
        .expect("runner");
        let mut req = request(temp.path());
        req.timeout = Duration::from_secs(1);

        let started = std::time::Instant::now();
        let report = runner.run(&req).expect("run");
        assert!(report.timed_out);
        assert!(!report.passed);
        assert!(report.output.contains("[test timed out and was killed]"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandTestRunner::new(Vec::new()).is_err());
    }
}
