//! Validation gate: decide whether one workspace's change is acceptable.
//!
//! The gate only ever mutates a workspace after its companion test passed: it
//! stages the single changed path and commits it on the workspace branch.
//! Every failure is folded into a [`ValidationOutcome`]; nothing here returns
//! an error to the caller.

use tracing::{debug, info, instrument, warn};

use crate::core::change_set::{commit_message, companion_test_name, single_source_change};
use crate::core::session::Workspace;
use crate::core::types::{RejectReason, ValidationOutcome};
use crate::io::companion::find_companion_test;
use crate::io::config::GateConfig;
use crate::io::git::Git;
use crate::io::test_runner::{TestRequest, TestRunner};

/// Run the gate against one workspace.
#[instrument(skip_all, fields(workspace = %workspace.id))]
pub fn validate_workspace<R: TestRunner + ?Sized>(
    workspace: &Workspace,
    config: &GateConfig,
    runner: &R,
) -> ValidationOutcome {
    let id = workspace.id.as_str();
    let git = Git::new(&workspace.path);

    debug!("querying change set");
    let entries =
        match git.status_porcelain_within(config.status_timeout(), config.output_limit_bytes) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "status query failed");
                return ValidationOutcome::rejected(id, RejectReason::StatusQueryFailed)
                    .with_diagnostics(format!("{err:#}"));
            }
        };

    let changed = match single_source_change(&entries, &config.source_extensions) {
        Ok(entry) => entry.path.clone(),
        Err(reason) => {
            debug!(%reason, changed = entries.len(), "change set refused");
            let mut outcome = ValidationOutcome::rejected(id, reason);
            if let [entry] = entries.as_slice() {
                outcome = outcome.with_changed_path(entry.path.clone());
            }
            return outcome;
        }
    };

    let Some(test_name) = companion_test_name(&changed, &config.companion_prefix) else {
        return ValidationOutcome::rejected(id, RejectReason::UnsupportedFileKind)
            .with_changed_path(changed);
    };
    let Some(test_path) = find_companion_test(&workspace.path, &test_name) else {
        debug!(test_name, "no companion test");
        return ValidationOutcome::rejected(id, RejectReason::MissingCompanionTest)
            .with_changed_path(changed);
    };

    let request = TestRequest {
        workdir: workspace.path.clone(),
        test_path: test_path.clone(),
        timeout: config.test_timeout(),
        output_limit_bytes: config.output_limit_bytes,
    };
    let report = match runner.run(&request) {
        Ok(report) => report,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "test runner could not run");
            return ValidationOutcome::rejected(id, RejectReason::TestFailed)
                .with_changed_path(changed)
                .with_test_path(test_path)
                .with_diagnostics(format!("{err:#}"));
        }
    };
    if !report.passed {
        info!(timed_out = report.timed_out, "companion test failed");
        return ValidationOutcome::rejected(id, RejectReason::TestFailed)
            .with_changed_path(changed)
            .with_test_path(test_path)
            .with_diagnostics(report.output);
    }

    if let Err(err) = commit_change(&git, &changed, &report.output) {
        warn!(err = %format!("{err:#}"), "stage or commit failed");
        return ValidationOutcome::rejected(id, RejectReason::StageOrCommitFailed)
            .with_changed_path(changed)
            .with_test_path(test_path)
            .with_diagnostics(format!("{err:#}\n\ntest output:\n{}", report.output));
    }

    info!(changed = %changed, "workspace accepted");
    ValidationOutcome::accepted(id, changed, test_path, report.output)
}

/// Stage exactly `path` and commit it. A failed commit unstages the path again.
fn commit_change(git: &Git, path: &str, test_output: &str) -> anyhow::Result<()> {
    git.add_path(path)?;
    if let Err(err) = git.commit(&commit_message(path, test_output)) {
        if let Err(reset_err) = git.unstage_path(path) {
            warn!(err = %reset_err, path, "failed to unstage after commit failure");
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Verdict;
    use crate::test_support::{ScriptedTestRunner, TestRepo};
    use std::fs;

    fn gate_config() -> GateConfig {
        GateConfig::default()
    }

    fn workspace(repo: &TestRepo) -> Workspace {
        repo.add_workspace("fanline-1").expect("workspace")
    }

    #[test]
    fn clean_workspace_is_no_changes() {
        let repo = TestRepo::new().expect("repo");
        let ws = workspace(&repo);
        let runner = ScriptedTestRunner::passing();

        let outcome = validate_workspace(&ws, &gate_config(), &runner);
        assert_eq!(outcome.verdict, Verdict::Rejected(RejectReason::NoChanges));
        assert_eq!(runner.calls(), 0);
    }

    #[test]
    fn two_changed_files_are_rejected_without_running_tests() {
        let repo = TestRepo::new().expect("repo");
        let ws = workspace(&repo);
        fs::write(ws.path.join("a.py"), "a = 1\n").expect("write");
        fs::write(ws.path.join("b.py"), "b = 1\n").expect("write");
        fs::write(ws.path.join("test_a.py"), "").expect("write");
        let runner = ScriptedTestRunner::passing();

        let outcome = validate_workspace(&ws, &gate_config(), &runner);
        assert_eq!(
            outcome.verdict,
            Verdict::Rejected(RejectReason::MultipleFilesChanged)
        );
        assert_eq!(runner.calls(), 0);
    }

    #[test]
    fn non_source_change_is_unsupported() {
        let repo = TestRepo::new().expect("repo");
        let ws = workspace(&repo);
        fs::write(ws.path.join("notes.md"), "hi\n").expect("write");

        let outcome = validate_workspace(&ws, &gate_config(), &ScriptedTestRunner::passing());
        assert_eq!(outcome.reason(), Some(RejectReason::UnsupportedFileKind));
        assert_eq!(outcome.changed_path.as_deref(), Some("notes.md"));
    }

    #[test]
    fn missing_companion_is_rejected() {
        let repo = TestRepo::new().expect("repo");
        let ws = workspace(&repo);
        fs::write(ws.path.join("calc.py"), "x = 1\n").expect("write");

        let outcome = validate_workspace(&ws, &gate_config(), &ScriptedTestRunner::passing());
        assert_eq!(outcome.reason(), Some(RejectReason::MissingCompanionTest));
    }

    #[test]
    fn failing_test_keeps_change_uncommitted() {
        let repo = TestRepo::with_files(&[("tests/test_calc.py", "def test_x():\n    pass\n")])
            .expect("repo");
        let ws = workspace(&repo);
        fs::write(ws.path.join("calc.py"), "x = 1\n").expect("write");
        let runner = ScriptedTestRunner::failing("1 failed");

        let outcome = validate_workspace(&ws, &gate_config(), &runner);
        assert_eq!(outcome.reason(), Some(RejectReason::TestFailed));
        assert_eq!(outcome.diagnostics.as_deref(), Some("1 failed"));
        assert_eq!(
            outcome.test_path,
            Some(ws.path.join("tests").join("test_calc.py"))
        );
        let status = Git::new(&ws.path).status_porcelain().expect("status");
        assert_eq!(status.len(), 1);
    }

    #[test]
    fn passing_test_commits_the_change() {
        let repo = TestRepo::with_files(&[("test_calc.py", "def test_x():\n    pass\n")])
            .expect("repo");
        let ws = workspace(&repo);
        fs::write(ws.path.join("calc.py"), "x = 1\n").expect("write");
        let runner = ScriptedTestRunner::passing();

        let outcome = validate_workspace(&ws, &gate_config(), &runner);
        assert!(outcome.is_accepted(), "outcome: {outcome:?}");
        assert_eq!(runner.calls(), 1);
        assert!(
            Git::new(&ws.path)
                .status_porcelain()
                .expect("status")
                .is_empty()
        );
        let msg = repo.capture(&ws.path, &["git", "log", "-1", "--pretty=%B"]);
        assert!(msg.contains("fanline: accept calc.py"));
        assert!(msg.contains("1 passed"));
    }

    #[test]
    fn missing_workspace_is_status_query_failed() {
        let repo = TestRepo::new().expect("repo");
        let ws = Workspace {
            id: "fanline-9".to_string(),
            path: repo.parent_dir().join("fanline-9"),
        };
        let outcome = validate_workspace(&ws, &gate_config(), &ScriptedTestRunner::passing());
        assert_eq!(outcome.reason(), Some(RejectReason::StatusQueryFailed));
        assert!(outcome.diagnostics.is_some());
    }

    #[test]
    fn non_ascii_source_and_companion_are_accepted() {
        let repo = TestRepo::with_files(&[("test_café.py", "def test_x():\n    pass\n")])
            .expect("repo");
        let ws = workspace(&repo);
        fs::write(ws.path.join("café.py"), "x = 1\n").expect("write");
        let runner = ScriptedTestRunner::passing();

        let outcome = validate_workspace(&ws, &gate_config(), &runner);
        assert!(outcome.is_accepted(), "outcome: {outcome:?}");
        assert_eq!(outcome.changed_path.as_deref(), Some("café.py"));
        assert_eq!(outcome.test_path, Some(ws.path.join("test_café.py")));
        assert!(
            Git::new(&ws.path)
                .status_porcelain()
                .expect("status")
                .is_empty()
        );
    }

    #[cfg(unix)]
    #[test]
    fn refused_commit_unstages_and_keeps_test_output() {
        use std::os::unix::fs::PermissionsExt;

        let repo = TestRepo::with_files(&[("test_calc.py", "def test_x():\n    pass\n")])
            .expect("repo");
        let ws = workspace(&repo);
        let hook = repo.root().join(".git").join("hooks").join("pre-commit");
        fs::create_dir_all(hook.parent().expect("hooks dir")).expect("mkdir");
        fs::write(&hook, "#!/bin/sh\necho refused by hook >&2\nexit 1\n").expect("hook");
        fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).expect("chmod");
        fs::write(ws.path.join("calc.py"), "x = 1\n").expect("write");
        let runner = ScriptedTestRunner::passing();

        let outcome = validate_workspace(&ws, &gate_config(), &runner);
        assert_eq!(outcome.reason(), Some(RejectReason::StageOrCommitFailed));
        assert_eq!(runner.calls(), 1);
        let diagnostics = outcome.diagnostics.as_deref().expect("diagnostics");
        assert!(diagnostics.contains("refused by hook"));
        assert!(diagnostics.contains("1 passed"));

        let status = Git::new(&ws.path).status_porcelain().expect("status");
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].code, "??");
        assert_eq!(status[0].path, "calc.py");
        let log = repo.capture(&ws.path, &["git", "log", "--oneline"]);
        assert_eq!(log.lines().count(), 1);
    }
}
