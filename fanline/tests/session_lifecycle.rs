//! End-to-end fan-out / gated reconcile cycles against real git repositories.

use std::fs;

use fanline::context::RepoContext;
use fanline::core::types::{MergeStatus, RejectReason, SyncStatus};
use fanline::fan_out::fan_out;
use fanline::reconcile::run_gated_reconcile;
use fanline::report::render_gated;
use fanline::test_support::{ScriptedTestRunner, TestRepo};

const CALC: &str = "x = 0\n";
const TEST_CALC: &str = "from calc import x\n\ndef test_x():\n    assert x >= 0\n";

fn ctx(repo: &TestRepo) -> RepoContext {
    RepoContext::open(repo.root()).expect("context")
}

fn calc_repo() -> TestRepo {
    TestRepo::with_files(&[("calc.py", CALC), ("test_calc.py", TEST_CALC)]).expect("repo")
}

#[test]
fn untouched_workspaces_survive_repeated_gated_runs() {
    let repo = TestRepo::new().expect("repo");
    fan_out(&ctx(&repo), 2, None).expect("fan out");
    let runner = ScriptedTestRunner::passing();

    for _ in 0..2 {
        let report = run_gated_reconcile(&ctx(&repo), &runner).expect("gated");

        let reasons: Vec<_> = report.outcomes.iter().map(|o| o.reason()).collect();
        assert_eq!(
            reasons,
            vec![Some(RejectReason::NoChanges), Some(RejectReason::NoChanges)]
        );
        assert!(report.merge.merges.is_empty());
        assert!(!report.lifecycle.session_deleted);

        for id in ["fanline-1", "fanline-2"] {
            assert!(repo.parent_dir().join(id).is_dir(), "{id} dir removed");
            assert!(repo.branch_exists(id), "{id} branch removed");
        }
        let session = repo.session_store().load().expect("session kept");
        assert_eq!(session.branches, vec!["fanline-1", "fanline-2"]);
    }
    assert_eq!(runner.calls(), 0);
}

#[test]
fn accepted_change_lands_and_session_clears_once_everything_is_merged() {
    let repo = calc_repo();
    fan_out(&ctx(&repo), 2, None).expect("fan out");
    let ws1 = repo.parent_dir().join("fanline-1");
    let ws2 = repo.parent_dir().join("fanline-2");
    fs::write(ws1.join("calc.py"), "x = 1\n").expect("edit ws1");
    let runner = ScriptedTestRunner::passing();

    let first = run_gated_reconcile(&ctx(&repo), &runner).expect("first run");
    assert!(first.outcomes[0].is_accepted());
    assert_eq!(first.outcomes[0].changed_path.as_deref(), Some("calc.py"));
    assert_eq!(first.outcomes[1].reason(), Some(RejectReason::NoChanges));
    assert_eq!(first.merge.merges[0].status, MergeStatus::Merged);
    assert_eq!(first.merge.syncs[0].status, SyncStatus::Synced);
    assert!(first.merge.cleanup_issues.is_empty());
    assert_eq!(
        fs::read_to_string(repo.root().join("calc.py")).expect("read"),
        "x = 1\n"
    );
    assert!(!ws1.exists());
    assert!(!repo.branch_exists("fanline-1"));
    assert!(!first.lifecycle.session_deleted);
    assert!(repo.session_store().exists());
    assert_eq!(
        fs::read_to_string(ws2.join("calc.py")).expect("synced"),
        "x = 1\n"
    );
    assert!(
        render_gated(&first)
            .out
            .iter()
            .any(|line| line == "reconcile: workspace=fanline-2 verdict=rejected reason=no-changes")
    );

    fs::write(ws2.join("calc.py"), "x = 2\n").expect("edit ws2");
    let second = run_gated_reconcile(&ctx(&repo), &runner).expect("second run");
    assert_eq!(
        second.outcomes[0].reason(),
        Some(RejectReason::StatusQueryFailed)
    );
    assert!(second.outcomes[1].is_accepted());
    assert_eq!(second.merge.syncs[0].status, SyncStatus::Missing);
    assert!(second.lifecycle.session_deleted);
    assert!(!repo.session_store().exists());
    assert_eq!(
        fs::read_to_string(repo.root().join("calc.py")).expect("read"),
        "x = 2\n"
    );
}

#[test]
fn multi_file_change_is_rejected_and_left_alone() {
    let repo = calc_repo();
    fan_out(&ctx(&repo), 1, None).expect("fan out");
    let ws = repo.parent_dir().join("fanline-1");
    fs::write(ws.join("calc.py"), "x = 3\n").expect("edit");
    fs::write(ws.join("extra.py"), "y = 1\n").expect("add");
    let runner = ScriptedTestRunner::passing();

    let report = run_gated_reconcile(&ctx(&repo), &runner).expect("gated");

    assert_eq!(
        report.outcomes[0].reason(),
        Some(RejectReason::MultipleFilesChanged)
    );
    assert_eq!(runner.calls(), 0);
    assert_eq!(
        fs::read_to_string(repo.root().join("calc.py")).expect("read"),
        CALC
    );
    assert_eq!(fs::read_to_string(ws.join("calc.py")).expect("read"), "x = 3\n");
    assert!(ws.join("extra.py").exists());
    assert!(repo.session_store().exists());
}

#[test]
fn failing_test_keeps_change_uncommitted() {
    let repo = calc_repo();
    fan_out(&ctx(&repo), 1, None).expect("fan out");
    let ws = repo.parent_dir().join("fanline-1");
    fs::write(ws.join("calc.py"), "x = -1\n").expect("edit");
    let runner = ScriptedTestRunner::failing("1 failed in 0.02s");

    let report = run_gated_reconcile(&ctx(&repo), &runner).expect("gated");

    assert_eq!(report.outcomes[0].reason(), Some(RejectReason::TestFailed));
    assert!(
        report.outcomes[0]
            .diagnostics
            .as_deref()
            .is_some_and(|d| d.contains("1 failed"))
    );
    let status = repo.capture(&ws, &["git", "status", "--porcelain"]);
    assert_eq!(status, "M calc.py");
    assert_eq!(
        fs::read_to_string(repo.root().join("calc.py")).expect("read"),
        CALC
    );
}

#[test]
fn repeated_fan_out_appends_to_the_session() {
    let repo = TestRepo::new().expect("repo");
    fan_out(&ctx(&repo), 1, None).expect("first");
    let second = fan_out(&ctx(&repo), 2, None).expect("second");

    let ids: Vec<&str> = second.created.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, vec!["fanline-2", "fanline-3"]);
    let session = repo.session_store().load().expect("session");
    assert_eq!(session.branches, vec!["fanline-1", "fanline-2", "fanline-3"]);
}
