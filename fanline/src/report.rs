//! Line-oriented command reports.
//!
//! Renderers return lines instead of printing so tests can assert on them.
//! `out` lines go to stdout, `warnings` to stderr prefixed with `warning: `.

use crate::core::types::{CleanupIssue, MergeStatus, SyncStatus, ValidationOutcome, Verdict};
use crate::fan_out::FanOutReport;
use crate::reconcile::{GatedReport, PlainReport};
use crate::status::StatusReport;

/// Rendered report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub out: Vec<String>,
    pub warnings: Vec<String>,
}

impl Rendered {
    pub fn print(&self) {
        for line in &self.out {
            println!("{line}");
        }
        for warning in &self.warnings {
            eprintln!("warning: {warning}");
        }
    }
}

pub fn render_fan_out(report: &FanOutReport) -> Rendered {
    let mut rendered = Rendered::default();
    for ws in &report.created {
        rendered.out.push(format!(
            "fan-out: workspace={} base={} path={}",
            ws.id,
            report.base_branch,
            ws.path.display()
        ));
    }
    for (branch, err) in &report.failed {
        rendered
            .warnings
            .push(format!("could not create branch {branch}: {err}"));
    }
    for orphan in &report.orphans {
        let state = if orphan.rolled_back {
            "branch deleted again"
        } else {
            "branch left behind, not tracked by the session"
        };
        rendered.warnings.push(format!(
            "worktree for {} failed ({state}): {}",
            orphan.branch, orphan.detail
        ));
    }
    for (branch, err) in &report.editor_failures {
        rendered
            .warnings
            .push(format!("editor for {branch} did not start: {err}"));
    }
    if let Some(hint) = &report.tiling_hint {
        rendered.out.push(format!("fan-out: {hint}"));
    }
    match &report.session {
        Some(session) => rendered.out.push(format!(
            "fan-out: created={} tracked={}",
            report.created.len(),
            session.branches.len()
        )),
        None => rendered
            .out
            .push("fan-out: created=0 (no session written)".to_string()),
    }
    rendered
}

pub fn render_plain(report: &PlainReport) -> Rendered {
    let mut rendered = Rendered::default();
    for id in &report.merged {
        rendered.out.push(format!(
            "reconcile: workspace={id} merged into {}",
            report.base_branch
        ));
    }
    push_cleanup(&mut rendered, &report.cleanup_issues);
    rendered.out.push(format!(
        "reconcile: merged={} session={}",
        report.merged.len(),
        if report.session_deleted {
            "deleted"
        } else {
            "absent"
        }
    ));
    rendered
}

pub fn render_gated(report: &GatedReport) -> Rendered {
    let mut rendered = Rendered::default();
    for outcome in &report.outcomes {
        rendered.out.push(outcome_line(outcome));
    }
    for merge in &report.merge.merges {
        match &merge.status {
            MergeStatus::Merged => rendered.out.push(format!(
                "reconcile: workspace={} merged into {}",
                merge.workspace, report.base_branch
            )),
            MergeStatus::Conflicted { detail } => {
                rendered.out.push(format!(
                    "reconcile: workspace={} conflict, left in place",
                    merge.workspace
                ));
                rendered
                    .warnings
                    .push(format!("merge of {} conflicted: {}", merge.workspace, detail.trim()));
            }
        }
    }
    for sync in &report.merge.syncs {
        match &sync.status {
            SyncStatus::Synced => rendered.out.push(format!(
                "reconcile: workspace={} synced with {}",
                sync.workspace, report.base_branch
            )),
            SyncStatus::Missing => rendered.out.push(format!(
                "reconcile: workspace={} missing, not synced",
                sync.workspace
            )),
            SyncStatus::Failed { detail } => rendered.warnings.push(format!(
                "sync of {} with {} failed: {}",
                sync.workspace,
                report.base_branch,
                detail.trim()
            )),
        }
    }
    push_cleanup(&mut rendered, &report.merge.cleanup_issues);
    if let Some(err) = &report.lifecycle.live.branch_query_error {
        rendered
            .warnings
            .push(format!("could not list workspace branches: {err}"));
    }

    let accepted = report.outcomes.iter().filter(|o| o.is_accepted()).count();
    let merged = report
        .merge
        .merges
        .iter()
        .filter(|m| m.status == MergeStatus::Merged)
        .count();
    let session = if report.lifecycle.session_deleted {
        "deleted".to_string()
    } else {
        format!(
            "kept (dirs={} branches={})",
            report.lifecycle.live.remaining_dirs.len(),
            report.lifecycle.live.remaining_branches.len()
        )
    };
    rendered.out.push(format!(
        "reconcile: accepted={accepted} merged={merged} rejected={} session={session}",
        report.outcomes.len() - accepted
    ));
    rendered
}

pub fn render_status(report: &StatusReport) -> Rendered {
    let mut rendered = Rendered::default();
    rendered
        .out
        .push(format!("status: base={}", report.base_branch));
    for ws in &report.workspaces {
        rendered.out.push(format!(
            "status: workspace={} dir={} branch={}",
            ws.id,
            yes_no(ws.dir_exists),
            yes_no(ws.branch_exists)
        ));
    }
    for branch in &report.untracked_branches {
        rendered
            .warnings
            .push(format!("branch {branch} matches the naming convention but is not tracked"));
    }
    rendered.out.push(format!(
        "status: resolved={}",
        yes_no(report.fully_resolved)
    ));
    rendered
}

fn outcome_line(outcome: &ValidationOutcome) -> String {
    let mut line = match outcome.verdict {
        Verdict::Accepted => format!("reconcile: workspace={} verdict=accepted", outcome.workspace),
        Verdict::Rejected(reason) => format!(
            "reconcile: workspace={} verdict=rejected reason={reason}",
            outcome.workspace
        ),
    };
    if let Some(path) = &outcome.changed_path {
        line.push_str(&format!(" file={path}"));
    }
    if let Some(test) = &outcome.test_path {
        line.push_str(&format!(" test={}", test.display()));
    }
    if !outcome.is_accepted() {
        for diag in outcome.diagnostics.iter().flat_map(|d| d.trim().lines()) {
            line.push_str(&format!("\n    {diag}"));
        }
    }
    line
}

fn push_cleanup(rendered: &mut Rendered, issues: &[CleanupIssue]) {
    for issue in issues {
        rendered.warnings.push(format!(
            "cleanup of {} ({}) failed: {}",
            issue.workspace,
            issue.step.as_str(),
            issue.detail
        ));
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
