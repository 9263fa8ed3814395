//! Validation coordinator: run the gate for every workspace in parallel.
//!
//! One scoped worker thread per workspace. Workers share nothing mutable; each
//! only touches its own worktree and sends its outcome over a channel. The
//! coordinator waits for exactly one outcome per workspace, then hands them
//! back in session order.

use std::sync::mpsc;
use std::thread;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument};

use crate::core::order::in_session_order;
use crate::core::session::Session;
use crate::core::types::{RejectReason, ValidationOutcome};
use crate::gate::validate_workspace;
use crate::io::config::GateConfig;
use crate::io::test_runner::TestRunner;

/// Validate every tracked workspace and return outcomes in session order.
#[instrument(skip_all, fields(workspaces = session.branches.len()))]
pub fn validate_all<R: TestRunner + ?Sized>(
    session: &Session,
    config: &GateConfig,
    runner: &R,
) -> Result<Vec<ValidationOutcome>> {
    let workspaces = session.workspaces();
    let order: Vec<String> = workspaces.iter().map(|ws| ws.id.clone()).collect();
    let expected = workspaces.len();

    let (tx, rx) = mpsc::channel::<ValidationOutcome>();
    let received = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(expected);
        for workspace in &workspaces {
            let tx = tx.clone();
            handles.push((
                workspace.id.clone(),
                scope.spawn(move || {
                    let outcome = validate_workspace(workspace, config, runner);
                    // The receiver outlives every worker inside this scope.
                    let _ = tx.send(outcome);
                }),
            ));
        }
        drop(tx);

        let mut received = Vec::with_capacity(expected);
        while received.len() < expected {
            match rx.recv() {
                Ok(outcome) => {
                    debug!(
                        workspace = %outcome.workspace,
                        accepted = outcome.is_accepted(),
                        done = received.len() + 1,
                        expected,
                        "outcome received"
                    );
                    received.push(outcome);
                }
                // Every sender is gone: some worker died without reporting.
                Err(_) => break,
            }
        }

        for (id, handle) in handles {
            if handle.join().is_err()
                && !received.iter().any(|o: &ValidationOutcome| o.workspace == id)
            {
                received.push(
                    ValidationOutcome::rejected(id, RejectReason::StatusQueryFailed)
                        .with_diagnostics("validation worker panicked"),
                );
            }
        }
        received
    });

    let ordered = in_session_order(&order, received)
        .map_err(|errors| anyhow!("inconsistent validation results:\n- {}", errors.join("\n- ")))?;
    info!(
        accepted = ordered.iter().filter(|o| o.is_accepted()).count(),
        total = ordered.len(),
        "validation complete"
    );
    Ok(ordered)
}
