//! Fan-out/fan-in workflow over parallel git worktrees.
//!
//! `fanline` creates several isolated workspaces (a branch plus a worktree each)
//! from one baseline, tracks them in a persisted session, and later validates
//! and folds their changes back into the baseline. The architecture keeps a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (session merging, naming, change-set
//!   classification, result ordering). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, git, process execution).
//!   Isolated behind small wrappers and traits so tests can script them.
//!
//! Orchestration modules ([`fan_out`], [`gate`], [`coordinator`], [`reconcile`],
//! [`lifecycle`], [`status`]) coordinate core logic with I/O to implement CLI
//! commands.

pub mod context;
pub mod coordinator;
pub mod core;
pub mod exit_codes;
pub mod fan_out;
pub mod gate;
pub mod io;
pub mod lifecycle;
pub mod logging;
pub mod reconcile;
pub mod report;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
