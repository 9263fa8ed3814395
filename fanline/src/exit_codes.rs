//! Stable exit codes for fanline CLI commands.
//!
//! 2 is left to clap for usage errors.

/// Command succeeded (including gated runs that rejected every workspace).
pub const OK: i32 = 0;
/// Invalid input, invalid config, unreadable working context, or other errors.
pub const INVALID: i32 = 1;
/// A reconcile/status command found no session file. Nothing was touched.
pub const NO_SESSION: i32 = 3;
/// The session file exists but could not be parsed.
pub const SESSION_CORRUPT: i32 = 4;
/// Plain reconcile hit a merge conflict and stopped.
pub const CONFLICT: i32 = 5;
