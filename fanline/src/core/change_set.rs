//! Gate rules applied to a workspace's uncommitted change set.
//!
//! The gate accepts exactly one changed source file per workspace, and only if
//! a companion test exists for it. These rules are pure; the gate module feeds
//! them the live `git status` and filesystem results.

use std::path::Path;

use crate::core::types::{RejectReason, StatusEntry};

/// Pick the single changed source file, or the reason the change set is refused.
///
/// Checks run in a fixed order: empty, more than one path, unrecognized kind.
pub fn single_source_change<'a>(
    entries: &'a [StatusEntry],
    source_extensions: &[String],
) -> Result<&'a StatusEntry, RejectReason> {
    let entry = match entries {
        [] => return Err(RejectReason::NoChanges),
        [entry] => entry,
        _ => return Err(RejectReason::MultipleFilesChanged),
    };
    if !is_source_file(&entry.path, source_extensions) {
        return Err(RejectReason::UnsupportedFileKind);
    }
    Ok(entry)
}

/// True if the path's extension is one of `source_extensions` (without dot).
pub fn is_source_file(path: &str, source_extensions: &[String]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| source_extensions.iter().any(|allowed| allowed == ext))
}

/// File name of the companion test for a changed path: `<prefix><basename>`.
pub fn companion_test_name(changed_path: &str, prefix: &str) -> Option<String> {
    let base = Path::new(changed_path).file_name()?.to_str()?;
    Some(format!("{prefix}{base}"))
}

/// Commit message for an accepted change, embedding the test output.
pub fn commit_message(changed_path: &str, test_output: &str) -> String {
    let output = test_output.trim();
    let output = if output.is_empty() { "(no output)" } else { output };
    format!("fanline: accept {changed_path}\n\ntest output:\n{output}\n")
}
