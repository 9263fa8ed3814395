//! Fire-and-forget editor launch and window-tiling hints for new workspaces.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::debug;

/// Spawn `command... <path>` and return without waiting for it.
///
/// An empty command is a no-op and returns `Ok(false)`.
pub fn launch_editor(command: &[String], path: &Path) -> Result<bool> {
    let Some((program, args)) = command.split_first() else {
        return Ok(false);
    };
    debug!(program, path = %path.display(), "launching editor");
    Command::new(program)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("spawn editor {program} for {}", path.display()))?;
    Ok(true)
}

/// Best-effort advice for arranging `count` editor windows on this OS.
pub fn tiling_hint(count: usize) -> String {
    let tool = match std::env::consts::OS {
        "macos" => "yabai or an AppleScript",
        "linux" => "wmctrl or xdotool",
        "windows" => "NirCmd or FancyZones",
        _ => return format!("window tiling for {count} windows is not supported on this OS"),
    };
    format!("automatic tiling is not built in; use {tool} to arrange {count} windows")
}
