//! fanline configuration stored under `.fanline/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// fanline configuration (TOML).
///
/// Hand-edited; every field has a default so a missing file or a partial file
/// both work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FanlineConfig {
    /// Workspace branches are named `<workspace_prefix>-<n>`.
    pub workspace_prefix: String,

    pub gate: GateConfig,

    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GateConfig {
    /// File extensions (without dot) the gate recognizes as source files.
    pub source_extensions: Vec<String>,

    /// Companion test for `foo.py` is the first file named `<prefix>foo.py`.
    pub companion_prefix: String,

    /// Test runner command; the companion test path is appended.
    pub test_command: Vec<String>,

    /// Upper bound for `git status` inside a workspace.
    pub status_timeout_secs: u64,

    /// Upper bound for one test-runner invocation.
    pub test_timeout_secs: u64,

    /// Truncate captured status/test output beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    /// Editor launched per new workspace (path appended). Empty disables it.
    pub command: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            source_extensions: vec!["py".to_string()],
            companion_prefix: "test_".to_string(),
            test_command: vec![
                "pytest".to_string(),
                "--maxfail=1".to_string(),
                "--disable-warnings".to_string(),
                "-q".to_string(),
            ],
            status_timeout_secs: 60,
            test_timeout_secs: 30 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: vec!["code".to_string(), "-n".to_string()],
        }
    }
}

impl Default for FanlineConfig {
    fn default() -> Self {
        Self {
            workspace_prefix: "fanline".to_string(),
            gate: GateConfig::default(),
            editor: EditorConfig::default(),
        }
    }
}

impl GateConfig {
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }
}

impl FanlineConfig {
    pub fn validate(&self) -> Result<()> {
        let prefix = self.workspace_prefix.trim();
        if prefix.is_empty() {
            return Err(anyhow!("workspace_prefix must be non-empty"));
        }
        if prefix.len() != self.workspace_prefix.len()
            || self
                .workspace_prefix
                .chars()
                .any(|ch| ch.is_whitespace() || ch == '/' || ch == '*')
        {
            return Err(anyhow!(
                "workspace_prefix must not contain whitespace, '/' or '*'"
            ));
        }
        if self.gate.source_extensions.is_empty()
            || self
                .gate
                .source_extensions
                .iter()
                .any(|ext| ext.trim().is_empty() || ext.starts_with('.'))
        {
            return Err(anyhow!(
                "gate.source_extensions must be non-empty extensions without a leading dot"
            ));
        }
        if self.gate.companion_prefix.is_empty() {
            return Err(anyhow!("gate.companion_prefix must be non-empty"));
        }
        if self.gate.test_command.is_empty() || self.gate.test_command[0].trim().is_empty() {
            return Err(anyhow!("gate.test_command must be a non-empty array"));
        }
        if self.gate.status_timeout_secs == 0 {
            return Err(anyhow!("gate.status_timeout_secs must be > 0"));
        }
        if self.gate.test_timeout_secs == 0 {
            return Err(anyhow!("gate.test_timeout_secs must be > 0"));
        }
        if self.gate.output_limit_bytes == 0 {
            return Err(anyhow!("gate.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Canonical config path for a repository root.
pub fn config_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".fanline").join("config.toml")
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FanlineConfig::default()`.
pub fn load_config(path: &Path) -> Result<FanlineConfig> {
    if !path.exists() {
        let cfg = FanlineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FanlineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FanlineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, FanlineConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = config_path(temp.path());
        let mut cfg = FanlineConfig::default();
        cfg.gate.source_extensions = vec!["py".to_string(), "pyi".to_string()];
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "workspace_prefix = \"lane\"\n[gate]\ntest_timeout_secs = 5\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.workspace_prefix, "lane");
        assert_eq!(cfg.gate.test_timeout_secs, 5);
        assert_eq!(cfg.gate.companion_prefix, "test_");
    }

    #[test]
    fn rejects_invalid_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[gate]\ntest_command = []\n").expect("write");
        let err = load_config(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains("gate.test_command"));

        let cfg = FanlineConfig {
            workspace_prefix: "a b".to_string(),
            ..FanlineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
