//! Session settings stored as `quickcmd.toml` in the working directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "quickcmd.toml";

/// Session settings (TOML).
///
/// Missing fields fall back to the defaults, which reproduce the fixed file
/// names the command log has always used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Command log file name, relative to the working directory.
    pub log_file: String,

    /// Quick-command catalog file name, relative to the working directory.
    pub catalog_file: String,

    /// Shell used to run commands (invoked as `<shell> -c <command>`).
    pub shell: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_file: "command_exec_log.txt".to_string(),
            catalog_file: "config.txt".to_string(),
            shell: PathBuf::from("/bin/sh"),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_file.trim().is_empty() {
            return Err(anyhow!("log_file must not be empty"));
        }
        if self.catalog_file.trim().is_empty() {
            return Err(anyhow!("catalog_file must not be empty"));
        }
        if self.shell.as_os_str().is_empty() {
            return Err(anyhow!("shell must not be empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SessionConfig::default()`.
pub fn load_config(path: &Path) -> Result<SessionConfig> {
    if !path.exists() {
        let cfg = SessionConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SessionConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SessionConfig) -> Result<()> {
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
        assert_eq!(cfg, SessionConfig::default());
        assert_eq!(cfg.log_file, "command_exec_log.txt");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "shell = \"/bin/bash\"\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.shell, PathBuf::from("/bin/bash"));
        assert_eq!(cfg.log_file, "command_exec_log.txt");
        assert_eq!(cfg.catalog_file, "config.txt");
    }

    #[test]
    fn empty_log_file_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "log_file = \"  \"\n").expect("write");

        let err = load_config(&path).expect_err("invalid config");
        assert!(err.to_string().contains("log_file"));
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        let cfg = SessionConfig {
            log_file: "other.log".to_string(),
            ..SessionConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }
}
