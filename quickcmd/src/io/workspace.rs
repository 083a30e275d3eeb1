//! Working-directory scaffolding: the catalog, the settings file, and the log path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::config::{CONFIG_FILE_NAME, SessionConfig, write_config};
use crate::core::catalog::{Catalog, parse_catalog};

/// Default working directory name under the user's home.
pub const DEFAULT_DIR_NAME: &str = "Quick_Command";

const CATALOG_TEMPLATE: &str = "\
# Quick commands.
#
# Each entry is a title line followed by the command it runs.
# '#' starts a comment; blank lines are ignored.
#
# Example:
# Disk usage
# du -sh .
";

/// Canonical paths within a working directory.
#[derive(Debug, Clone)]
pub struct QuickPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub catalog_path: PathBuf,
    pub log_path: PathBuf,
}

impl QuickPaths {
    pub fn new(root: impl Into<PathBuf>, config: &SessionConfig) -> Self {
        let root = root.into();
        Self {
            config_path: root.join(CONFIG_FILE_NAME),
            catalog_path: root.join(&config.catalog_file),
            log_path: root.join(&config.log_file),
            root,
        }
    }
}

/// `~/Quick_Command`, or a relative `Quick_Command` when no home is known.
pub fn default_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR_NAME))
}

/// Create `path` (and parents) if it does not exist yet.
pub fn prepare_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))?;
    debug!(path = %path.display(), "created directory");
    Ok(())
}

/// Create `path` with `initial` contents if it is missing. Existing files are untouched.
pub fn prepare_file(path: &Path, initial: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, initial).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), "created file");
    Ok(())
}

/// Prepare the working directory, catalog template and settings file.
///
/// Safe to re-run: nothing that already exists is overwritten.
pub fn init_workspace(root: &Path, config: &SessionConfig) -> Result<QuickPaths> {
    let paths = QuickPaths::new(root, config);
    prepare_dir(&paths.root)?;
    prepare_file(&paths.catalog_path, CATALOG_TEMPLATE)?;
    if !paths.config_path.exists() {
        write_config(&paths.config_path, config)?;
    }
    Ok(paths)
}

/// Read and parse the catalog; a missing file is an empty catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    if !path.exists() {
        return Ok(Catalog::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(parse_catalog(&contents))
}
