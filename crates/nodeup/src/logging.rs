//! File logging for the installer.
//!
//! The TUI owns stdout, so tracing output goes to a log file instead.
//! `RUST_LOG` overrides the default `info` filter.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_LOG_PATH: &str = "/var/log/nodeup/installer.log";
pub const FALLBACK_LOG_PATH: &str = "/tmp/nodeup-installer.log";

fn open_append(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))
}

/// Open the log file, trying the fallback location when `path` is unusable.
pub fn open_log_file(path: &Path) -> Result<(File, PathBuf)> {
    match open_append(path) {
        Ok(file) => Ok((file, path.to_path_buf())),
        Err(primary) => {
            let fallback = PathBuf::from(FALLBACK_LOG_PATH);
            let file = open_append(&fallback)
                .with_context(|| format!("{primary:#}; fallback also failed"))?;
            Ok((file, fallback))
        }
    }
}

/// Install the global subscriber. Returns the path actually written to.
pub fn init(path: &Path) -> Result<PathBuf> {
    let (file, used) = open_log_file(path)?;
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
    Ok(used)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/installer.log");
        let (_, used) = open_log_file(&path).unwrap();
        assert_eq!(used, path);
        assert!(path.exists());
    }
}
