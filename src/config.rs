use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

pub const STATE_FILE_NAME: &str = "nal_nl2_config.json";
pub const CATALOG_FILE_NAME: &str = "function_templates.json";

/// Overrides the working directory for the state and catalog documents.
pub const HOME_ENV: &str = "NAL2_CALLER_HOME";

/// Resolved locations of the two documents the client reads and writes.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
}

impl AppPaths {
    /// `$NAL2_CALLER_HOME`, else `<data dir>/nal2-caller`, else the current directory.
    pub fn detect() -> Self {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            debug!("Using {} = {:?}", HOME_ENV, dir);
            return Self::at(PathBuf::from(dir));
        }
        if let Some(data_dir) = dirs::data_dir() {
            let root = data_dir.join("nal2-caller");
            debug!("Using data directory {:?}", root);
            return Self::at(root);
        }
        debug!("No data directory available, using current directory");
        Self::at(PathBuf::from("."))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE_NAME)
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.root.join(CATALOG_FILE_NAME)
    }

    pub fn ensure_root(&self) -> std::io::Result<&Path> {
        std::fs::create_dir_all(&self.root)?;
        Ok(&self.root)
    }
}

/// Timeouts used by the session client.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(3),
        }
    }
}
