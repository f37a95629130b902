//! Locations of the config file, dump directory and logs.

use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "classcarve";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DUMP_DIR_NAME: &str = "dump";
pub const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    base: PathBuf,
}

impl AppPaths {
    /// Per-user data directory, or the temp directory when none is known.
    pub fn resolve() -> Self {
        let root = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
        Self::with_base(root.join(APP_DIR_NAME))
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join(CONFIG_FILE_NAME)
    }

    pub fn dump_dir(&self) -> PathBuf {
        self.base.join(DUMP_DIR_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base.join(LOG_DIR_NAME)
    }
}
