//! Where the application lives and where downloads are staged.

use crate::config::UpdaterConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct UpdateEnv {
    /// Install directory; relative database paths are resolved against it.
    pub application_dir: PathBuf,
    /// Folder for staged downloads.
    pub temp_dir: PathBuf,
    /// Base URL handed to update sources.
    pub base_url: String,
}

impl UpdateEnv {
    pub fn new(application_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        UpdateEnv {
            application_dir: application_dir.into(),
            temp_dir: temp_dir.into(),
            base_url: String::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_config(cfg: &UpdaterConfig, application_dir: impl Into<PathBuf>) -> Self {
        UpdateEnv::new(application_dir, cfg.temp_dir()).with_base_url(cfg.base_url.clone())
    }

    /// Install directory of the running executable.
    pub fn current_application_dir() -> std::io::Result<PathBuf> {
        let exe = std::env::current_exe()?;
        Ok(exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn resolve_db_path(&self, db_file: &str) -> PathBuf {
        self.application_dir.join(db_file)
    }
}
