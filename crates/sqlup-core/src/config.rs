use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP source parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Seconds allowed for establishing the connection.
    pub connect_timeout_secs: u64,
    /// Seconds allowed for the whole transfer.
    pub timeout_secs: u64,
    /// Maximum number of redirects followed.
    pub max_redirections: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 300,
            max_redirections: 10,
        }
    }
}

/// Log output (optional `[logging]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// File name inside the XDG state dir (`~/.local/state/sqlup/`).
    pub file_name: String,
    /// `tracing` filter directives; `RUST_LOG` still takes precedence.
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_name: "sqlup.log".to_string(),
            filter: None,
        }
    }
}

/// Global configuration loaded from `~/.config/sqlup/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Base URL (or directory) remote script names are resolved against.
    #[serde(default)]
    pub base_url: String,
    /// Folder for staged downloads; defaults to `<system temp>/sqlup`.
    #[serde(default)]
    pub temp_folder: Option<PathBuf>,
    /// Time budget for the whole statement batch of one script.
    pub statement_timeout_secs: u64,
    /// Optional HTTP tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub http: Option<HttpConfig>,
    /// Optional log settings; if missing, built-in defaults are used.
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            temp_folder: None,
            statement_timeout_secs: 30,
            http: None,
            logging: None,
        }
    }
}

impl UpdaterConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_folder
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("sqlup"))
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    pub fn http(&self) -> HttpConfig {
        self.http.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("sqlup")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UpdaterConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UpdaterConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<UpdaterConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: UpdaterConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
