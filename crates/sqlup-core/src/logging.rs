//! Logging init: file under XDG state dir, or graceful fallback to stderr.

use crate::config::LoggingConfig;
use anyhow::{bail, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,sqlup=debug,sqlup_core=debug";

/// Writer that is either a file or stderr (used when file clone fails).
enum LogSink {
    File(std::fs::File),
    Stderr,
}

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::File(f) => f.write(buf),
            LogSink::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::File(f) => f.flush(),
            LogSink::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct SharedLogFile(std::fs::File);

impl<'a> MakeWriter<'a> for SharedLogFile {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(LogSink::File)
            .unwrap_or(LogSink::Stderr)
    }
}

/// Filter directives when `RUST_LOG` is unset: configured, else built-in.
fn filter_directives(cfg: &LoggingConfig) -> &str {
    cfg.filter
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FILTER)
}

fn env_filter(cfg: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(cfg)))
}

/// Log file for `cfg` inside `dir`. The name must be a bare file name.
fn log_file_in(dir: &Path, cfg: &LoggingConfig) -> Result<PathBuf> {
    let name = Path::new(&cfg.file_name);
    if cfg.file_name.is_empty() || name.file_name() != Some(name.as_os_str()) {
        bail!("logging.file_name must be a plain file name, got {:?}", cfg.file_name);
    }
    Ok(dir.join(name))
}

/// Initialize structured logging to `~/.local/state/sqlup/<file_name>`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging(cfg: &LoggingConfig) -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("sqlup")?;
    let log_dir = xdg_dirs.get_state_home().join("sqlup");
    let log_file_path = log_file_in(&log_dir, cfg)?;

    fs::create_dir_all(&log_dir)?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cfg))
        .with_writer(BoxMakeWriter::new(SharedLogFile(file)))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {}", e))?;

    tracing::info!("sqlup logging initialized at {}", log_file_path.display());
    Ok(log_file_path)
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails so the CLI doesn't crash.
pub fn init_logging_stderr(cfg: &LoggingConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(cfg))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
