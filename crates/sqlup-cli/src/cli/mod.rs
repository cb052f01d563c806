//! CLI for sqlup.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sqlup_core::{config, logging};
use std::path::{Path, PathBuf};

use commands::{run_apply, run_checksum};

/// Top-level CLI for sqlup.
#[derive(Debug, Parser)]
#[command(name = "sqlup")]
#[command(about = "sqlup: fetch, verify and transactionally apply SQL update scripts", long_about = None)]
pub struct Cli {
    /// Use this config file instead of ~/.config/sqlup/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch a SQL script, verify it and apply it to a database in one transaction.
    Apply(ApplyArgs),

    /// Compute SHA-256 of a file (e.g. a script before publishing it).
    Checksum {
        /// Path to the file.
        path: String,
    },
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Remote name of the script, relative to the base URL.
    #[arg(long, value_name = "NAME")]
    pub script: String,

    /// Database file, relative to the application directory.
    #[arg(long, value_name = "FILE")]
    pub db: String,

    /// Application install directory (default: directory of this executable).
    #[arg(long, value_name = "DIR")]
    pub app_dir: Option<PathBuf>,

    /// HTTP(S) base URL or directory to fetch the script from (default: config base_url).
    #[arg(long, value_name = "URL|DIR")]
    pub base_url: Option<String>,

    /// Password of an encrypted database.
    #[arg(long)]
    pub pwd: Option<String>,

    /// Expected SHA-256 of the script (hex).
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Reserved verify-only mode; the script is still applied.
    #[arg(long)]
    pub cold_run: bool,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        let log_cfg = cfg.logging();
        if logging::init_logging(&log_cfg).is_err() {
            logging::init_logging_stderr(&log_cfg);
        }
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Apply(args) => run_apply(&cfg, args).await?,
            CliCommand::Checksum { path } => run_checksum(Path::new(&path)).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
