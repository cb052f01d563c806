//! `sqlup apply` – prepare and execute one script task.

use crate::cli::ApplyArgs;
use anyhow::{Context, Result};
use sqlup_core::config::UpdaterConfig;
use sqlup_core::db::SqliteDriver;
use sqlup_core::env::UpdateEnv;
use sqlup_core::source::{HttpSource, LocalSource, UpdateSource};
use sqlup_core::{ScriptTaskConfig, SqliteScriptTask, TaskStatus, UpdateTask};
use std::sync::Arc;

fn is_http(base_url: &str) -> bool {
    let lower = base_url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// HTTP(S) base URLs are fetched with curl; anything else is a directory.
pub(crate) fn source_for(cfg: &UpdaterConfig, base_url: &str) -> Result<Arc<dyn UpdateSource>> {
    if is_http(base_url) {
        return Ok(Arc::new(HttpSource::new(cfg.http())));
    }
    let root = if base_url.is_empty() {
        std::env::current_dir().context("current directory")?
    } else {
        base_url.into()
    };
    Ok(Arc::new(LocalSource::new(root)))
}

pub async fn run_apply(cfg: &UpdaterConfig, args: ApplyArgs) -> Result<()> {
    let app_dir = match args.app_dir {
        Some(dir) => dir,
        None => UpdateEnv::current_application_dir().context("locate application directory")?,
    };
    let base_url = args.base_url.unwrap_or_else(|| cfg.base_url.clone());
    let source = source_for(cfg, &base_url)?;
    // LocalSource already knows its root.
    let env_base = if is_http(&base_url) { base_url } else { String::new() };
    let env = UpdateEnv::from_config(cfg, app_dir).with_base_url(env_base);

    let task_config = ScriptTaskConfig {
        script_file: args.script,
        db_file: args.db,
        password: args.pwd,
        sha256_checksum: args.sha256,
    };
    let driver = Arc::new(SqliteDriver::new(cfg.statement_timeout()));
    let mut task = SqliteScriptTask::new(task_config, env, driver)
        .with_statement_timeout(cfg.statement_timeout());

    tracing::info!("{}", task.description());
    task.prepare(source).await?;
    let status = match task.status() {
        // FailedToPrepare without an error means missing fields: execute is a no-op.
        TaskStatus::Prepared | TaskStatus::FailedToPrepare => task.execute(args.cold_run).await,
        other => other,
    };
    println!("{}", status);
    if status != TaskStatus::Successful {
        anyhow::bail!("update task finished as {}; see log for details", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_detection_is_case_insensitive() {
        assert!(is_http("HTTPS://updates.example.com/"));
        assert!(is_http("http://127.0.0.1:8080"));
        assert!(!is_http("/srv/updates"));
        assert!(!is_http(""));
    }
}
