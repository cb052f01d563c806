//! Update tasks and the SQL-script task.
//!
//! An orchestrator builds a task from its typed configuration, calls
//! `prepare` (fetch + verify), later `execute` (apply), and `rollback` when a
//! later task of the same batch fails.

mod execute;
mod prepare;


use crate::db::{ConnectionString, ScriptDriver};
use crate::env::UpdateEnv;
use crate::error::UpdateError;
use crate::source::UpdateSource;
use crate::status::{StatusCell, StatusHandle, TaskStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Name used in log lines and error messages.
pub const SCRIPT_TASK_NAME: &str = "sqlite-script";

/// What an orchestrator drives. The status is the only outcome channel of
/// `prepare` besides a fatal error.
#[async_trait]
pub trait UpdateTask: Send {
    fn description(&self) -> String;

    fn status(&self) -> TaskStatus;

    fn status_handle(&self) -> StatusHandle;

    async fn prepare(&mut self, source: Arc<dyn UpdateSource>) -> Result<(), UpdateError>;

    async fn execute(&mut self, cold_run: bool) -> TaskStatus;

    async fn rollback(&mut self) -> bool;
}

/// Parameters of a SQL-script task, under the names used in update manifests.
///
/// Empty required fields deserialize fine: they turn the task into a no-op.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTaskConfig {
    /// Remote name of the script, resolved by the update source.
    #[serde(rename = "scriptFile", default)]
    pub script_file: String,
    /// Database path relative to the install directory.
    #[serde(rename = "dbFile", default)]
    pub db_file: String,
    /// Password of an encrypted database.
    #[serde(rename = "pwd", default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Expected SHA-256 of the downloaded script, lowercase hex.
    #[serde(
        rename = "sha256-checksum",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sha256_checksum: Option<String>,
}

impl ScriptTaskConfig {
    pub fn new(script_file: impl Into<String>, db_file: impl Into<String>) -> Self {
        ScriptTaskConfig {
            script_file: script_file.into(),
            db_file: db_file.into(),
            ..Default::default()
        }
    }

    /// Name of the first required field that is empty.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.script_file.is_empty() {
            Some("scriptFile")
        } else if self.db_file.is_empty() {
            Some("dbFile")
        } else {
            None
        }
    }

    fn expected_checksum(&self) -> Option<&str> {
        self.sha256_checksum
            .as_deref()
            .filter(|c| !c.trim().is_empty())
    }
}

impl fmt::Debug for ScriptTaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptTaskConfig")
            .field("script_file", &self.script_file)
            .field("db_file", &self.db_file)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("sha256_checksum", &self.sha256_checksum)
            .finish()
    }
}

/// Applies a line-per-statement SQL script to a database in one transaction.
pub struct SqliteScriptTask {
    config: ScriptTaskConfig,
    env: UpdateEnv,
    driver: Arc<dyn ScriptDriver>,
    statement_timeout: Duration,
    status: StatusCell,
    db_path: Option<PathBuf>,
    connection: Option<ConnectionString>,
    staged_script: Option<PathBuf>,
}

impl SqliteScriptTask {
    pub fn new(config: ScriptTaskConfig, env: UpdateEnv, driver: Arc<dyn ScriptDriver>) -> Self {
        SqliteScriptTask {
            config,
            env,
            driver,
            statement_timeout: Duration::from_secs(30),
            status: StatusCell::new(),
            db_path: None,
            connection: None,
            staged_script: None,
        }
    }

    /// Budget for the whole statement batch of one `execute`.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ScriptTaskConfig {
        &self.config
    }

    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    pub fn status_handle(&self) -> StatusHandle {
        self.status.handle()
    }

    /// Absolute database path, known once `prepare` got past validation.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Local copy of the script, set between a successful `prepare` and `execute`.
    pub fn staged_script(&self) -> Option<&Path> {
        self.staged_script.as_deref()
    }

    /// Committed SQL has no generic inverse; scripts that need undo must carry
    /// their own compensating statements. Always succeeds and never touches
    /// the database.
    pub fn rollback(&mut self) -> bool {
        tracing::debug!(
            "{}: rollback requested for {}; nothing to undo",
            SCRIPT_TASK_NAME,
            self.config.script_file
        );
        true
    }
}

#[async_trait]
impl UpdateTask for SqliteScriptTask {
    fn description(&self) -> String {
        format!(
            "{}: apply {} to {}",
            SCRIPT_TASK_NAME, self.config.script_file, self.config.db_file
        )
    }

    fn status(&self) -> TaskStatus {
        SqliteScriptTask::status(self)
    }

    fn status_handle(&self) -> StatusHandle {
        SqliteScriptTask::status_handle(self)
    }

    async fn prepare(&mut self, source: Arc<dyn UpdateSource>) -> Result<(), UpdateError> {
        SqliteScriptTask::prepare(self, source).await
    }

    async fn execute(&mut self, cold_run: bool) -> TaskStatus {
        SqliteScriptTask::execute(self, cold_run).await
    }

    async fn rollback(&mut self) -> bool {
        SqliteScriptTask::rollback(self)
    }
}
