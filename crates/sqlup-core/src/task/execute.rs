//! Execute phase: apply the staged script in one transaction.

use super::prepare::remove_staged;
use super::{SqliteScriptTask, SCRIPT_TASK_NAME};
use crate::db::{ConnectionString, DbError, ScriptConnection};
use crate::script::{self, Statement};
use crate::status::{StatusCell, TaskStatus};
use std::io;
use std::path::{Path, PathBuf};

/// Why a statement batch did not commit.
enum BatchFailure {
    Begin(DbError),
    Read { path: PathBuf, error: io::Error },
    Statement { statement: Statement, error: DbError },
    Commit(DbError),
}

impl SqliteScriptTask {
    /// `Prepared -> Successful | Failed`, returning the new status.
    ///
    /// Database failures never escalate: the transaction is rolled back, the
    /// failing statement is logged and the status becomes `Failed`.
    /// `cold_run` is reserved for a verify-only mode; the script is always
    /// applied.
    pub async fn execute(&mut self, cold_run: bool) -> TaskStatus {
        if let Some(field) = self.config.missing_field() {
            tracing::warn!("{}: {} is empty, task is a noop", SCRIPT_TASK_NAME, field);
            self.status.advance(TaskStatus::Successful);
            return TaskStatus::Successful;
        }

        let current = self.status.get();
        if current.is_terminal() {
            tracing::warn!(
                "{}: execute called on finished task ({}), skipping",
                SCRIPT_TASK_NAME,
                current
            );
            return current;
        }

        if cold_run {
            tracing::debug!("{}: cold run requested; applying anyway", SCRIPT_TASK_NAME);
        }

        let (connection, staged) = match (self.connection.clone(), self.staged_script.take()) {
            (Some(connection), Some(staged)) => (connection, staged),
            _ => {
                tracing::error!(
                    "{}: execute called before a successful prepare",
                    SCRIPT_TASK_NAME
                );
                self.status.advance(TaskStatus::Failed);
                return TaskStatus::Failed;
            }
        };

        let outcome = self.apply(&connection, &staged).await;
        remove_staged(&staged);
        self.status.advance(outcome);
        outcome
    }

    async fn apply(&self, connection: &ConnectionString, staged: &Path) -> TaskStatus {
        let mut conn = match self.driver.open(connection).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(
                    "{}: failed to open database {}: {}",
                    SCRIPT_TASK_NAME,
                    connection,
                    e
                );
                return TaskStatus::Failed;
            }
        };

        let batch = tokio::time::timeout(
            self.statement_timeout,
            run_batch(conn.as_mut(), staged, &self.status),
        )
        .await;

        let outcome = match batch {
            Ok(Ok(applied)) => {
                tracing::info!(
                    "{}: applied {} statement(s) to {}",
                    SCRIPT_TASK_NAME,
                    applied,
                    connection
                );
                TaskStatus::Successful
            }
            Ok(Err(failure)) => {
                log_failure(&failure);
                if !matches!(failure, BatchFailure::Begin(_)) {
                    if let Err(e) = conn.rollback().await {
                        tracing::warn!("{}: rollback failed: {}", SCRIPT_TASK_NAME, e);
                    }
                }
                TaskStatus::Failed
            }
            Err(_) => {
                tracing::error!(
                    "{}: script did not finish within {:?}; discarding transaction",
                    SCRIPT_TASK_NAME,
                    self.statement_timeout
                );
                // The connection may still be busy with the cancelled statement;
                // dropping it closes the handle and discards the open transaction.
                drop(conn);
                return TaskStatus::Failed;
            }
        };

        if let Err(e) = conn.close().await {
            tracing::warn!("{}: closing database failed: {}", SCRIPT_TASK_NAME, e);
        }
        outcome
    }
}

/// Begin, read the staged script, run it line by line, commit.
/// Returns the number of statements applied.
async fn run_batch(
    conn: &mut dyn ScriptConnection,
    staged: &Path,
    status: &StatusCell,
) -> Result<usize, BatchFailure> {
    conn.begin().await.map_err(BatchFailure::Begin)?;
    status.advance(TaskStatus::Pending);
    let statements = script::read_script(staged)
        .await
        .map_err(|error| BatchFailure::Read {
            path: staged.to_path_buf(),
            error,
        })?;
    for statement in &statements {
        if let Err(error) = conn.execute(&statement.sql).await {
            return Err(BatchFailure::Statement {
                statement: statement.clone(),
                error,
            });
        }
    }
    conn.commit().await.map_err(BatchFailure::Commit)?;
    Ok(statements.len())
}

fn log_failure(failure: &BatchFailure) {
    match failure {
        BatchFailure::Begin(e) => {
            tracing::error!("{}: cannot begin transaction: {}", SCRIPT_TASK_NAME, e);
        }
        BatchFailure::Read { path, error } => {
            tracing::error!(
                "{}: cannot read staged script {}: {}",
                SCRIPT_TASK_NAME,
                path.display(),
                error
            );
        }
        BatchFailure::Statement { statement, error } => {
            tracing::error!(
                "{}: commands execution failed with code {} at line {}: {}. Command: {}",
                SCRIPT_TASK_NAME,
                error.code.as_deref().unwrap_or("?"),
                statement.line,
                error.message,
                statement.sql
            );
        }
        BatchFailure::Commit(e) => {
            tracing::error!("{}: commit failed: {}", SCRIPT_TASK_NAME, e);
        }
    }
}
