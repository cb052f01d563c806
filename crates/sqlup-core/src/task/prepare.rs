//! Prepare phase: validate, pre-flight the database, fetch and verify the script.

use super::{SqliteScriptTask, SCRIPT_TASK_NAME};
use crate::checksum;
use crate::db::ConnectionString;
use crate::error::UpdateError;
use crate::source::{DownloadProgress, UpdateSource};
use crate::status::TaskStatus;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

impl SqliteScriptTask {
    /// `NotPrepared -> Prepared | FailedToPrepare`.
    ///
    /// A task with a missing required field becomes `FailedToPrepare` and
    /// returns `Ok` without touching the network or the database. Unreachable
    /// databases, failed fetches and checksum mismatches are fatal errors.
    pub async fn prepare(&mut self, source: Arc<dyn UpdateSource>) -> Result<(), UpdateError> {
        let current = self.status.get();
        if current != TaskStatus::NotPrepared {
            tracing::warn!(
                "{}: prepare called in state {}, ignoring",
                SCRIPT_TASK_NAME,
                current
            );
            return Ok(());
        }

        if let Some(field) = self.config.missing_field() {
            tracing::warn!("{}: {} is empty, task is a noop", SCRIPT_TASK_NAME, field);
            self.status.advance(TaskStatus::FailedToPrepare);
            return Ok(());
        }

        let db_path = self.env.resolve_db_path(&self.config.db_file);
        let connection = ConnectionString::new(&db_path, self.config.password.as_deref());
        self.db_path = Some(db_path.clone());
        self.connection = Some(connection.clone());

        // Fail fast before paying for the download.
        self.check_database(&connection, &db_path).await?;

        let staged = match self.fetch_script(source).await {
            Ok(path) => path,
            Err(e) => {
                self.status.advance(TaskStatus::FailedToPrepare);
                return Err(e);
            }
        };

        if let Some(expected) = self.config.expected_checksum() {
            if let Err(e) = self.verify_checksum(&staged, expected).await {
                remove_staged(&staged);
                return Err(e);
            }
        }

        tracing::info!(
            "{}: prepared successfully; database to patch: {}",
            SCRIPT_TASK_NAME,
            db_path.display()
        );
        self.staged_script = Some(staged);
        self.status.advance(TaskStatus::Prepared);
        Ok(())
    }

    async fn check_database(
        &self,
        connection: &ConnectionString,
        db_path: &Path,
    ) -> Result<(), UpdateError> {
        let unavailable = |source| UpdateError::DatabaseUnavailable {
            task: SCRIPT_TASK_NAME.to_string(),
            path: db_path.to_path_buf(),
            source,
        };
        let conn = self.driver.open(connection).await.map_err(unavailable)?;
        conn.close().await.map_err(unavailable)?;
        tracing::debug!("{}: database reachable ({})", SCRIPT_TASK_NAME, connection);
        Ok(())
    }

    /// Download into a freshly named file under the temp folder.
    async fn fetch_script(&self, source: Arc<dyn UpdateSource>) -> Result<PathBuf, UpdateError> {
        let staged = stage_file(&self.env.temp_dir).map_err(|source| UpdateError::Staging {
            task: SCRIPT_TASK_NAME.to_string(),
            dir: self.env.temp_dir.clone(),
            source,
        })?;

        tracing::info!(
            "{}: downloading {} with base URL {:?} to {}",
            SCRIPT_TASK_NAME,
            self.config.script_file,
            self.env.base_url,
            staged.display()
        );

        let fetched = tokio::task::spawn_blocking({
            let remote = self.config.script_file.clone();
            let base_url = self.env.base_url.clone();
            let dest = staged.clone();
            move || {
                let progress = |p: DownloadProgress| {
                    tracing::trace!(
                        "{}: fetched {} bytes ({:?}%)",
                        SCRIPT_TASK_NAME,
                        p.downloaded,
                        p.percent()
                    );
                };
                source.get_data(&remote, &base_url, &progress, &dest)
            }
        })
        .await;

        match fetched {
            Ok(Ok(path)) => {
                if path != staged {
                    remove_staged(&staged);
                }
                Ok(path)
            }
            Ok(Err(source)) => {
                remove_staged(&staged);
                Err(UpdateError::FetchFailed {
                    task: SCRIPT_TASK_NAME.to_string(),
                    remote: self.config.script_file.clone(),
                    source,
                })
            }
            Err(source) => {
                remove_staged(&staged);
                Err(UpdateError::Join {
                    task: SCRIPT_TASK_NAME.to_string(),
                    source,
                })
            }
        }
    }

    async fn verify_checksum(&self, staged: &Path, expected: &str) -> Result<(), UpdateError> {
        let verified = tokio::task::spawn_blocking({
            let staged = staged.to_path_buf();
            let expected = expected.to_string();
            move || checksum::verify_sha256(&staged, &expected)
        })
        .await
        .map_err(|source| UpdateError::Join {
            task: SCRIPT_TASK_NAME.to_string(),
            source,
        })?
        .map_err(|source| UpdateError::ChecksumUnavailable {
            task: SCRIPT_TASK_NAME.to_string(),
            source,
        })?;

        if !verified.is_match() {
            return Err(UpdateError::ChecksumMismatch {
                task: SCRIPT_TASK_NAME.to_string(),
                expected: verified.expected,
                actual: verified.actual,
            });
        }
        tracing::debug!("{}: checksum verified ({})", SCRIPT_TASK_NAME, verified.actual);
        Ok(())
    }
}

/// Create an empty, uniquely named file in `dir` and keep it on disk.
fn stage_file(dir: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let file = tempfile::Builder::new()
        .prefix("sqlup-")
        .suffix(".sql")
        .tempfile_in(dir)?;
    file.into_temp_path().keep().map_err(|e| e.error)
}

pub(super) fn remove_staged(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                "{}: could not remove staged script {}: {}",
                SCRIPT_TASK_NAME,
                path.display(),
                e
            );
        }
    }
}
