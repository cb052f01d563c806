//! SQLite driver (sqlx).

use super::{ConnectionString, DbError, ScriptConnection, ScriptDriver};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Executor};
use std::time::Duration;

/// Cheap query that forces SQLite to read the file header, so a file that
/// is not a database fails at open time.
const PROBE_SQL: &str = "SELECT count(*) FROM sqlite_master";

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) => DbError {
                code: db.code().map(|c| c.into_owned()),
                message: db.message().to_string(),
            },
            None => DbError::new(e.to_string()),
        }
    }
}

/// Opens one exclusive sqlx connection per call. Never creates the database file.
///
/// Connections behave like stock SQLite: foreign-key enforcement stays off
/// unless the database or script turns it on outside a transaction.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    busy_timeout: Duration,
}

impl SqliteDriver {
    pub fn new(busy_timeout: Duration) -> Self {
        SqliteDriver { busy_timeout }
    }

    fn options(&self, target: &ConnectionString) -> SqliteConnectOptions {
        let opts = SqliteConnectOptions::new()
            .filename(target.db_path())
            .create_if_missing(false)
            .foreign_keys(false)
            .busy_timeout(self.busy_timeout);
        match target.password() {
            // Only honoured by SQLCipher builds; plain SQLite ignores the pragma.
            Some(pwd) => opts.pragma("key", format!("'{}'", pwd.replace('\'', "''"))),
            None => opts,
        }
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        SqliteDriver::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl ScriptDriver for SqliteDriver {
    async fn open(&self, target: &ConnectionString) -> Result<Box<dyn ScriptConnection>, DbError> {
        let mut conn = SqliteConnection::connect_with(&self.options(target)).await?;
        Executor::execute(&mut conn, sqlx::raw_sql(PROBE_SQL)).await?;
        Ok(Box::new(SqliteScriptConnection { conn }))
    }
}

struct SqliteScriptConnection {
    conn: SqliteConnection,
}

impl SqliteScriptConnection {
    // Fully-qualified call; method syntax trips a higher-ranked bound under async_trait.
    async fn run(&mut self, sql: &str) -> Result<u64, DbError> {
        let done = Executor::execute(&mut self.conn, sqlx::raw_sql(sql)).await?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl ScriptConnection for SqliteScriptConnection {
    async fn begin(&mut self) -> Result<(), DbError> {
        self.run("BEGIN").await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        self.run(sql).await
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.run("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.run("ROLLBACK").await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    async fn count_rows(path: &Path, table: &str) -> i64 {
        let opts = SqliteConnectOptions::new().filename(path);
        let mut conn = SqliteConnection::connect_with(&opts).await.unwrap();
        let n: i64 = sqlx::query_scalar(&format!("SELECT count(*) FROM {table}"))
            .fetch_one(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
        n
    }

    fn empty_db(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("app.db");
        std::fs::File::create(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = ConnectionString::new(dir.path().join("missing.db"), None);
        assert!(SqliteDriver::default().open(&target).await.is_err());
        assert!(!dir.path().join("missing.db").exists());
    }

    #[tokio::test]
    async fn open_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = ConnectionString::new(dir.path(), None);
        assert!(SqliteDriver::default().open(&target).await.is_err());
    }

    #[tokio::test]
    async fn open_non_database_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();
        let target = ConnectionString::new(&path, None);
        assert!(SqliteDriver::default().open(&target).await.is_err());
    }

    #[tokio::test]
    async fn commit_makes_statements_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = empty_db(dir.path());
        let mut conn = SqliteDriver::default()
            .open(&ConnectionString::new(&path, None))
            .await
            .unwrap();
        conn.begin().await.unwrap();
        conn.execute("CREATE TABLE t(x INT);").await.unwrap();
        assert_eq!(conn.execute("INSERT INTO t VALUES (1);").await.unwrap(), 1);
        conn.commit().await.unwrap();
        conn.close().await.unwrap();
        assert_eq!(count_rows(&path, "t").await, 1);
    }

    #[tokio::test]
    async fn rollback_discards_statements() {
        let dir = tempfile::tempdir().unwrap();
        let path = empty_db(dir.path());
        let driver = SqliteDriver::default();
        let target = ConnectionString::new(&path, None);

        let mut conn = driver.open(&target).await.unwrap();
        conn.execute("CREATE TABLE t(x INT);").await.unwrap();
        conn.begin().await.unwrap();
        conn.execute("INSERT INTO t VALUES (1);").await.unwrap();
        conn.rollback().await.unwrap();
        conn.close().await.unwrap();
        assert_eq!(count_rows(&path, "t").await, 0);
    }

    #[tokio::test]
    async fn foreign_keys_are_not_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = empty_db(dir.path());
        let mut conn = SqliteDriver::default()
            .open(&ConnectionString::new(&path, None))
            .await
            .unwrap();
        conn.begin().await.unwrap();
        conn.execute("CREATE TABLE p(id INTEGER PRIMARY KEY);")
            .await
            .unwrap();
        conn.execute("CREATE TABLE c(pid INT REFERENCES p(id));")
            .await
            .unwrap();
        assert_eq!(conn.execute("INSERT INTO c VALUES (5);").await.unwrap(), 1);
        conn.commit().await.unwrap();
        conn.close().await.unwrap();
        assert_eq!(count_rows(&path, "c").await, 1);
    }

    #[tokio::test]
    async fn failed_statement_carries_error_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = empty_db(dir.path());
        let mut conn = SqliteDriver::default()
            .open(&ConnectionString::new(&path, None))
            .await
            .unwrap();
        let err = conn
            .execute("INSERT INTO nonexistent_table VALUES (1);")
            .await
            .unwrap_err();
        assert!(err.code.is_some());
        assert!(err.message.contains("nonexistent_table"), "{err}");
    }
}
