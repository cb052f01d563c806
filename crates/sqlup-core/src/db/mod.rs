//! Database driver seam used by script tasks.
//!
//! A task only needs {open, begin, execute, commit, rollback, close}; any
//! SQLite client exposing those can drive it. `SqliteDriver` is the sqlx one.

mod sqlite;

pub use sqlite::SqliteDriver;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where and how to connect. Derived once per task during prepare.
///
/// Display and Debug never print the password.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    db_path: PathBuf,
    password: Option<String>,
}

impl ConnectionString {
    /// An empty password means no credential.
    pub fn new(db_path: impl Into<PathBuf>, password: Option<&str>) -> Self {
        ConnectionString {
            db_path: db_path.into(),
            password: password.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Data Source={};Version=3;", self.db_path.display())?;
        if self.password.is_some() {
            f.write_str("Password=***;")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionString({})", self)
    }
}

/// Error reported by the database, with its code when the driver has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbError {
    pub code: Option<String>,
    pub message: String,
}

impl DbError {
    pub fn new(message: impl Into<String>) -> Self {
        DbError {
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DbError {}

/// Opens connections for script execution.
#[async_trait]
pub trait ScriptDriver: Send + Sync {
    /// Open a connection. Implementations must fail here for a path that is
    /// not a usable database, not on the first statement.
    async fn open(&self, target: &ConnectionString) -> Result<Box<dyn ScriptConnection>, DbError>;
}

/// One exclusive connection. Dropping it releases the underlying handle and
/// discards an uncommitted transaction.
#[async_trait]
pub trait ScriptConnection: Send {
    async fn begin(&mut self) -> Result<(), DbError>;

    /// Run one statement; returns rows affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, DbError>;

    async fn commit(&mut self) -> Result<(), DbError>;

    async fn rollback(&mut self) -> Result<(), DbError>;

    async fn close(self: Box<Self>) -> Result<(), DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_string_without_password() {
        let cs = ConnectionString::new("/opt/app/app.db", Some(""));
        assert_eq!(cs.password(), None);
        assert_eq!(cs.to_string(), "Data Source=/opt/app/app.db;Version=3;");
    }

    #[test]
    fn connection_string_never_shows_password() {
        let cs = ConnectionString::new("/opt/app/app.db", Some("hunter2"));
        assert_eq!(cs.password(), Some("hunter2"));
        let shown = format!("{cs} {cs:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("Password=***;"));
    }

    #[test]
    fn db_error_display_includes_code() {
        let e = DbError {
            code: Some("1".into()),
            message: "no such table: nonexistent_table".into(),
        };
        assert_eq!(e.to_string(), "no such table: nonexistent_table (code 1)");
        assert_eq!(DbError::new("boom").to_string(), "boom");
    }
}
