//! Fatal prepare-time errors.
//!
//! These abort the whole update batch. Failures while executing a script are
//! not errors at this level: they end up in `TaskStatus::Failed`.

use crate::checksum::ChecksumError;
use crate::db::DbError;
use crate::source::FetchError;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("{task}: failed to open database {}: {source}", .path.display())]
    DatabaseUnavailable {
        task: String,
        path: PathBuf,
        #[source]
        source: DbError,
    },

    #[error("{task}: failed to get {remote} from source: {source}")]
    FetchFailed {
        task: String,
        remote: String,
        #[source]
        source: FetchError,
    },

    #[error("{task}: checksums do not match; expected {expected} but got {actual}")]
    ChecksumMismatch {
        task: String,
        expected: String,
        actual: String,
    },

    #[error("{task}: {source}")]
    ChecksumUnavailable {
        task: String,
        #[source]
        source: ChecksumError,
    },

    #[error("{task}: cannot stage download in {}: {source}", .dir.display())]
    Staging {
        task: String,
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{task}: background worker failed: {source}")]
    Join {
        task: String,
        #[source]
        source: tokio::task::JoinError,
    },
}
