//! Update sources: where staged scripts are fetched from.
//!
//! Sources are blocking (libcurl, filesystem copies); the task calls them from
//! `spawn_blocking`. A source writes the fetched bytes to the destination the
//! task hands it and returns the path it actually wrote.

mod http;
mod local;
mod memory;

pub use http::HttpSource;
pub use local::LocalSource;
pub use memory::MemorySource;

use std::io;
use std::path::{Path, PathBuf};

/// Progress report for a running fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    /// Total size when the source knows it.
    pub total: Option<u64>,
}

impl DownloadProgress {
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) | None => None,
            Some(t) => Some(((self.downloaded.min(t) * 100) / t) as u8),
        }
    }
}

/// Why a fetch failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("GET {url} returned HTTP {code}")]
    Http { url: String, code: u32 },
    #[error("{0} not found in source")]
    NotFound(String),
    #[error("write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A place update files can be fetched from.
pub trait UpdateSource: Send + Sync {
    /// Fetch `remote_name` (relative to `base_url`, which may be empty) into
    /// `dest`. Returns the path holding the fetched bytes.
    fn get_data(
        &self,
        remote_name: &str,
        base_url: &str,
        progress: &(dyn Fn(DownloadProgress) + Send + Sync),
        dest: &Path,
    ) -> Result<PathBuf, FetchError>;
}
