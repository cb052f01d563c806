//! In-memory source: serves registered byte blobs by name.

use super::{DownloadProgress, FetchError, UpdateSource};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.add_file(name, data);
        self
    }

    pub fn add_file(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.insert(name.into(), data.into());
    }

    /// Number of `get_data` calls served so far (hits and misses).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl UpdateSource for MemorySource {
    fn get_data(
        &self,
        remote_name: &str,
        _base_url: &str,
        progress: &(dyn Fn(DownloadProgress) + Send + Sync),
        dest: &Path,
    ) -> Result<PathBuf, FetchError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        let data = files
            .get(remote_name)
            .ok_or_else(|| FetchError::NotFound(remote_name.to_string()))?;
        fs::write(dest, data).map_err(|source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        let len = data.len() as u64;
        progress(DownloadProgress {
            downloaded: len,
            total: Some(len),
        });
        Ok(dest.to_path_buf())
    }
}
