//! Directory / file-share source: copies files from a local or mounted root.

use super::{DownloadProgress, FetchError, UpdateSource};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalSource { root: root.into() }
    }
}

impl UpdateSource for LocalSource {
    /// A non-empty `base_url` is taken as the directory to copy from instead of `root`.
    fn get_data(
        &self,
        remote_name: &str,
        base_url: &str,
        progress: &(dyn Fn(DownloadProgress) + Send + Sync),
        dest: &Path,
    ) -> Result<PathBuf, FetchError> {
        let root = if base_url.is_empty() {
            self.root.clone()
        } else {
            PathBuf::from(base_url)
        };
        let src = root.join(remote_name);
        if !src.is_file() {
            return Err(FetchError::NotFound(src.display().to_string()));
        }
        let copied = fs::copy(&src, dest).map_err(|source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        progress(DownloadProgress {
            downloaded: copied,
            total: Some(copied),
        });
        Ok(dest.to_path_buf())
    }
}
