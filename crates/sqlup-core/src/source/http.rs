//! HTTP(S) source backed by libcurl.

use super::{DownloadProgress, FetchError, UpdateSource};
use crate::config::HttpConfig;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fetches update files with a single GET against `base_url` + remote name.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    http: HttpConfig,
}

impl HttpSource {
    pub fn new(http: HttpConfig) -> Self {
        HttpSource { http }
    }
}

/// Resolve `remote_name` against `base_url`. The base is treated as a
/// directory even when it lacks a trailing slash.
pub(crate) fn resolve_url(base_url: &str, remote_name: &str) -> Result<url::Url, FetchError> {
    let invalid = |url: &str, e: url::ParseError| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    };
    if base_url.is_empty() {
        return url::Url::parse(remote_name).map_err(|e| invalid(remote_name, e));
    }
    let mut base = base_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let base = url::Url::parse(&base).map_err(|e| invalid(base_url, e))?;
    base.join(remote_name).map_err(|e| invalid(remote_name, e))
}

impl UpdateSource for HttpSource {
    fn get_data(
        &self,
        remote_name: &str,
        base_url: &str,
        progress: &(dyn Fn(DownloadProgress) + Send + Sync),
        dest: &Path,
    ) -> Result<PathBuf, FetchError> {
        let url = resolve_url(base_url, remote_name)?;
        let io_err = |source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let mut file = File::create(dest).map_err(io_err)?;
        let mut write_err: Option<io::Error> = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.max_redirections(self.http.max_redirections)?;
        easy.connect_timeout(Duration::from_secs(self.http.connect_timeout_secs))?;
        easy.timeout(Duration::from_secs(self.http.timeout_secs))?;
        easy.progress(true)?;

        let perform = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match file.write_all(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    tracing::warn!("staging write failed: {}", e);
                    write_err = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.progress_function(|dltotal, dlnow, _, _| {
                let total = (dltotal > 0.0).then_some(dltotal as u64);
                progress(DownloadProgress {
                    downloaded: dlnow as u64,
                    total,
                });
                true
            })?;
            transfer.perform()
        };
        if let Some(e) = write_err {
            return Err(io_err(e));
        }
        perform?;

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http {
                url: url.to_string(),
                code,
            });
        }
        file.sync_all().map_err(io_err)?;
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_without_trailing_slash_is_a_directory() {
        let url = resolve_url("https://updates.example.com/app", "init.sql").unwrap();
        assert_eq!(url.as_str(), "https://updates.example.com/app/init.sql");
    }

    #[test]
    fn empty_base_requires_absolute_remote() {
        let url = resolve_url("", "http://127.0.0.1:8080/x.sql").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/x.sql");
        assert!(matches!(
            resolve_url("", "x.sql"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn nested_remote_names_are_kept() {
        let url = resolve_url("http://h/base/", "sql/v2/patch.sql").unwrap();
        assert_eq!(url.as_str(), "http://h/base/sql/v2/patch.sql");
    }
}
