//! Integrity verification of staged scripts (SHA-256).
//!
//! Hashing is streamed so large scripts never have to sit in memory. A failure
//! to compute the digest is an error; a digest that does not match is a normal
//! result the caller inspects.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const BUF_SIZE: usize = 64 * 1024;

/// The digest could not be computed (file missing, unreadable, ...).
#[derive(Debug, thiserror::Error)]
#[error("cannot checksum {}: {source}", .path.display())]
pub struct ChecksumError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Outcome of comparing a file against an expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMatch {
    pub expected: String,
    pub actual: String,
}

impl ChecksumMatch {
    pub fn is_match(&self) -> bool {
        self.actual == self.expected
    }
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded.
pub fn sha256_path(path: &Path) -> Result<String, ChecksumError> {
    let io_err = |source| ChecksumError {
        path: path.to_path_buf(),
        source,
    };
    let mut f = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = match f.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(e)),
        };
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hash `path` and compare it with `expected`. The comparison is exact:
/// the digest is lowercase hex and anything else is a mismatch.
pub fn verify_sha256(path: &Path, expected: &str) -> Result<ChecksumMatch, ChecksumError> {
    let actual = sha256_path(path)?;
    Ok(ChecksumMatch {
        expected: expected.to_string(),
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sha256_path_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_path_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(
            digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn verify_treats_uppercase_expected_as_a_different_digest() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let m = verify_sha256(
            f.path(),
            "5891B5B522D5DF086D0FF0B110FBD9D21BB4FC7163AF34D08286A2E846F6BE03",
        )
        .unwrap();
        assert!(!m.is_match());
        assert_eq!(
            m.actual,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn verify_accepts_exact_lowercase_digest() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let m = verify_sha256(
            f.path(),
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03",
        )
        .unwrap();
        assert!(m.is_match());
    }

    #[test]
    fn verify_reports_both_digests_on_mismatch() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let wrong = "0".repeat(64);
        let m = verify_sha256(f.path(), &wrong).unwrap();
        assert!(!m.is_match());
        assert_eq!(m.expected, wrong);
        assert_eq!(
            m.actual,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn missing_file_is_an_error_not_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.sql");
        let err = verify_sha256(&missing, &"0".repeat(64)).unwrap_err();
        assert_eq!(err.path, missing);
        assert_eq!(err.source.kind(), io::ErrorKind::NotFound);
    }
}
