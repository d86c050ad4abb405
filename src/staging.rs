//! Per-run staging directory holding everything destined for the remote.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Compact ISO 8601 UTC format naming staging directories and remote paths.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%SZ";

/// Format `time` as a run timestamp.
pub fn timestamp(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Timestamp of the current run.
pub fn now() -> String {
    timestamp(Utc::now())
}

/// A staging directory exclusively owned by one run.
///
/// Dropping a [StagingDir] never removes it. Only [StagingDir::remove] does,
/// which the caller invokes after a confirmed upload.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Create the staging directory at `path`.
    ///
    /// Missing parents are created, the directory itself must not exist yet.
    pub fn create(path: PathBuf) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir(&path)?;
        log::debug!(target: "staging", "Created staging directory: {}", path.display());

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Delete the staging directory and everything in it.
    pub fn remove(self) -> io::Result<()> {
        fs::remove_dir_all(&self.path)?;
        log::debug!(target: "staging", "Removed staging directory: {}", self.path.display());
        Ok(())
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_timestamp_format() {
        let time = Utc.with_ymd_and_hms(2026, 3, 8, 9, 5, 7).unwrap();
        assert_eq!(timestamp(time), "2026-03-08T090507Z");
    }

    #[test]
    fn test_create_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("staging").join("2026-03-08T090507Z");

        let staging = StagingDir::create(path.clone()).unwrap();
        assert!(staging.path().is_dir());

        let err = StagingDir::create(path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_remove_deletes_contents() {
        let temp = TempDir::new().unwrap();
        let staging = StagingDir::create(temp.path().join("run")).unwrap();
        fs::create_dir_all(staging.path().join("brands/acme")).unwrap();
        fs::write(staging.path().join("brands/acme/config.json"), "{}").unwrap();

        let path = staging.path().to_path_buf();
        staging.remove().unwrap();
        assert!(!path.exists());
    }
}
