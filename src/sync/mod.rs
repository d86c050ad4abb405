//! Transfer of staging directories to a remote and pruning of old remote backups.
//!
//! The [Remote] trait is the only seam the orchestrator talks to. [Rclone]
//! implements it by running the [rclone](https://rclone.org) executable.

mod rclone;

#[cfg(test)]
pub(crate) mod fake;

pub use rclone::Rclone;

use std::io;
use std::path::Path;

use derive_more::{Display, Error};

/// A remote storage that backups are copied to.
pub trait Remote {
    /// Copy the directory tree `local_dir` to `remote_path`.
    fn upload(&self, local_dir: &Path, remote_path: &str) -> Result<(), SyncError>;

    /// Delete objects below `remote_path` that are older than `min_age_days`.
    fn prune(&self, remote_path: &str, min_age_days: u32) -> Result<(), SyncError>;
}

/// Remote path of the backup run identified by `timestamp`.
///
/// Every run gets its own namespace below `destination`.
pub fn remote_path(destination: &str, timestamp: &str) -> String {
    format!("{}/{timestamp}", destination.trim_end_matches('/'))
}

#[derive(Debug, Display, Error)]
/// Errors of a [Remote] operation.
pub enum SyncError {
    /// The sync executable is not installed.
    #[display("{program} not found")]
    NotInstalled { program: String },
    /// The sync executable could not be started.
    #[display("Running {program} failed: {source}")]
    Spawn { program: String, source: io::Error },
    /// The sync executable ran but reported a failure.
    #[display("{command} exited with {}: {stderr}", exit_description(*code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl SyncError {
    /// Whether the sync tool is missing from this machine.
    pub fn is_not_installed(&self) -> bool {
        matches!(self, Self::NotInstalled { .. })
    }
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_path_per_run() {
        assert_eq!(
            remote_path("gdrive:ad-manager-backups", "2026-03-08T090507Z"),
            "gdrive:ad-manager-backups/2026-03-08T090507Z"
        );
        assert_eq!(
            remote_path("s3:bucket/backups/", "2026-03-08T090507Z"),
            "s3:bucket/backups/2026-03-08T090507Z"
        );
    }

    #[test]
    fn test_failed_display_contains_stderr() {
        let err = SyncError::Failed {
            command: "rclone copy a b --progress".into(),
            code: Some(7),
            stderr: "disk quota exceeded".into(),
        };
        assert_eq!(
            err.to_string(),
            "rclone copy a b --progress exited with status 7: disk quota exceeded"
        );
    }
}
