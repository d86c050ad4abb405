//! A single backup run: snapshot, collect, upload, prune and clean up.
//!
//! ```text
//! START -> COLLECTING -> NO_DEST_CONFIGURED
//!                     -> UPLOADING -> PRUNING -> DONE
//!                                  -> UPLOAD_FAILED
//! ```
//!
//! The staging directory is only deleted after the upload was confirmed. Every
//! other terminal state leaves it on disk for manual recovery.

use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};

use crate::backends::{
    ArtifactSummary, Artifacts, Backup, CollectError, Database, DatabaseSummary, SnapshotError,
};
use crate::project::Project;
use crate::staging::StagingDir;
use crate::sync::{self, Remote, SyncError};

/// Default age in days after which remote backups are pruned.
pub const DEFAULT_RETENTION_DAYS: NonZeroU32 = match NonZeroU32::new(30) {
    Some(days) => days,
    None => panic!("retention must be at least one day"),
};

/// Settings of one run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Remote destination understood by the sync tool.
    ///
    /// [None] or an empty string selects local-only mode.
    pub destination: Option<String>,
    /// Prune remote backups older than this many days. [None] disables pruning.
    ///
    /// Zero days is unrepresentable: it would delete the backup just uploaded.
    pub retention_days: Option<NonZeroU32>,
    /// Only check preconditions and report what would be done.
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            destination: None,
            retention_days: Some(DEFAULT_RETENTION_DAYS),
            dry_run: false,
        }
    }
}

impl RunConfig {
    /// The configured destination, if it is not blank.
    pub fn destination(&self) -> Option<&str> {
        self.destination
            .as_deref()
            .map(str::trim)
            .filter(|dest| !dest.is_empty())
    }
}

/// Terminal states of a backup run.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[display("no destination configured")]
    NoDestConfigured,
    #[display("done")]
    Done,
    #[display("upload failed")]
    UploadFailed,
    #[display("dry run")]
    DryRun,
}

/// Terminal state of a run that got past the collection.
#[derive(Debug)]
pub enum Outcome {
    /// Uploaded and cleaned up locally.
    Complete {
        remote_path: String,
        /// Whether pruning of old remote backups succeeded.
        pruned: bool,
    },
    /// No destination configured, the staging directory is the backup.
    LocalOnly { staging: PathBuf },
    /// The upload did not happen or failed, the staging directory is kept.
    UploadFailed { staging: PathBuf, error: SyncError },
    /// Nothing was written or uploaded.
    DryRun { remote_path: Option<String> },
}

impl Outcome {
    /// Whether the run counts as successful.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::UploadFailed { .. })
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Complete { .. } => Stage::Done,
            Self::LocalOnly { .. } => Stage::NoDestConfigured,
            Self::UploadFailed { .. } => Stage::UploadFailed,
            Self::DryRun { .. } => Stage::DryRun,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct Run {
    pub timestamp: String,
    pub database: DatabaseSummary,
    pub artifacts: ArtifactSummary,
    pub outcome: Outcome,
}

/// Machine readable form of a [Run].
#[derive(Debug, serde::Serialize)]
pub struct RunReport<'a> {
    pub timestamp: &'a str,
    pub status: Stage,
    pub success: bool,
    pub database: &'a DatabaseSummary,
    pub artifacts: &'a ArtifactSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Run {
    pub fn report(&self) -> RunReport<'_> {
        let (staging, remote_path, error) = match &self.outcome {
            Outcome::Complete { remote_path, .. } => (None, Some(remote_path.as_str()), None),
            Outcome::LocalOnly { staging } => (Some(staging.as_path()), None, None),
            Outcome::UploadFailed { staging, error } => {
                (Some(staging.as_path()), None, Some(error.to_string()))
            }
            Outcome::DryRun { remote_path } => (None, remote_path.as_deref(), None),
        };

        RunReport {
            timestamp: &self.timestamp,
            status: self.outcome.stage(),
            success: self.outcome.is_success(),
            database: &self.database,
            artifacts: &self.artifacts,
            staging,
            remote_path,
            error,
        }
    }
}

#[derive(Debug, Display, Error, From)]
/// Errors aborting a run before anything was uploaded.
pub enum RunError {
    /// The primary datastore does not exist.
    #[display("database not found at {} - nothing to back up", _0.display())]
    DatabaseMissing(#[error(ignore)] PathBuf),
    /// The staging directory could not be created.
    #[display("Unable to create staging directory {}: {source}", path.display())]
    Staging { path: PathBuf, source: io::Error },
    /// Snapshotting the datastore failed.
    #[display("Database snapshot failed: {_0}")]
    #[from]
    Snapshot(SnapshotError),
    /// Collecting the auxiliary files failed.
    #[display("Collecting files failed: {_0}")]
    #[from]
    Collect(CollectError),
}

/// Run a backup of `project` identified by `timestamp`.
///
/// An [Err] means the run was aborted before the upload. Upload failures are
/// reported through [Outcome::UploadFailed].
pub fn run<R: Remote>(
    project: &Project,
    config: &RunConfig,
    remote: &R,
    timestamp: &str,
) -> Result<Run, RunError> {
    log::info!(target: "orchestrator", "[backup] {timestamp}");
    if config.dry_run {
        log::warn!(target: "orchestrator", "Running in dry-run mode");
    }

    if !project.database().is_file() {
        return Err(RunError::DatabaseMissing(project.database().to_path_buf()));
    }

    log::info!(target: "orchestrator", "Collecting files...");
    let staging_path = project.staging_dir(timestamp);
    let staging = if config.dry_run {
        None
    } else {
        let staging = StagingDir::create(staging_path.clone()).map_err(|source| {
            RunError::Staging {
                path: staging_path.clone(),
                source,
            }
        })?;
        Some(staging)
    };

    let database = Database::default().backup(project, &staging_path, config.dry_run)?;
    let artifacts = Artifacts.backup(project, &staging_path, config.dry_run)?;
    let finish = |outcome| Run {
        timestamp: timestamp.to_string(),
        database,
        artifacts,
        outcome,
    };

    let destination = config.destination();
    let Some(staging) = staging else {
        let remote_path = destination.map(|dest| sync::remote_path(dest, timestamp));
        if let Some(remote_path) = &remote_path {
            log::info!(target: "orchestrator", "Would upload {} to {remote_path}", staging_path.display());
        }
        return Ok(finish(Outcome::DryRun { remote_path }));
    };

    let Some(destination) = destination else {
        log::info!(target: "orchestrator", "No backup destination configured.");
        log::info!(target: "orchestrator", "Local snapshot saved at: {}", staging.path().display());
        log::info!(target: "orchestrator", "Set BACKUP_RCLONE_DEST=gdrive:ad-manager-backups (or similar) to enable cloud.");
        return Ok(finish(Outcome::LocalOnly {
            staging: staging.into_path(),
        }));
    };

    log::info!(target: "orchestrator", "Uploading to {destination}...");
    let remote_path = sync::remote_path(destination, timestamp);
    if let Err(error) = remote.upload(staging.path(), &remote_path) {
        if error.is_not_installed() {
            log::error!(target: "orchestrator", "{error}, skipping cloud upload. Install: https://rclone.org/install/");
        } else {
            log::error!(target: "orchestrator", "Upload failed: {error}");
        }
        log::error!(target: "orchestrator", "Cloud upload failed. Local backup kept at: {}", staging.path().display());
        return Ok(finish(Outcome::UploadFailed {
            staging: staging.into_path(),
            error,
        }));
    }
    log::info!(target: "orchestrator", "Uploaded to {remote_path}");

    let pruned = match config.retention_days {
        Some(days) => match remote.prune(destination, days.get()) {
            Ok(()) => {
                log::info!(target: "orchestrator", "Old backups (>{days} days) pruned");
                true
            }
            Err(e) => {
                log::warn!(target: "orchestrator", "Pruning old backups failed: {e}");
                false
            }
        },
        None => {
            log::info!(target: "orchestrator", "Pruning disabled");
            false
        }
    };

    let staging_path = staging.path().to_path_buf();
    if let Err(e) = staging.remove() {
        log::warn!(target: "orchestrator", "Removing local staging directory {} failed: {e}", staging_path.display());
    }

    log::info!(target: "orchestrator", "Backup complete.");
    Ok(finish(Outcome::Complete {
        remote_path,
        pruned,
    }))
}
