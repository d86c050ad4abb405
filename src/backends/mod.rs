//! Backend modules collecting the contents of a backup into a staging directory.
//!
//! Currently the following backends are implemented:
//!
//! - [Database]: Hot snapshot of the SQLite datastore.
//! - [Artifacts]: Schema and per-brand configuration files.

pub mod artifacts;
pub mod database;

pub use artifacts::{ArtifactSummary, Artifacts, CollectError};
pub use database::{Database, DatabaseSummary, SnapshotError};

use std::path::Path;

use crate::project::Project;

/// Generic backup backend.
pub trait Backup {
    /// Error that may happen on backup.
    type Error;

    /// Description of what was collected.
    type Summary;

    /// Collects data managed by the implementation into `staging`.
    ///
    /// # Dry Run
    ///
    /// On a dry run (`dry_run=true`) no files are altered and `staging` need
    /// not exist. This does include folders and other special files.
    ///
    /// Instead sanity checks are performed and the [Summary](Self::Summary)
    /// describes what a "real" backup would collect.
    fn backup(
        &self,
        project: &Project,
        staging: &Path,
        dry_run: bool,
    ) -> Result<Self::Summary, Self::Error>;
}
