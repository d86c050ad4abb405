//! Hot backup of the SQLite datastore using [Database].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use derive_more::{Display, Error, From};
use rusqlite::backup::{Backup as SqliteBackup, StepResult};
use rusqlite::{Connection, OpenFlags};

use crate::backends::Backup;
use crate::project::Project;

const PARTIAL_SUFFIX: &str = "partial";

/// The [Database] backend copies the live datastore into the staging directory.
///
/// The copy is taken with SQLite's online backup API, so writers of the
/// datastore may keep running. The snapshot is first written next to its
/// destination with a `.partial` suffix and only renamed once complete.
#[derive(Debug, Clone)]
pub struct Database {
    /// How often a busy or locked source is retried before giving up.
    pub busy_retries: u32,
    /// Pause between two retries.
    pub busy_pause: Duration,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            busy_retries: 40,
            busy_pause: Duration::from_millis(250),
        }
    }
}

/// Result of a database snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseSummary {
    /// Snapshot location, relative to the staging directory.
    pub file: PathBuf,
    /// Size of the snapshot in bytes.
    pub bytes: u64,
}

#[derive(Debug, Display, Error, From)]
/// Errors on snapshotting the primary datastore.
pub enum SnapshotError {
    /// The datastore file does not exist.
    #[display("database not found at {}", _0.display())]
    SourceMissing(#[error(ignore)] PathBuf),
    /// The datastore path has no file name to name the snapshot after.
    #[display("database path has no file name: {}", _0.display())]
    InvalidSource(#[error(ignore)] PathBuf),
    /// The source stayed busy or locked for every retry.
    #[display("database stayed locked after {_0} retries")]
    Busy(#[error(ignore)] u32),
    /// SQLite failed to open or copy the datastore.
    #[display("SQLite backup failed: {_0}")]
    #[from]
    Sqlite(rusqlite::Error),
    /// Finalizing the snapshot file failed.
    #[display("Writing the snapshot failed: {_0}")]
    #[from]
    Io(io::Error),
}

impl Database {
    /// Copy the datastore at `source` to `dest`.
    ///
    /// On error no file is left at `dest` and the partial file is removed.
    pub fn snapshot(&self, source: &Path, dest: &Path) -> Result<u64, SnapshotError> {
        if !source.is_file() {
            return Err(SnapshotError::SourceMissing(source.to_path_buf()));
        }

        let partial = dest.with_extension(match dest.extension() {
            Some(ext) => format!("{}.{PARTIAL_SUFFIX}", ext.to_string_lossy()),
            None => PARTIAL_SUFFIX.to_string(),
        });

        if let Err(e) = self.copy_pages(source, &partial) {
            if let Err(rm) = fs::remove_file(&partial) {
                if rm.kind() != io::ErrorKind::NotFound {
                    log::warn!(target: "backend::database", "Removing partial snapshot {} failed: {rm}", partial.display());
                }
            }
            return Err(e);
        }

        fs::rename(&partial, dest)?;
        Ok(fs::metadata(dest)?.len())
    }

    fn copy_pages(&self, source: &Path, partial: &Path) -> Result<(), SnapshotError> {
        // no SQLITE_OPEN_CREATE: a vanished source must not be recreated empty
        let src = Connection::open_with_flags(
            source,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let mut dst = Connection::open(partial)?;
        log::trace!(target: "backend::database", "Opened source and snapshot connections");

        {
            let backup = SqliteBackup::new(&src, &mut dst)?;
            let mut retries = 0;
            loop {
                match backup.step(-1)? {
                    StepResult::Done => break,
                    StepResult::More => continue,
                    busy_or_locked => {
                        if retries >= self.busy_retries {
                            return Err(SnapshotError::Busy(retries));
                        }
                        retries += 1;
                        log::debug!(target: "backend::database", "Source database {busy_or_locked:?}, retry {retries}/{}", self.busy_retries);
                        thread::sleep(self.busy_pause);
                    }
                }
            }
        }

        dst.close().map_err(|(_, e)| e)?;
        src.close().map_err(|(_, e)| e)?;
        Ok(())
    }

    fn snapshot_name(project: &Project) -> Result<PathBuf, SnapshotError> {
        project
            .database()
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| SnapshotError::InvalidSource(project.database().to_path_buf()))
    }
}

impl Backup for Database {
    type Error = SnapshotError;
    type Summary = DatabaseSummary;

    fn backup(
        &self,
        project: &Project,
        staging: &Path,
        dry_run: bool,
    ) -> Result<Self::Summary, Self::Error> {
        let source = project.database();
        let file = Self::snapshot_name(project)?;
        log::debug!(target: "backend::database", "Snapshot {} to {}", source.display(), staging.join(&file).display());

        let bytes = if dry_run {
            if !source.is_file() {
                return Err(SnapshotError::SourceMissing(source.to_path_buf()));
            }
            // make sure the file actually is a readable database
            let conn = Connection::open_with_flags(source, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))?;
            conn.close().map_err(|(_, e)| e)?;
            fs::metadata(source)?.len()
        } else {
            self.snapshot(source, &staging.join(&file))?
        };

        log::info!(target: "backend::database", "Database snapshot {} ({} KB)", file.display(), bytes / 1024);
        Ok(DatabaseSummary { file, bytes })
    }
}
