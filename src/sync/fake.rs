//! In-memory [Remote] recording its calls, for tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{Remote, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload {
        remote_path: String,
        /// Files present below the uploaded directory, relative to it.
        files: Vec<PathBuf>,
    },
    Prune {
        remote_path: String,
        min_age_days: u32,
    },
}

/// Injected result of a fake operation.
#[derive(Debug, Clone)]
pub enum Failure {
    NotInstalled,
    Exit { code: i32, stderr: String },
}

impl Failure {
    fn to_error(&self, command: &str) -> SyncError {
        match self {
            Failure::NotInstalled => SyncError::NotInstalled {
                program: "rclone".into(),
            },
            Failure::Exit { code, stderr } => SyncError::Failed {
                command: command.into(),
                code: Some(*code),
                stderr: stderr.clone(),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingRemote {
    calls: RefCell<Vec<Call>>,
    upload_failure: Option<Failure>,
    prune_failure: Option<Failure>,
}

impl RecordingRemote {
    pub fn failing_upload(failure: Failure) -> Self {
        Self {
            upload_failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn failing_prune(failure: Failure) -> Self {
        Self {
            prune_failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl Remote for RecordingRemote {
    fn upload(&self, local_dir: &Path, remote_path: &str) -> Result<(), SyncError> {
        let mut files: Vec<_> = WalkDir::new(local_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(local_dir)
                    .ok()
                    .map(Path::to_path_buf)
            })
            .collect();
        files.sort();

        self.calls.borrow_mut().push(Call::Upload {
            remote_path: remote_path.into(),
            files,
        });

        match &self.upload_failure {
            Some(failure) => Err(failure.to_error("rclone copy")),
            None => Ok(()),
        }
    }

    fn prune(&self, remote_path: &str, min_age_days: u32) -> Result<(), SyncError> {
        self.calls.borrow_mut().push(Call::Prune {
            remote_path: remote_path.into(),
            min_age_days,
        });

        match &self.prune_failure {
            Some(failure) => Err(failure.to_error("rclone delete")),
            None => Ok(()),
        }
    }
}
