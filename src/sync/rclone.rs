use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{Remote, SyncError};

const DEFAULT_PROGRAM: &str = "rclone";

/// Interaction with a remote using the [`rclone` command](https://rclone.org/commands/).
///
/// The remote itself has to be configured with `rclone config` beforehand.
#[derive(Debug, Clone)]
pub struct Rclone {
    /// Name or path of the rclone executable.
    program: PathBuf,
}

impl Default for Rclone {
    fn default() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }
}

impl Rclone {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        self.program.as_path()
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn execute_command(&self, args: &[&OsStr]) -> Result<String, SyncError> {
        let mut command = Command::new(&self.program);
        command.args(args);

        let printable = std::iter::once(self.program.as_os_str())
            .chain(command.get_args())
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ");
        log::trace!(target: "sync::rclone", "Running: {printable}");

        let output = command.output().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                SyncError::NotInstalled {
                    program: self.program_name(),
                }
            } else {
                SyncError::Spawn {
                    program: self.program_name(),
                    source,
                }
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(SyncError::Failed {
                command: printable,
                code: output.status.code(),
                stderr: stderr.trim_end().into(),
            });
        }

        // relay stderr
        if !stderr.trim().is_empty() {
            log::warn!(target: "sync::rclone", "{}", stderr.trim_end());
        }

        Ok(stdout.trim_end().into())
    }
}

impl Remote for Rclone {
    fn upload(&self, local_dir: &Path, remote_path: &str) -> Result<(), SyncError> {
        let progress = self.execute_command(&[
            OsStr::new("copy"),
            local_dir.as_os_str(),
            OsStr::new(remote_path),
            OsStr::new("--progress"),
        ])?;
        for line in progress.lines().filter(|line| !line.trim().is_empty()) {
            log::debug!(target: "sync::rclone", "{line}");
        }

        Ok(())
    }

    fn prune(&self, remote_path: &str, min_age_days: u32) -> Result<(), SyncError> {
        let min_age = format!("{min_age_days}d");
        self.execute_command(&[
            OsStr::new("delete"),
            OsStr::new(remote_path),
            OsStr::new("--min-age"),
            OsStr::new(&min_age),
        ])?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_not_installed() {
        let rclone = Rclone::with_program("adm-backup-no-such-sync-tool");

        let err = rclone.upload(Path::new("."), "remote:backups").unwrap_err();

        assert!(err.is_not_installed());
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_is_success() {
        // `true` ignores its arguments and exits with 0
        let rclone = Rclone::with_program("true");

        rclone.upload(Path::new("."), "remote:backups/ts").unwrap();
        rclone.prune("remote:backups", 30).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_failure() {
        let rclone = Rclone::with_program("false");

        let err = rclone.prune("remote:backups", 30).unwrap_err();

        match err {
            SyncError::Failed { command, code, .. } => {
                assert_eq!(command, "false delete remote:backups --min-age 30d");
                assert_eq!(code, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
