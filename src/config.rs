//! TOML configuration file.

use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error};

use crate::orchestrator::DEFAULT_RETENTION_DAYS;

/// Configuration of a backup installation.
///
/// Every value can be omitted from the file, the defaults match the usual
/// installation layout.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Path of the SQLite datastore, relative to the project root.
    pub database: PathBuf,

    /// Remote destination, e.g. `gdrive:ad-manager-backups`.
    ///
    /// The `BACKUP_RCLONE_DEST` environment variable takes precedence.
    pub destination: Option<String>,

    /// Configuration of the sync tool.
    pub sync: SyncConfig,

    /// Pruning of old remote backups.
    pub retention: RetentionConfig,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("data/ad_manager.db"),
            destination: None,
            sync: SyncConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Name or path of the rclone executable.
    pub program: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("rclone"),
        }
    }
}

/// Configure pruning of remote backups.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Whether to prune after a successful upload.
    pub prune: bool,

    /// Remote backups older than this many days are deleted.
    ///
    /// `0` is rejected on parsing, it would delete the backup just uploaded.
    pub days: NonZeroU32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            prune: true,
            days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl RetentionConfig {
    /// Age threshold if pruning is enabled.
    pub fn max_age_days(&self) -> Option<NonZeroU32> {
        self.prune.then_some(self.days)
    }
}

#[derive(Debug, Display, Error)]
/// Errors on loading the configuration file.
pub enum ConfigError {
    #[display("Reading the config file {} failed: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("Parsing the config file {} failed: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl BackupConfig {
    /// Load the configuration from `path`.
    ///
    /// If the file doesn't exist yet the default configuration is written to
    /// it and returned. Failing to write it is only logged.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(config_str) => toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(
                    "Writing default config to {} because it doesn't exist yet",
                    path.display()
                );
                let default_config = Self::default();
                match toml::to_string_pretty(&default_config) {
                    Ok(config_str) => {
                        if let Err(e) = std::fs::write(path, config_str) {
                            log::warn!("Writing default config to {} failed {e}", path.display());
                        }
                    }
                    Err(e) => log::warn!("Serializing the default config failed: {e}"),
                }

                Ok(default_config)
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
