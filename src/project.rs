//! Filesystem layout of an ad manager installation.

use std::path::{Path, PathBuf};

const DEFAULT_DATABASE: &str = "data/ad_manager.db";
const SCHEMA: &str = "data/schema.sql";
const BRANDS: &str = "brands";
const STAGING_ROOT: &str = "data/_backup_staging";

/// Root directory of the installation and the paths resolved against it.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    database: PathBuf,
}

impl Project {
    /// Project rooted at `root` using the default datastore location.
    pub fn new(root: PathBuf) -> Self {
        Self::with_database(root, DEFAULT_DATABASE)
    }

    /// Project rooted at `root` with the datastore at `database`.
    ///
    /// A relative `database` is resolved against `root`.
    pub fn with_database(root: PathBuf, database: impl AsRef<Path>) -> Self {
        let database = root.join(database);
        if root.is_relative() {
            log::debug!(target: "project", "project root is relative: {}", root.display());
        }

        Self { root, database }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// The live primary datastore.
    pub fn database(&self) -> &Path {
        self.database.as_path()
    }

    pub fn schema(&self) -> PathBuf {
        self.root.join(SCHEMA)
    }

    /// Directory holding one subdirectory per brand.
    pub fn brands(&self) -> PathBuf {
        self.root.join(BRANDS)
    }

    /// Parent of all per-run staging directories.
    pub fn staging_root(&self) -> PathBuf {
        self.root.join(STAGING_ROOT)
    }

    pub fn staging_dir(&self, timestamp: &str) -> PathBuf {
        self.staging_root().join(timestamp)
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_resolves_against_root() {
        let project = Project::new(PathBuf::from("/srv/app"));

        assert_eq!(project.database(), Path::new("/srv/app/data/ad_manager.db"));
        assert_eq!(project.schema(), PathBuf::from("/srv/app/data/schema.sql"));
        assert_eq!(project.brands(), PathBuf::from("/srv/app/brands"));
        assert_eq!(
            project.staging_dir("2026-01-02T030405Z"),
            PathBuf::from("/srv/app/data/_backup_staging/2026-01-02T030405Z")
        );
    }

    #[test]
    fn test_absolute_database_overrides_root() {
        let project = Project::with_database(PathBuf::from("/srv/app"), "/var/lib/ads.db");
        assert_eq!(project.database(), Path::new("/var/lib/ads.db"));
    }
}
