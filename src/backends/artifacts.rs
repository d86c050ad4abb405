//! Implements backup of the schema and brand configuration files using [Artifacts].

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};
use walkdir::WalkDir;

use crate::backends::Backup;
use crate::project::Project;

/// Files copied out of every brand directory. Nothing else is ever collected.
pub const BRAND_FILES: [&str; 3] = ["config.json", "limits.json", "rules.json"];

const SCHEMA_FILE: &str = "schema.sql";
const BRANDS_DEST: &str = "brands";

/// The [Artifacts] backend collects the auxiliary configuration files.
///
/// `data/schema.sql` and the [BRAND_FILES] of every `brands/<brand>/`
/// directory are mirrored into the staging directory, keeping their
/// modification time. This is an allow-list: `.env` files, raw API dumps and
/// any other file next to them stay behind.
#[derive(Debug, Clone, Default)]
pub struct Artifacts;

/// Files collected by [Artifacts].
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ArtifactSummary {
    /// Whether `schema.sql` was collected.
    pub schema: bool,
    /// Number of brands that contributed at least one file.
    pub brands: usize,
    /// Collected files, relative to the staging directory.
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Display, Error, From)]
/// Errors on collecting auxiliary artifacts.
pub enum CollectError {
    /// Copying a single file failed.
    #[display("Copying {} failed: {source}", path.display())]
    Copy { path: PathBuf, source: io::Error },
    /// Listing the brand directories failed.
    #[display("Reading the brands directory failed: {_0}")]
    #[from]
    Walk(walkdir::Error),
}

/// Whether `name` is one of the collected brand files.
pub fn is_brand_file(name: &OsStr) -> bool {
    BRAND_FILES.iter().any(|file| OsStr::new(file) == name)
}

/// Whether a walk error can't hide a collected file.
///
/// Entries outside the allow-list never matter, and a dangling brand symlink
/// has no files below it. Any other error may cost a brand file and aborts.
fn is_ignorable(err: &walkdir::Error) -> bool {
    let Some(path) = err.path() else {
        return false;
    };
    match err.depth() {
        2 => !path.file_name().is_some_and(is_brand_file),
        1 => err
            .io_error()
            .is_some_and(|e| e.kind() == io::ErrorKind::NotFound),
        _ => false,
    }
}

/// Copy `from` to `to` creating parent directories and keeping the mtime.
fn copy_preserving(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;

    let modified = fs::metadata(from)?.modified()?;
    File::options().write(true).open(to)?.set_modified(modified)?;
    Ok(())
}

impl Backup for Artifacts {
    type Error = CollectError;
    type Summary = ArtifactSummary;

    fn backup(
        &self,
        project: &Project,
        staging: &Path,
        dry_run: bool,
    ) -> Result<Self::Summary, Self::Error> {
        let mut summary = ArtifactSummary::default();

        let schema = project.schema();
        if schema.is_file() {
            if !dry_run {
                copy_preserving(&schema, &staging.join(SCHEMA_FILE)).map_err(|source| {
                    CollectError::Copy {
                        path: schema.clone(),
                        source,
                    }
                })?;
            }
            summary.schema = true;
            summary.files.push(PathBuf::from(SCHEMA_FILE));
            log::info!(target: "backend::artifacts", "Schema {SCHEMA_FILE}");
        } else {
            log::info!(target: "backend::artifacts", "No schema found at {}", schema.display());
        }

        let brands_dir = project.brands();
        if !brands_dir.is_dir() {
            log::info!(target: "backend::artifacts", "Brand configs (0 brands): {} does not exist", brands_dir.display());
            return Ok(summary);
        }

        let mut brands = BTreeSet::new();
        // brands/<brand>/<file>, nothing shallower or deeper
        let walker = WalkDir::new(&brands_dir)
            .min_depth(2)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_ignorable(&e) => {
                    log::warn!(target: "backend::artifacts", "Skipping unreadable entry: {e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if !entry.file_type().is_file() || !is_brand_file(entry.file_name()) {
                log::trace!(target: "backend::artifacts", "Skipping {}", entry.path().display());
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&brands_dir) else {
                continue;
            };
            let dest = Path::new(BRANDS_DEST).join(relative);

            if !dry_run {
                copy_preserving(entry.path(), &staging.join(&dest)).map_err(|source| {
                    CollectError::Copy {
                        path: entry.path().to_path_buf(),
                        source,
                    }
                })?;
            }
            log::debug!(target: "backend::artifacts", "Collected {}", dest.display());

            if let Some(brand) = relative.components().next() {
                brands.insert(brand.as_os_str().to_os_string());
            }
            summary.files.push(dest);
        }

        summary.brands = brands.len();
        log::info!(target: "backend::artifacts", "Brand configs ({} brands)", summary.brands);
        Ok(summary)
    }
}
