//! Initialize the datastore from `schema.sql`.
//!
//! Re-running is safe as long as the script guards its statements with
//! `IF NOT EXISTS`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};
use rusqlite::Connection;

#[derive(Debug, Display, Error, From)]
/// Errors on initializing the datastore.
pub enum InitError {
    /// The schema script does not exist.
    #[display("schema not found at {}", _0.display())]
    SchemaMissing(#[error(ignore)] PathBuf),
    /// Reading the schema or creating the data directory failed.
    #[display("{_0}")]
    #[from]
    Io(io::Error),
    /// Executing the schema failed.
    #[display("Executing the schema failed: {_0}")]
    #[from]
    Sqlite(rusqlite::Error),
}

/// Execute `schema` against the datastore at `database`, creating it if needed.
///
/// Returns the names of all tables afterwards, ordered by name.
pub fn initialize(database: &Path, schema: &Path) -> Result<Vec<String>, InitError> {
    if !schema.is_file() {
        return Err(InitError::SchemaMissing(schema.to_path_buf()));
    }
    let script = fs::read_to_string(schema)?;

    if let Some(parent) = database.parent() {
        fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(database)?;
    conn.execute_batch(&script)?;
    log::info!(target: "schema", "Database initialized: {}", database.display());

    let tables = {
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let tables = rows.collect::<Result<Vec<_>, _>>()?;
        tables
    };
    conn.close().map_err(|(_, e)| e)?;

    log::info!(target: "schema", "Tables: {}", tables.join(", "));
    Ok(tables)
}
