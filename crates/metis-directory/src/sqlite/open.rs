//! Connection bootstrap.
//!
//! Returned connections have `foreign_keys=ON` and every migration applied.

use std::path::Path;
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tracing::{error, info};

use super::migrations::apply_migrations;
use crate::error::{DirectoryError, DirectoryResult};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if needed) a database file and migrates it.
///
/// Missing parent directories are created.
pub fn open_db(path: &Path) -> DirectoryResult<Connection> {
    let started_at = Instant::now();
    info!(mode = "file", path = %path.display(), "opening database");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| DirectoryError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let result = Connection::open(path)
        .map_err(DirectoryError::from)
        .and_then(bootstrap);
    log_open("file", started_at, &result);
    result
}

/// Opens a private in-memory database and migrates it.
pub fn open_db_in_memory() -> DirectoryResult<Connection> {
    let started_at = Instant::now();
    info!(mode = "memory", "opening database");

    let result = Connection::open_in_memory()
        .map_err(DirectoryError::from)
        .and_then(bootstrap);
    log_open("memory", started_at, &result);
    result
}

fn bootstrap(mut conn: Connection) -> DirectoryResult<Connection> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn log_open(mode: &str, started_at: Instant, result: &DirectoryResult<Connection>) {
    let duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(_) => info!(mode, duration_ms, "database opened"),
        Err(err) => error!(mode, duration_ms, error = %err, "database open failed"),
    }
}
