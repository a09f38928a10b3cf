//! SQLite-backed trace store.
//!
//! The store is exclusively owned by the persistence worker and is
//! append-only: one fixed `trace` table, one insert per completed profile,
//! never an update or delete.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, ErrorCode};
use thiserror::Error;
use tracing::{debug, info};

use crate::profile::AccessProfile;

const CREATE_TRACE_TABLE: &str = "CREATE TABLE IF NOT EXISTS trace (
    time_stamp INTEGER NOT NULL,
    pid INTEGER NOT NULL,
    caller_path TEXT NOT NULL,
    path TEXT NOT NULL,
    r_size INTEGER NOT NULL,
    r_sec INTEGER NOT NULL,
    r_usec INTEGER NOT NULL,
    w_size INTEGER NOT NULL,
    w_sec INTEGER NOT NULL,
    w_usec INTEGER NOT NULL,
    hostname TEXT NOT NULL
)";

const INSERT_TRACE: &str =
    "INSERT INTO trace VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

/// Trace store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("opening trace store {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("preparing trace schema: {0}")]
    Schema(rusqlite::Error),
    #[error("trace store operation failed: {0}")]
    Exec(rusqlite::Error),
}

/// Append-only SQLite log of completed access profiles.
pub struct TraceStore {
    conn: Connection,
    busy_retry_interval: Duration,
}

impl TraceStore {
    /// Opens (creating if needed) the database at `path` with the fixed
    /// `trace` table. With `purge_on_init` a pre-existing database file is
    /// removed first.
    pub fn open(
        path: &Path,
        purge_on_init: bool,
        busy_retry_interval: Duration,
    ) -> Result<Self, StoreError> {
        if purge_on_init && path.exists() {
            let _ = std::fs::remove_file(path);
            debug!(path = %path.display(), "purged previous trace database");
        }

        let open_err = |source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open(path).map_err(open_err)?;
        conn.busy_timeout(Duration::from_millis(1_000)).map_err(open_err)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(open_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(open_err)?;

        conn.execute_batch(CREATE_TRACE_TABLE).map_err(StoreError::Schema)?;

        info!(path = %path.display(), "trace store ready");

        Ok(Self {
            conn,
            busy_retry_interval,
        })
    }

    /// Opens a transaction. Committing an empty transaction is legitimate.
    pub fn begin(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN").map_err(StoreError::Exec)
    }

    /// Appends one profile as a single `trace` row inside the open
    /// transaction.
    pub fn insert_profile(&self, profile: &AccessProfile) -> Result<(), StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(INSERT_TRACE)
            .map_err(StoreError::Exec)?;

        stmt.execute(params![
            profile.time_stamp() as i64,
            profile.pid(),
            profile.caller_path(),
            profile.path(),
            profile.read().bytes() as i64,
            profile.read().elapsed_secs() as i64,
            profile.read().elapsed_subsec_micros(),
            profile.write().bytes() as i64,
            profile.write().elapsed_secs() as i64,
            profile.write().elapsed_subsec_micros(),
            profile.hostname().unwrap_or(""),
        ])
        .map_err(StoreError::Exec)?;

        Ok(())
    }

    /// Commits the open transaction, retrying in place for as long as the
    /// database reports busy. Any other failure rolls back.
    pub fn commit(&self) -> Result<(), StoreError> {
        loop {
            match self.conn.execute_batch("COMMIT") {
                Ok(()) => return Ok(()),
                Err(e) if is_busy(&e) => std::thread::sleep(self.busy_retry_interval),
                Err(e) => {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(StoreError::Exec(e));
                }
            }
        }
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
