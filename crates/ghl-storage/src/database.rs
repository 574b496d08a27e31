// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! serializes writes. Do NOT open additional connections for writes.

use std::path::Path;

use chrono::Utc;
use ghl_core::GhlError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Timestamp format written to every `*_at` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// The single-writer database handle.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and
    /// applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, GhlError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, choosing the journal mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, GhlError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(GhlError::storage)?;
            }
        }

        let conn = Connection::open(path).await.map_err(GhlError::storage)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database. Used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, GhlError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(GhlError::storage)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), GhlError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA synchronous = NORMAL;",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        self.conn
            .call(|conn| -> Result<Result<(), GhlError>, rusqlite::Error> {
                Ok(migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
    }

    /// The shared connection. Query modules call through `connection().call()`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), GhlError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(GhlError::storage)?;
        debug!("database closed");
        Ok(())
    }

    /// Truncating WAL checkpoint.
    pub async fn checkpoint(&self) -> Result<(), GhlError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Constraint classes the repositories translate into domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
    Unique,
    ForeignKey,
}

/// Which constraint, if any, a failed statement violated.
pub(crate) fn constraint_violation(
    err: &tokio_rusqlite::Error<rusqlite::Error>,
) -> Option<Constraint> {
    match err {
        tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(code, _)) => {
            match code.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(Constraint::Unique),
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Convert tokio-rusqlite errors to [`GhlError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> GhlError {
    GhlError::storage(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_applies_pragmas_and_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ghl.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let (journal, fk, tables) = db
            .connection()
            .call(|conn| -> Result<(String, i64, i64), rusqlite::Error> {
                let journal: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?;
                let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?;
                let tables: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                     ('clients', 'ghl_available_models', 'ghl_ai_providers',
                      'ghl_conversation_sessions', 'ghl_usage_logs', 'ghl_webhook_logs')",
                    [],
                    |r| r.get(0),
                )?;
                Ok((journal, fk, tables))
            })
            .await
            .unwrap();

        assert_eq!(journal.to_lowercase(), "wal");
        assert_eq!(fk, 1);
        assert_eq!(tables, 6);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ghl.db");
        let path = path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        let seeded: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM ghl_available_models", [], |r| r.get(0))
            })
            .await
            .unwrap();
        assert!(seeded > 0);
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now_timestamp();
        assert!(a < b, "{a} should sort before {b}");
        assert!(a.ends_with('Z'));
        assert_eq!(a.len(), "2026-01-01T00:00:00.000Z".len());
    }
}
