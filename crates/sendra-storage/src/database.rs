// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: `Database` wraps one `tokio_rusqlite::Connection`, query modules
//! accept `&Database` and call through `conn.call()`. Do NOT create
//! additional Connection instances for writes.

use std::path::Path;

use sendra_config::StorageConfig;
use sendra_core::SendraError;
use tracing::debug;

/// Convert a tokio-rusqlite error into SendraError::Storage.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SendraError {
    SendraError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the Campaign Store's SQLite database.
///
/// Cloning is cheap and shares the same single-writer connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` with WAL mode on,
    /// and run any pending migrations.
    pub async fn open(path: &str) -> Result<Self, SendraError> {
        Self::open_inner(path, true).await
    }

    /// Open a database following the given storage configuration.
    pub async fn open_with(config: &StorageConfig) -> Result<Self, SendraError> {
        Self::open_inner(&config.database_path, config.wal_mode).await
    }

    /// Open an in-memory database with migrations applied. Test use.
    pub async fn open_in_memory() -> Result<Self, SendraError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| SendraError::Storage {
                source: Box::new(e),
            })?;
        Self::setup(conn, false).await
    }

    async fn open_inner(path: &str, wal_mode: bool) -> Result<Self, SendraError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| SendraError::Storage {
                source: Box::new(e),
            })?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| SendraError::Storage {
                source: Box::new(e),
            })?;
        let db = Self::setup(conn, wal_mode).await?;
        debug!(path, wal_mode, "campaign store opened");
        Ok(db)
    }

    async fn setup(
        conn: tokio_rusqlite::Connection,
        wal_mode: bool,
    ) -> Result<Self, SendraError> {
        let migration_result = conn
            .call(move |conn| {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
                }
                conn.execute_batch(
                    "PRAGMA synchronous=NORMAL;
                     PRAGMA foreign_keys=ON;
                     PRAGMA busy_timeout=5000;",
                )?;
                Ok(crate::migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?;
        migration_result?;
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Verify the database answers queries.
    pub async fn health_check(&self) -> Result<(), SendraError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint the WAL before the handle is dropped.
    pub async fn close(&self) -> Result<(), SendraError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
