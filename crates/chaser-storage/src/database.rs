// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Query modules accept `&Database` and call through
//! `connection().call()`. Do NOT create additional Connection instances
//! for writes.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::Connection;

use chaser_core::ChaserError;

use crate::migrations;

/// Handle to the single-writer SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run any
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, ChaserError> {
        Self::open_with(path, true).await
    }

    /// Open with an explicit journal mode choice.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, ChaserError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ChaserError::Storage { source: Box::new(e) })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| ChaserError::Storage { source: Box::new(e) })?;
        conn.call(move |conn| {
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;"
            ))?;
            migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        tracing::debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), ChaserError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> ChaserError {
    ChaserError::Storage { source: Box::new(e) }
}

/// Serialize a timestamp as RFC 3339 with millisecond precision and a
/// trailing `Z`, so lexicographic order in SQL matches chronological order.
pub fn to_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back into `DateTime<Utc>`.
pub(crate) fn parse_ts(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse an optional stored timestamp.
pub(crate) fn parse_ts_opt(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|s| parse_ts(idx, &s)).transpose()
}
