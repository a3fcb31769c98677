//! Storage layer for FocusGem.
//!
//! Provides persistence for the ledger snapshot and the session history using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The CLI only ever uses it
//! from one thread.
//!
//! # Schema
//!
//! ## Snapshot storage
//!
//! The `kv` table holds opaque TEXT values by key. The ledger snapshot lives
//! under [`SNAPSHOT_KEY`] as a JSON document; its shape is owned by
//! `fg_core::ledger` and this crate never parses it.
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g., `2024-01-15T10:30:00Z`).
//! Lexicographic ordering matches chronological ordering.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use fg_core::{SnapshotStore, StoreError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

/// Key of the ledger snapshot in the `kv` table.
pub const SNAPSHOT_KEY: &str = "focusData";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for session {session_id}: {timestamp}")]
    TimestampParse {
        session_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored integer does not fit the column's domain.
    #[error("value out of range for {column}: {value}")]
    OutOfRange { column: &'static str, value: i64 },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish()
    }
}

/// One finished focus session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLogRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub requested_secs: u64,
    pub elapsed_secs: u64,
    pub completed: bool,
    pub coins_earned: u64,
}

impl SessionLogRecord {
    /// Creates a record with a fresh random ID.
    pub fn new(
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        requested_secs: u64,
        elapsed_secs: u64,
        completed: bool,
        coins_earned: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at,
            ended_at,
            requested_secs,
            elapsed_secs,
            completed,
            coins_earned,
        }
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Opaque values by key; the ledger snapshot lives under 'focusData'
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Finished focus sessions, completed or not
            -- started_at/ended_at: ISO 8601 format (e.g., '2024-01-15T10:30:00Z')
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                requested_secs INTEGER NOT NULL,
                elapsed_secs INTEGER NOT NULL,
                completed INTEGER NOT NULL,
                coins_earned INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_ended ON sessions(ended_at);
            ",
        )?;
        tracing::debug!(path = ?self.conn.path(), "database schema ready");
        Ok(())
    }

    /// Reads the value stored under `key`.
    pub fn get_value(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn put_value(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    /// Appends a session to the history, ignoring duplicate IDs.
    pub fn insert_session_log(&mut self, record: &SessionLogRecord) -> Result<bool, DbError> {
        let inserted = self.conn.execute(
            "
            INSERT OR IGNORE INTO sessions
            (id, started_at, ended_at, requested_secs, elapsed_secs, completed, coins_earned)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                record.id,
                format_timestamp(record.started_at),
                format_timestamp(record.ended_at),
                to_sql_int("requested_secs", record.requested_secs)?,
                to_sql_int("elapsed_secs", record.elapsed_secs)?,
                record.completed,
                to_sql_int("coins_earned", record.coins_earned)?,
            ],
        )?;
        if inserted == 0 {
            tracing::debug!(id = %record.id, "session already logged, skipping");
        }
        Ok(inserted > 0)
    }

    /// Lists the most recent sessions, newest first.
    pub fn list_session_logs(&self, limit: usize) -> Result<Vec<SessionLogRecord>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "
            SELECT id, started_at, ended_at, requested_secs, elapsed_secs, completed, coins_earned
            FROM sessions
            ORDER BY ended_at DESC, id DESC
            LIMIT ?
            ",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(SessionLogRow {
                id: row.get(0)?,
                started_at: row.get(1)?,
                ended_at: row.get(2)?,
                requested_secs: row.get(3)?,
                elapsed_secs: row.get(4)?,
                completed: row.get(5)?,
                coins_earned: row.get(6)?,
            })
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_record()?);
        }
        Ok(sessions)
    }
}

impl SnapshotStore for Database {
    fn read(&self) -> Result<Option<String>, StoreError> {
        self.get_value(SNAPSHOT_KEY).map_err(StoreError::backend)
    }

    fn write(&mut self, payload: &str) -> Result<(), StoreError> {
        self.put_value(SNAPSHOT_KEY, payload)
            .map_err(StoreError::backend)
    }
}

/// Raw session row before validation.
struct SessionLogRow {
    id: String,
    started_at: String,
    ended_at: String,
    requested_secs: i64,
    elapsed_secs: i64,
    completed: bool,
    coins_earned: i64,
}

impl SessionLogRow {
    fn into_record(self) -> Result<SessionLogRecord, DbError> {
        Ok(SessionLogRecord {
            started_at: parse_timestamp(&self.started_at, &self.id)?,
            ended_at: parse_timestamp(&self.ended_at, &self.id)?,
            requested_secs: from_sql_int("requested_secs", self.requested_secs)?,
            elapsed_secs: from_sql_int("elapsed_secs", self.elapsed_secs)?,
            completed: self.completed,
            coins_earned: from_sql_int("coins_earned", self.coins_earned)?,
            id: self.id,
        })
    }
}

fn parse_timestamp(timestamp: &str, session_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            session_id: session_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn to_sql_int(column: &'static str, value: u64) -> Result<i64, DbError> {
    i64::try_from(value).map_err(|_| DbError::OutOfRange {
        column,
        value: i64::MAX,
    })
}

fn from_sql_int(column: &'static str, value: i64) -> Result<u64, DbError> {
    u64::try_from(value).map_err(|_| DbError::OutOfRange { column, value })
}
