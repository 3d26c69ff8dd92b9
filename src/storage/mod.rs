//! Durable message log
//!
//! Every successful turn is mirrored into a SQLite table keyed by session id.
//! The table is append-only from the chat path; the history commands read,
//! summarize and clear it.

use crate::chat::Role;
use crate::config::StorageConfig;
use crate::error::{BeeChatError, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub mod types;
pub use types::{SessionSummary, StoredMessage};

/// Append-only destination for conversation messages
///
/// Implementations are called from a blocking context and may perform
/// synchronous IO.
pub trait MessageSink: Send + Sync {
    /// Appends one message
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error if the write fails
    fn append(&self, message: &StoredMessage) -> Result<()>;

    /// Appends several messages in order
    ///
    /// # Errors
    ///
    /// Returns the first write error
    fn append_all(&self, messages: &[StoredMessage]) -> Result<()> {
        for message in messages {
            self.append(message)?;
        }
        Ok(())
    }
}

fn to_epoch_seconds(timestamp: &DateTime<Utc>) -> f64 {
    timestamp.timestamp_micros() as f64 / 1_000_000.0
}

fn from_epoch_seconds(seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
        .unwrap_or_default()
}

/// Escapes `LIKE` wildcards so a prefix matches literally
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Resolves a full id or unique prefix to one stored session id
///
/// An exact match wins over prefix matches. Returns `Ok(None)` when nothing
/// matches, and `InvalidInput` for an empty id or a prefix shared by several
/// sessions.
fn resolve_session_id(conn: &Connection, session_id: &str) -> Result<Option<String>> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(BeeChatError::InvalidInput("Session id must not be empty".into()).into());
    }

    let exact = conn
        .query_row(
            "SELECT 1 FROM messages WHERE session_id = ? LIMIT 1",
            params![session_id],
            |_| Ok(()),
        )
        .optional()
        .context("Failed to look up session")
        .map_err(|e| BeeChatError::Storage(e.to_string()))?;
    if exact.is_some() {
        return Ok(Some(session_id.to_string()));
    }

    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT session_id FROM messages
            WHERE session_id LIKE ? ESCAPE '\\'
            ORDER BY session_id LIMIT 2",
        )
        .context("Failed to prepare statement")
        .map_err(|e| BeeChatError::Storage(e.to_string()))?;
    let mut matches = stmt
        .query_map(params![like_prefix(session_id)], |row| row.get::<_, String>(0))
        .context("Failed to look up session")
        .map_err(|e| BeeChatError::Storage(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read session id")
        .map_err(|e| BeeChatError::Storage(e.to_string()))?;

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => Err(BeeChatError::InvalidInput(format!(
            "Session prefix '{}' matches more than one session",
            session_id
        ))
        .into()),
    }
}

/// Storage backend for the message log
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory.
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "beechat", "beechat")
            .ok_or_else(|| BeeChatError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("history.db"))
    }

    /// Create the storage described by the configuration
    ///
    /// Uses `storage.path` when set, otherwise the platform data directory.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match &config.path {
            Some(path) => Self::new_with_path(path),
            None => Self::new(),
        }
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use beechat::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("history.db")).unwrap();
    /// assert!(storage.list_sessions().unwrap().is_empty());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| BeeChatError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        tracing::debug!(db_path = %storage.db_path.display(), "Opened message log");
        Ok(storage)
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| BeeChatError::Storage(e.to_string()).into())
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_session
                ON messages (session_id, timestamp);",
        )
        .context("Failed to create tables")
        .map_err(|e| BeeChatError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Messages of one session in write order
    ///
    /// `session_id` may be a full id or a unique prefix of one. Ties on
    /// timestamp are broken by insertion order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty id or an ambiguous prefix
    pub fn load_session(&self, session_id: &str) -> Result<Vec<StoredMessage>> {
        let conn = self.connect()?;
        let Some(session_id) = resolve_session_id(&conn, session_id)? else {
            return Ok(Vec::new());
        };

        let mut stmt = conn
            .prepare(
                "SELECT session_id, role, content, timestamp FROM messages
                WHERE session_id = ?
                ORDER BY timestamp, rowid",
            )
            .context("Failed to prepare statement")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                let session_id: String = row.get(0)?;
                let role: String = row.get(1)?;
                let content: String = row.get(2)?;
                let timestamp: f64 = row.get(3)?;
                Ok((session_id, role, content, timestamp))
            })
            .context("Failed to query messages")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;

        let mut messages = Vec::new();
        for row in rows {
            let (session_id, role, content, timestamp) = row
                .context("Failed to read message row")
                .map_err(|e| BeeChatError::Storage(e.to_string()))?;
            let role: Role = role.parse().map_err(BeeChatError::Storage)?;
            messages.push(StoredMessage {
                session_id,
                role,
                content,
                timestamp: from_epoch_seconds(timestamp),
            });
        }

        Ok(messages)
    }

    /// One summary per stored session, most recently active first
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let conn = self.connect()?;

        let mut stmt = conn
            .prepare(
                "SELECT m.session_id, COUNT(*), MIN(m.timestamp), MAX(m.timestamp),
                    (SELECT p.content FROM messages p
                     WHERE p.session_id = m.session_id AND p.role = 'user'
                     ORDER BY p.timestamp, p.rowid LIMIT 1)
                FROM messages m
                GROUP BY m.session_id
                ORDER BY MAX(m.timestamp) DESC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;

        let sessions = stmt
            .query_map([], |row| {
                let session_id: String = row.get(0)?;
                let message_count: i64 = row.get(1)?;
                let started_at: f64 = row.get(2)?;
                let updated_at: f64 = row.get(3)?;
                let first_prompt: Option<String> = row.get(4)?;
                Ok(SessionSummary {
                    session_id,
                    message_count: message_count.max(0) as usize,
                    started_at: from_epoch_seconds(started_at),
                    updated_at: from_epoch_seconds(updated_at),
                    first_prompt,
                })
            })
            .context("Failed to query sessions")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read session row")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;

        Ok(sessions)
    }

    /// Delete one session (full id or unique prefix), returning the rows removed
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty id or an ambiguous prefix
    pub fn delete_session(&self, session_id: &str) -> Result<usize> {
        let conn = self.connect()?;
        let Some(session_id) = resolve_session_id(&conn, session_id)? else {
            return Ok(0);
        };

        let removed = conn
            .execute(
                "DELETE FROM messages WHERE session_id = ?",
                params![session_id],
            )
            .context("Failed to delete session")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;

        Ok(removed)
    }

    /// Delete every stored message, returning the rows removed
    pub fn clear(&self) -> Result<usize> {
        let conn = self.connect()?;
        let removed = conn
            .execute("DELETE FROM messages", [])
            .context("Failed to clear message log")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;
        tracing::info!(removed, "Cleared message log");
        Ok(removed)
    }
}

impl MessageSink for SqliteStorage {
    fn append(&self, message: &StoredMessage) -> Result<()> {
        self.append_all(std::slice::from_ref(message))
    }

    fn append_all(&self, messages: &[StoredMessage]) -> Result<()> {
        let mut conn = self.connect()?;

        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;

        for message in messages {
            tx.execute(
                "INSERT INTO messages (session_id, role, content, timestamp)
                VALUES (?, ?, ?, ?)",
                params![
                    message.session_id,
                    message.role.as_str(),
                    message.content,
                    to_epoch_seconds(&message.timestamp)
                ],
            )
            .context("Failed to insert message")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| BeeChatError::Storage(e.to_string()))?;

        Ok(())
    }
}
