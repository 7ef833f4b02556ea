//! Logging service - structured event logging to DuckDB
//!
//! Events are stored in logs.duckdb next to the main database. Only event
//! names, command names, content source names and error messages are
//! recorded; flashcard text, page titles and access tokens never are.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = now_ms() as u64;

    // Lower 16 bits hold the counter (65536 unique IDs per millisecond)
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Current unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Entry point for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Bot,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Bot => "bot",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    /// Content source involved ("notion", "demo")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            source: None,
            command: None,
            error_message: None,
            error_details: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub source: Option<String>,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

/// Per-event counts for `fl logs stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogStats {
    pub total: u64,
    pub errors: u64,
    pub by_event: Vec<(String, u64)>,
}

const ENTRY_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform,
     event, source, command, error_message, error_details";

fn row_to_entry(row: &duckdb::Row) -> duckdb::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        entry_point: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        event: row.get(5)?,
        source: row.get(6)?,
        command: row.get(7)?,
        error_message: row.get(8)?,
        error_details: row.get(9)?,
    })
}

/// Service for structured event logging
///
/// Manages logs.duckdb and provides methods for recording events and
/// querying the log history.
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create logs.duckdb in the flashline directory and run
    /// pending log migrations
    pub fn new(
        flashline_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = flashline_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;

        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Log connection lock poisoned: {}", e)))
    }

    /// Record an event; entry point, app version and platform are filled in
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform,
                event, source, command, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.source,
                &event.command,
                &event.error_message,
                &event.error_details,
            ],
        )?;

        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut log_event = LogEvent::new(event).with_error(message);
        if let Some(d) = details {
            log_event = log_event.with_error_details(d);
        }
        self.log(log_event)
    }

    /// Most recent entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM sys_logs ORDER BY timestamp DESC, id DESC LIMIT ?",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([limit as i64], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Most recent entries that carry an error message
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM sys_logs WHERE error_message IS NOT NULL
             ORDER BY timestamp DESC, id DESC LIMIT ?",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([limit as i64], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn stats(&self) -> Result<LogStats> {
        let conn = self.lock()?;
        let (total, errors): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(error_message) FROM sys_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT event, COUNT(*) AS n FROM sys_logs GROUP BY event ORDER BY n DESC, event",
        )?;
        let by_event = stmt
            .query_map([], |row| {
                let n: i64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, n as u64))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LogStats {
            total: total as u64,
            errors: errors as u64,
            by_event,
        })
    }

    /// Delete logs older than the given unix timestamp in milliseconds
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
