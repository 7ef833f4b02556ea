//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, ToSql};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Flashcard, NotionCredential, Page, User};
use crate::ports::Repository;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const USER_COLUMNS: &str = "user_id, chat_id, first_name, notion_access_token, notion_workspace_id,
     notion_workspace_name, notion_workspace_icon, notion_bot_id,
     CAST(active_cards AS VARCHAR) AS active_cards, study_mode, created_at, updated_at";

const PAGE_COLUMNS: &str = "page_id, user_id, external_id, title, last_reloaded_at, created_at";

const FLASHCARD_COLUMNS: &str =
    "flashcard_id, page_id, user_id, block_id, front, back, mastery, created_at, edited_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff on file locking errors, which show
    /// up when a scheduled refresh and an interactive command start at the
    /// same time.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            "Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory database (tests, dry runs)
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; JSON is statically linked via the "json" feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Connection lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn query_pages(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Page>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let pages = stmt
            .query_map(params, row_to_page)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn query_flashcards(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Flashcard>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let cards = stmt
            .query_map(params, row_to_flashcard)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    fn query_user(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Option<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query_map(params, row_to_user)?;
        match rows.next() {
            Some(user) => Ok(Some(user?)),
            None => Ok(None),
        }
    }
}

impl Repository for DuckDbRepository {
    // === Users ===

    fn insert_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;
        let credential = user.credential.as_ref();
        let sql = format!(
            "INSERT INTO sys_users (user_id, chat_id, first_name, notion_access_token,
                                    notion_workspace_id, notion_workspace_name, notion_workspace_icon,
                                    notion_bot_id, active_cards, study_mode, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, {}, ?, ?, ?)",
            format_id_array(&user.active_cards)
        );
        conn.execute(
            &sql,
            params![
                user.id.to_string(),
                user.chat_id,
                user.first_name,
                credential.map(|c| c.access_token.clone()),
                credential.and_then(|c| c.workspace_id.clone()),
                credential.and_then(|c| c.workspace_name.clone()),
                credential.and_then(|c| c.workspace_icon.clone()),
                credential.and_then(|c| c.bot_id.clone()),
                user.study_mode,
                format_timestamp(&user.created_at),
                format_timestamp(&user.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM sys_users WHERE user_id = ?", USER_COLUMNS);
        self.query_user(&sql, &[&id.to_string()])
    }

    fn get_user_by_chat_id(&self, chat_id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM sys_users WHERE chat_id = ?", USER_COLUMNS);
        self.query_user(&sql, &[&chat_id])
    }

    fn set_credential(&self, user_id: Uuid, credential: Option<&NotionCredential>) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE sys_users SET notion_access_token = ?, notion_workspace_id = ?,
                    notion_workspace_name = ?, notion_workspace_icon = ?, notion_bot_id = ?,
                    updated_at = ?
             WHERE user_id = ?",
            params![
                credential.map(|c| c.access_token.clone()),
                credential.and_then(|c| c.workspace_id.clone()),
                credential.and_then(|c| c.workspace_name.clone()),
                credential.and_then(|c| c.workspace_icon.clone()),
                credential.and_then(|c| c.bot_id.clone()),
                format_timestamp(&Utc::now()),
                user_id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("user {}", user_id)));
        }
        Ok(())
    }

    fn set_active_cards(&self, user_id: Uuid, cards: &[Uuid]) -> Result<()> {
        let conn = self.lock()?;
        let sql = format!(
            "UPDATE sys_users SET active_cards = {}, updated_at = ? WHERE user_id = ?",
            format_id_array(cards)
        );
        let rows = conn.execute(
            &sql,
            params![format_timestamp(&Utc::now()), user_id.to_string()],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("user {}", user_id)));
        }
        Ok(())
    }

    fn set_study_mode(&self, user_id: Uuid, enabled: bool) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE sys_users SET study_mode = ?, updated_at = ? WHERE user_id = ?",
            params![enabled, format_timestamp(&Utc::now()), user_id.to_string()],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("user {}", user_id)));
        }
        Ok(())
    }

    // === Pages ===

    fn insert_page(&self, page: &Page) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_pages (page_id, user_id, external_id, title, last_reloaded_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                page.id.to_string(),
                page.user_id.to_string(),
                page.external_id,
                page.title,
                page.last_reloaded_at.as_ref().map(format_timestamp),
                format_timestamp(&page.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_page(&self, id: Uuid) -> Result<Option<Page>> {
        let sql = format!("SELECT {} FROM sys_pages WHERE page_id = ?", PAGE_COLUMNS);
        Ok(self.query_pages(&sql, &[&id.to_string()])?.into_iter().next())
    }

    fn get_page_by_external_id(&self, user_id: Uuid, external_id: &str) -> Result<Option<Page>> {
        let sql = format!(
            "SELECT {} FROM sys_pages WHERE user_id = ? AND external_id = ?",
            PAGE_COLUMNS
        );
        Ok(self
            .query_pages(&sql, &[&user_id.to_string(), &external_id])?
            .into_iter()
            .next())
    }

    fn list_pages(&self, user_id: Uuid, offset: usize, limit: usize) -> Result<Vec<Page>> {
        let sql = format!(
            "SELECT {} FROM sys_pages WHERE user_id = ?
             ORDER BY last_reloaded_at DESC NULLS LAST, title, page_id
             LIMIT ? OFFSET ?",
            PAGE_COLUMNS
        );
        self.query_pages(
            &sql,
            &[&user_id.to_string(), &(limit as i64), &(offset as i64)],
        )
    }

    fn count_pages(&self, user_id: Uuid) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_pages WHERE user_id = ?",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn get_stale_pages(&self, cutoff: DateTime<Utc>) -> Result<Vec<Page>> {
        let sql = format!(
            "SELECT {} FROM sys_pages
             WHERE last_reloaded_at IS NULL OR last_reloaded_at < ?
             ORDER BY last_reloaded_at NULLS FIRST, page_id",
            PAGE_COLUMNS
        );
        self.query_pages(&sql, &[&format_timestamp(&cutoff)])
    }

    fn set_page_reloaded(&self, page_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE sys_pages SET last_reloaded_at = ? WHERE page_id = ?",
            params![format_timestamp(&at), page_id.to_string()],
        )?;
        Ok(())
    }

    fn set_page_title(&self, page_id: Uuid, title: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE sys_pages SET title = ? WHERE page_id = ?",
            params![title, page_id.to_string()],
        )?;
        Ok(())
    }

    /// Delete a page and its flashcards
    ///
    /// Not wrapped in an explicit transaction: flashcards go first so a
    /// failure never leaves cards pointing at a missing page.
    fn delete_page(&self, page_id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        let id = page_id.to_string();
        conn.execute("DELETE FROM sys_flashcards WHERE page_id = ?", params![id])?;
        conn.execute("DELETE FROM sys_pages WHERE page_id = ?", params![id])?;
        Ok(())
    }

    // === Flashcards ===

    fn get_flashcard(&self, id: Uuid) -> Result<Option<Flashcard>> {
        let sql = format!(
            "SELECT {} FROM sys_flashcards WHERE flashcard_id = ?",
            FLASHCARD_COLUMNS
        );
        Ok(self
            .query_flashcards(&sql, &[&id.to_string()])?
            .into_iter()
            .next())
    }

    fn get_flashcards_by_page(&self, page_id: Uuid) -> Result<Vec<Flashcard>> {
        let sql = format!(
            "SELECT {} FROM sys_flashcards WHERE page_id = ? ORDER BY created_at, flashcard_id",
            FLASHCARD_COLUMNS
        );
        self.query_flashcards(&sql, &[&page_id.to_string()])
    }

    fn get_user_flashcards_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Flashcard>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM sys_flashcards WHERE user_id = ? AND flashcard_id IN ({})",
            FLASHCARD_COLUMNS,
            placeholders(ids.len())
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        values.extend(ids.iter().map(|id| Box::new(id.to_string()) as Box<dyn ToSql>));
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|b| b.as_ref()).collect();

        self.query_flashcards(&sql, &param_refs)
    }

    fn get_eligible_flashcards(
        &self,
        user_id: Uuid,
        threshold: f64,
        exclude: &[Uuid],
        limit: usize,
    ) -> Result<Vec<Flashcard>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let exclusion = if exclude.is_empty() {
            String::new()
        } else {
            format!("AND flashcard_id NOT IN ({})", placeholders(exclude.len()))
        };
        let sql = format!(
            "SELECT {} FROM sys_flashcards
             WHERE user_id = ? AND mastery < ? {}
             ORDER BY created_at, flashcard_id
             LIMIT ?",
            FLASHCARD_COLUMNS, exclusion
        );

        let mut values: Vec<Box<dyn ToSql>> =
            vec![Box::new(user_id.to_string()), Box::new(threshold)];
        values.extend(exclude.iter().map(|id| Box::new(id.to_string()) as Box<dyn ToSql>));
        values.push(Box::new(limit as i64));
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|b| b.as_ref()).collect();

        self.query_flashcards(&sql, &param_refs)
    }

    fn insert_flashcards(&self, cards: &[Flashcard]) -> Result<()> {
        if cards.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sys_flashcards (flashcard_id, page_id, user_id, block_id, front, back,
                                             mastery, created_at, edited_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for card in cards {
                stmt.execute(params![
                    card.id.to_string(),
                    card.page_id.to_string(),
                    card.user_id.to_string(),
                    card.block_id,
                    card.front,
                    card.back,
                    card.mastery,
                    format_timestamp(&card.created_at),
                    card.edited_at.as_ref().map(format_timestamp),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn update_flashcard_content(&self, card: &Flashcard) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE sys_flashcards SET front = ?, back = ?, edited_at = ? WHERE flashcard_id = ?",
            params![
                card.front,
                card.back,
                card.edited_at.as_ref().map(format_timestamp),
                card.id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("flashcard {}", card.id)));
        }
        Ok(())
    }

    fn set_mastery(&self, card_id: Uuid, mastery: f64) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE sys_flashcards SET mastery = ? WHERE flashcard_id = ?",
            params![mastery, card_id.to_string()],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("flashcard {}", card_id)));
        }
        Ok(())
    }

    fn delete_flashcards(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let conn = self.lock()?;
        let sql = format!(
            "DELETE FROM sys_flashcards WHERE flashcard_id IN ({})",
            placeholders(ids.len())
        );
        let values: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        conn.execute(&sql, param_refs.as_slice())?;
        Ok(())
    }

    // === Stats ===

    fn count_flashcards(&self, user_id: Uuid, threshold: f64) -> Result<(usize, usize)> {
        let conn = self.lock()?;
        let (total, graduated): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE mastery >= ?)
             FROM sys_flashcards WHERE user_id = ?",
            params![threshold, user_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((total as usize, graduated as usize))
    }
}

// Row mapping

fn row_to_user(row: &duckdb::Row) -> duckdb::Result<User> {
    let access_token: Option<String> = row.get(3)?;
    let credential = access_token.map(|access_token| NotionCredential {
        access_token,
        workspace_id: row.get(4).ok().flatten(),
        workspace_name: row.get(5).ok().flatten(),
        workspace_icon: row.get(6).ok().flatten(),
        bot_id: row.get(7).ok().flatten(),
    });
    let active_raw: Option<String> = row.get(8)?;
    let active_cards = parse_duckdb_array(active_raw.as_deref().unwrap_or(""))
        .iter()
        .filter_map(|s| Uuid::parse_str(s).ok())
        .collect();
    let created: String = row.get(10)?;
    let updated: String = row.get(11)?;

    Ok(User {
        id: uuid_column(row, 0)?,
        chat_id: row.get(1)?,
        first_name: row.get(2)?,
        credential,
        active_cards,
        study_mode: row.get(9)?,
        created_at: parse_timestamp(&created),
        updated_at: parse_timestamp(&updated),
    })
}

fn row_to_page(row: &duckdb::Row) -> duckdb::Result<Page> {
    let reloaded: Option<String> = row.get(4)?;
    let created: String = row.get(5)?;

    Ok(Page {
        id: uuid_column(row, 0)?,
        user_id: uuid_column(row, 1)?,
        external_id: row.get(2)?,
        title: row.get(3)?,
        last_reloaded_at: reloaded.as_deref().map(parse_timestamp),
        created_at: parse_timestamp(&created),
    })
}

fn row_to_flashcard(row: &duckdb::Row) -> duckdb::Result<Flashcard> {
    let created: String = row.get(7)?;
    let edited: Option<String> = row.get(8)?;

    Ok(Flashcard {
        id: uuid_column(row, 0)?,
        page_id: uuid_column(row, 1)?,
        user_id: uuid_column(row, 2)?,
        block_id: row.get(3)?,
        front: row.get(4)?,
        back: row.get(5)?,
        mastery: row.get(6)?,
        created_at: parse_timestamp(&created),
        edited_at: edited.as_deref().map(parse_timestamp),
    })
}

fn uuid_column(row: &duckdb::Row, idx: usize) -> duckdb::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// Helper functions

/// Fixed-width UTC timestamps so string comparison matches time order
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Format ids as a DuckDB list literal: ['id1', 'id2']::VARCHAR[]
fn format_id_array(ids: &[Uuid]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{}'", id)).collect();
    format!("[{}]::VARCHAR[]", quoted.join(", "))
}

/// Parse DuckDB array string format: [a, b] or ['a', 'b']
fn parse_duckdb_array(s: &str) -> Vec<String> {
    let s = s.trim();
    if s.is_empty() || s == "[]" || s == "NULL" {
        return Vec::new();
    }

    let inner = s.trim_start_matches('[').trim_end_matches(']');
    if inner.is_empty() {
        return Vec::new();
    }

    inner
        .split(',')
        .map(|item| item.trim().trim_matches('\'').trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
