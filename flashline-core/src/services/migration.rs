//! Migration service - embedded SQL schema migrations
//!
//! Every database keeps its applied migration names in `sys_migrations`.
//! The `000_migrations.sql` entry creates that table with `IF NOT EXISTS`
//! and is executed before anything is read from it.

use std::collections::HashSet;

use duckdb::Connection;

use crate::domain::result::{Error, Result};
use crate::migrations::MIGRATIONS;

/// `(file name, sql)` pair compiled in with `include_str!`
pub type Migration = (&'static str, &'static str);

const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";

#[derive(Debug)]
pub struct MigrationResult {
    /// Names of migrations applied by this run, in order
    pub applied: Vec<String>,
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: &'static [Migration],
}

impl<'a> MigrationService<'a> {
    /// Migrations for the main flashline database
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    /// Migrations for another database (the event log has its own set)
    pub fn with_migrations(conn: &'a Connection, migrations: &'static [Migration]) -> Self {
        Self { conn, migrations }
    }

    /// Apply every migration not yet recorded, in declaration order
    pub fn run_pending(&self) -> Result<MigrationResult> {
        self.bootstrap()?;
        let recorded: HashSet<String> = self.get_applied()?.into_iter().collect();

        let mut result = MigrationResult {
            applied: Vec::new(),
            already_applied: 0,
        };

        for (name, sql) in self.migrations {
            if recorded.contains(*name) {
                result.already_applied += 1;
                continue;
            }

            tracing::debug!(migration = name, "applying migration");
            self.conn
                .execute_batch(sql)
                .map_err(|e| Error::database(format!("migration {} failed: {}", name, e)))?;
            self.conn.execute(
                "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                [name],
            )?;
            result.applied.push(name.to_string());
        }

        Ok(result)
    }

    fn bootstrap(&self) -> Result<()> {
        let (_, sql) = self
            .migrations
            .iter()
            .find(|(name, _)| *name == BOOTSTRAP_MIGRATION)
            .ok_or_else(|| Error::database("migration set has no sys_migrations bootstrap"))?;
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Recorded migration names, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded: HashSet<String> = self.get_applied()?.into_iter().collect();
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }
}
