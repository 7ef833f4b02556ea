//! Event log migrations for logs.duckdb
//!
//! Applied by `MigrationService::with_migrations`, separately from the main
//! schema.

use crate::services::Migration;

pub const LOG_MIGRATIONS: &[Migration] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_event_log.sql", include_str!("001_event_log.sql")),
];
