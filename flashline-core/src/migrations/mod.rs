//! Schema migrations for flashline.duckdb
//!
//! Each entry is `(name, sql)`; names sort in application order. The `000`
//! entry creates `sys_migrations` and must stay first.

use crate::services::Migration;

pub const MIGRATIONS: &[Migration] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_study_schema.sql", include_str!("001_study_schema.sql")),
];
