//! Database Schema Migrations
//!
//! Ordered list of schema migrations applied by [`super::LocalDatabase`] on open.
//! Versions are recorded in `schema_migrations` so each runs once per file.

/// One schema migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, ascending by version
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "entity cache, pending log and session tables",
    sql: include_str!("schema.sql"),
}];

/// Latest schema version known to this build
pub fn current_version() -> i32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Migrations newer than `applied_version`, in order
pub fn pending_migrations(applied_version: i32) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS.iter().filter(move |m| m.version > applied_version)
}
