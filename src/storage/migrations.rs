//! Database migrations

use rusqlite::Connection;

use crate::error::{PayError, Result};

const MIGRATIONS: [&str; 2] = [
    include_str!("../../migrations/001_initial_schema.sql"),
    include_str!("../../migrations/002_add_skill_events.sql"),
];

#[allow(clippy::cast_possible_truncation)]
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Run pending migrations, tracked through `PRAGMA user_version`.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    let current_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;

    for (version, sql) in (1..=SCHEMA_VERSION).zip(MIGRATIONS) {
        if current_version >= version {
            continue;
        }

        conn.execute_batch(sql).map_err(|err| {
            PayError::CorruptRecord(format!("migration {version} failed: {err}"))
        })?;
        conn.pragma_update(None, "user_version", version)?;
        tracing::debug!(version, "Applied migration");
    }

    Ok(SCHEMA_VERSION)
}
