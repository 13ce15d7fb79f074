//! Forward-only schema migrations, tracked in `PRAGMA user_version`.

use super::schema;
use rusqlite::{Connection, types::Type};

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Schema version a freshly migrated store ends up at.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// Version recorded in the database file; 0 for a brand new file.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or is negative.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(err)))
}

/// Bring the store up to [`LATEST_SCHEMA_VERSION`]. Each step commits with
/// its version bump, so an interrupted run resumes where it stopped.
///
/// # Errors
///
/// Returns an error if a migration statement fails; earlier steps stay
/// applied.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = current_schema_version(conn)?;
    let mut reached = start;

    for step in MIGRATIONS.iter().filter(|m| m.version > start) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", i64::from(step.version))?;
        tx.commit()?;
        tracing::debug!(version = step.version, "applied store migration");
        reached = step.version;
    }

    Ok(reached)
}
