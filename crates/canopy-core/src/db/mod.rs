//! SQLite store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers proceed while a writer commits
//! - `busy_timeout` from [`StoreConfig`] to absorb transient lock waits
//! - `foreign_keys = ON` so closures can never outlive their nodes

pub mod migrations;
pub mod schema;
mod store;

pub use store::{SqliteStore, SqliteTx};

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::config::StoreConfig;

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path, config: &StoreConfig) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn, config).context("configure sqlite pragmas")?;
    let version = migrations::migrate(&mut conn).context("apply store migrations")?;
    tracing::info!(path = %path.display(), schema_version = version, "opened forest store");

    Ok(conn)
}

/// Open the store only if its database file already exists.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be opened or migrated.
pub fn try_open_store(path: &Path, config: &StoreConfig) -> Result<Option<Connection>> {
    if !path.exists() {
        return Ok(None);
    }
    open_store(path, config).map(Some)
}

fn configure_connection(conn: &Connection, config: &StoreConfig) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(config.busy_timeout())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{open_store, try_open_store};
    use crate::config::StoreConfig;
    use crate::db::migrations;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("canopy.db");
        (dir, path)
    }

    #[test]
    fn open_store_sets_wal_busy_timeout_and_fk() {
        let (_dir, path) = temp_db_path();
        let config = StoreConfig::default();
        let conn = open_store(&path, &config).expect("open store db");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(u128::from(busy_timeout_ms), config.busy_timeout().as_millis());

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_store_runs_migrations() {
        let (_dir, path) = temp_db_path();
        let conn = open_store(&path, &StoreConfig::default()).expect("open store db");

        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn try_open_store_skips_missing_file() {
        let (_dir, path) = temp_db_path();
        let conn = try_open_store(&path, &StoreConfig::default()).expect("try open");
        assert!(conn.is_none());
        assert!(!path.exists());
    }
}
