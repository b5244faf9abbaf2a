//! SQLite storage.
//!
//! One connection behind a mutex, shared by every service. Repository functions take a
//! `&Connection`; a [`rusqlite::Transaction`] derefs to one, so the same functions run inside
//! [`Database::transaction`] when several rows must change together.

use crate::config::sqlite_path_from_url;
use crate::{HospitalError, HospitalResult};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../migrations/001_initial.sql"))];

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database named by a connection string and bring its schema up to date.
    pub fn open(url: &str) -> HospitalResult<Self> {
        match sqlite_path_from_url(url) {
            Some(path) => Self::open_path(Path::new(path)),
            None => Self::open_in_memory(),
        }
    }

    pub fn open_path(path: &Path) -> HospitalResult<Self> {
        let conn = Connection::open(path)?;
        Self::prepare(conn)
    }

    /// Open a private in-memory database (tests, `DATABASE_URL=:memory:`).
    pub fn open_in_memory() -> HospitalResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> HospitalResult<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode=DELETE;
             PRAGMA foreign_keys=ON;",
        )?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with the connection held for its whole duration.
    pub fn with_conn<T, F>(&self, f: F) -> HospitalResult<T>
    where
        F: FnOnce(&Connection) -> HospitalResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| HospitalError::LockPoisoned)?;
        f(&conn)
    }

    /// Run `f` inside a transaction. The transaction commits only if `f` returns `Ok`;
    /// otherwise it is rolled back when dropped.
    pub fn transaction<T, F>(&self, f: F) -> HospitalResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> HospitalResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| HospitalError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

fn run_migrations(conn: &Connection) -> HospitalResult<()> {
    let current_version = current_schema_version(conn);

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| HospitalError::MigrationFailed {
                    version: *version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Current schema version (0 before the first migration).
pub fn current_schema_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// Read a text column and parse it with `FromStr`, surfacing parse failures as a rusqlite
/// conversion error so they propagate through `query_map`.
pub(crate) fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_optional_column<T>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        value.parse::<T>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn count_tables(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |row| row.get(0),
        )
        .expect("should count tables")
    }

    #[test]
    fn test_open_in_memory_runs_migrations() {
        let db = Database::open_in_memory().expect("should open");
        db.with_conn(|conn| {
            assert_eq!(current_schema_version(conn), 1);
            assert_eq!(count_tables(conn), 7);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_reopening_a_file_database_does_not_rerun_migrations() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("curasphere.db");

        Database::open_path(&path).expect("first open should migrate");
        let db = Database::open(path.to_str().unwrap()).expect("second open should succeed");

        db.with_conn(|conn| {
            let rows: i64 =
                conn.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))?;
            assert_eq!(rows, 1, "migration v1 should be recorded once");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();

        let result: HospitalResult<()> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO users (id, username, email, role, password_hash, created_at, updated_at)
                 VALUES ('u1', 'n', 'e@x.org', 'admin', 'h', 't', 't')",
                [],
            )?;
            Err(HospitalError::validation("abort"))
        });
        assert!(result.is_err());

        let users: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(users, 0, "insert should have been rolled back");
    }
}
