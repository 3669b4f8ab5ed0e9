//! SQLite ledger database
//!
//! The database lives at `.herd/herd.db` and is the single source of truth:
//! registries (fields, animals, vaccines) and append-only ledgers (status
//! snapshots, stays, transfers, sales, vaccinations, market prices).
//!
//! Writers take `BEGIN IMMEDIATE` transactions, so two compound operations
//! never interleave. Readers use deferred transactions and see a committed
//! snapshot (WAL mode).

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

use super::StoreError;

/// SQLite database holding every registry and ledger
pub struct Database {
    /// Path to the database file (`None` for in-memory databases)
    path: Option<PathBuf>,

    /// Database connection
    conn: Connection,
}

impl Database {
    /// Schema version - bump when the schema changes
    pub const SCHEMA_VERSION: i32 = 1;

    /// Opens (or creates) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // WAL keeps readers off the writer's lock
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens a private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let mut db = Self { path, conn };
        db.ensure_schema()?;

        Ok(db)
    }

    /// Sets how long a writer waits for another writer before failing
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Ensures the schema is up to date
    fn ensure_schema(&mut self) -> Result<()> {
        let current_version = self.get_schema_version()?;

        match current_version {
            0 => self.create_schema(),
            v if v == Self::SCHEMA_VERSION => Ok(()),
            found => Err(StoreError::SchemaVersion {
                found,
                supported: Self::SCHEMA_VERSION,
            }
            .into()),
        }
    }

    /// Gets the current schema version
    fn get_schema_version(&self) -> Result<i32> {
        let result: Option<i32> = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .optional()?;

        Ok(result.unwrap_or(0))
    }

    /// Creates the schema in a fresh database
    fn create_schema(&mut self) -> Result<()> {
        debug!(path = ?self.path, "creating ledger schema");

        let tx = self.conn.transaction()?;

        tx.execute_batch(
            "
            CREATE TABLE fields (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                area REAL CHECK (area IS NULL OR area > 0),
                location TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                UNIQUE (owner, name)
            );

            CREATE TABLE animals (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                tag TEXT NOT NULL,
                breed TEXT NOT NULL,
                sex TEXT NOT NULL,
                birth_date TEXT,
                intake_date TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                UNIQUE (owner, tag)
            );

            CREATE TABLE vaccines (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                laboratory TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                UNIQUE (owner, name)
            );

            CREATE TABLE status_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                animal_id TEXT NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
                recorded_at TEXT NOT NULL,
                productive_cycle TEXT,
                health TEXT,
                general_status TEXT,
                notes TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE stays (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                animal_id TEXT NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
                field_id TEXT NOT NULL REFERENCES fields(id) ON DELETE CASCADE,
                entry_date TEXT NOT NULL,
                exit_date TEXT,
                notes TEXT NOT NULL DEFAULT '',
                CHECK (exit_date IS NULL OR exit_date >= entry_date)
            );

            CREATE TABLE transfers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                animal_id TEXT NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
                origin_id TEXT NOT NULL REFERENCES fields(id) ON DELETE CASCADE,
                destination_id TEXT NOT NULL REFERENCES fields(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE sales (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                animal_id TEXT NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                buyer TEXT NOT NULL,
                price TEXT NOT NULL,
                destination TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE vaccinations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                animal_id TEXT NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
                vaccine_id TEXT NOT NULL REFERENCES vaccines(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                dose TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE market_prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                date TEXT NOT NULL,
                category TEXT NOT NULL,
                price TEXT NOT NULL,
                UNIQUE (owner, date, category)
            );

            -- At most one open stay per animal; also the hot lookup path
            CREATE UNIQUE INDEX idx_stays_open ON stays(animal_id) WHERE exit_date IS NULL;
            CREATE INDEX idx_stays_field_open ON stays(field_id) WHERE exit_date IS NULL;
            CREATE INDEX idx_stays_animal ON stays(animal_id, entry_date);
            CREATE INDEX idx_status_animal ON status_snapshots(animal_id, recorded_at);
            CREATE INDEX idx_transfers_date ON transfers(date);
            CREATE INDEX idx_sales_date ON sales(date);
            CREATE INDEX idx_vaccinations_animal ON vaccinations(animal_id, date);
            CREATE INDEX idx_fields_owner ON fields(owner);
            CREATE INDEX idx_animals_owner ON animals(owner);
            ",
        )?;

        tx.execute(
            &format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION),
            [],
        )?;

        tx.commit()?;

        Ok(())
    }

    /// Starts a write transaction that holds the write lock until dropped
    pub fn write(&mut self) -> Result<Transaction<'_>, StoreError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Starts a read transaction; every query in it sees the same snapshot
    pub fn read(&self) -> Result<Transaction<'_>, StoreError> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Counts rows in every ledger table
    pub fn row_counts(&self) -> Result<RowCounts, StoreError> {
        let count = |table: &str| -> Result<usize, StoreError> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(RowCounts {
            fields: count("fields")?,
            animals: count("animals")?,
            status_snapshots: count("status_snapshots")?,
            stays: count("stays")?,
            transfers: count("transfers")?,
            sales: count("sales")?,
            vaccinations: count("vaccinations")?,
        })
    }

    /// Returns the path to the database file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub fields: usize,
    pub animals: usize,
    pub status_snapshots: usize,
    pub stays: usize,
    pub transfers: usize,
    pub sales: usize,
    pub vaccinations: usize,
}

/// Dates are stored as ISO `YYYY-MM-DD`, which sorts lexicographically
pub(crate) fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Timestamps use a fixed-width RFC 3339 form so they sort as text
pub(crate) fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Salts tried per entity ID before giving up
const ID_ATTEMPTS: u32 = 16;

/// Derives an entity ID with `derive(salt)`, re-salting while `taken` says
/// the ID is already in use
///
/// Entity IDs share one table across all owners and carry a short hash, so a
/// clash with another row is possible.
pub(crate) fn unused_id<T: std::fmt::Display>(
    kind: &'static str,
    derive: impl Fn(u32) -> T,
    taken: impl Fn(&T) -> Result<bool, StoreError>,
) -> Result<T, StoreError> {
    let mut last = None;
    for salt in 0..ID_ATTEMPTS {
        let id = derive(salt);
        if !taken(&id)? {
            if salt > 0 {
                debug!(kind, id = %id, salt, "re-derived clashing ID");
            }
            return Ok(id);
        }
        last = Some(id);
    }

    Err(StoreError::IdExhausted {
        kind,
        id: last.map(|id| id.to_string()).unwrap_or_default(),
    })
}

/// Reads a text column and parses it
pub(crate) fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads a nullable text column and parses it
pub(crate) fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn database_creation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".herd").join("herd.db");
        let db = Database::open(&path).unwrap();

        assert_eq!(db.path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[test]
    fn schema_version() {
        let db = Database::open_in_memory().unwrap();

        let version = db.get_schema_version().unwrap();
        assert_eq!(version, Database::SCHEMA_VERSION);
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("herd.db");

        {
            let db = Database::open(&path).unwrap();
            db.conn
                .execute(
                    "INSERT INTO fields (id, owner, name, created_at) VALUES ('f-1234567', 'me', 'North', '2024-01-01T00:00:00.000000Z')",
                    [],
                )
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.row_counts().unwrap().fields, 1);
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("herd.db");

        {
            let db = Database::open(&path).unwrap();
            db.conn.execute("PRAGMA user_version = 99", []).unwrap();
        }

        assert!(Database::open(&path).is_err());
    }

    #[test]
    fn open_stay_index_rejects_second_open_stay() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute_batch(
                "
                INSERT INTO fields (id, owner, name, created_at) VALUES ('f-1234567', 'me', 'North', 'x');
                INSERT INTO animals (id, owner, tag, breed, sex, intake_date, created_at)
                    VALUES ('a-1234567', 'me', 'A1', 'Angus', 'male', '2024-01-01', 'x');
                INSERT INTO stays (animal_id, field_id, entry_date) VALUES ('a-1234567', 'f-1234567', '2024-01-01');
                ",
            )
            .unwrap();

        let second = db.conn.execute(
            "INSERT INTO stays (animal_id, field_id, entry_date) VALUES ('a-1234567', 'f-1234567', '2024-02-01')",
            [],
        );
        assert!(second.is_err());
    }

    #[test]
    fn unused_id_skips_taken_ids() {
        let id = unused_id("field", |salt| salt * 10, |id| Ok(*id < 30)).unwrap();
        assert_eq!(id, 30);

        let exhausted = unused_id("field", |salt| salt, |_| Ok(true));
        assert!(matches!(exhausted, Err(StoreError::IdExhausted { kind: "field", .. })));
    }

    #[test]
    fn timestamps_sort_as_text() {
        let earlier: DateTime<Utc> = "2024-01-01T09:00:00Z".parse().unwrap();
        let later: DateTime<Utc> = "2024-01-01T10:00:00.5Z".parse().unwrap();

        assert!(timestamp_text(earlier) < timestamp_text(later));
        assert_eq!(timestamp_text(earlier).parse::<DateTime<Utc>>().unwrap(), earlier);
    }
}
