//! # Storage Layer
//!
//! Persistence layer for herd, backed by a single SQLite database.
//!
//! ## Tables
//!
//! | Data | Kind | Module |
//! |------|------|--------|
//! | Fields | Registry | [`FieldRegistry`] |
//! | Animals | Registry | [`AnimalRegistry`] |
//! | Vaccines | Registry | [`VaccineRegistry`] |
//! | Status snapshots | Append-only ledger | [`StatusHistory`] |
//! | Stays | Ledger (exit date set once) | [`StayLedger`] |
//! | Transfers, sales, vaccinations | Append-only ledgers | [`EventLedger`] |
//! | Market prices | Append-only list | [`PriceList`] |
//!
//! ## Consistency
//!
//! - Every compound write runs inside one `BEGIN IMMEDIATE` transaction
//!   (see [`Database::write`]); nothing here commits on its own.
//! - Stay and status writes are crate-private: only the lifecycle engine
//!   may append to those ledgers.
//! - A partial unique index guarantees at most one open stay per animal.
//!
//! ## Project Structure
//!
//! ```text
//! .herd/
//! ├── herd.db               # SQLite ledger database
//! ├── config.toml           # Project configuration
//! └── .gitignore            # Ignores WAL side files
//! ```

mod db;
mod fields;
mod animals;
mod vaccines;
mod status;
mod stays;
mod events;
mod prices;
mod config;
mod project;

use thiserror::Error;

use crate::domain::AnimalId;

pub use db::{Database, RowCounts};
pub use fields::FieldRegistry;
pub use animals::{AnimalFilter, AnimalRegistry};
pub use vaccines::VaccineRegistry;
pub use status::{CurrentValues, StatusHistory};
pub use stays::StayLedger;
pub use events::EventLedger;
pub use prices::PriceList;
pub use config::{Config, ConfigError, GlobalConfig, OccupancyConfig, OutputFormat, ProjectConfig};
pub use project::{Project, ProjectError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("A {kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("An animal tagged '{0}' already exists")]
    DuplicateTag(String),

    #[error("A market price for '{category}' on {date} already exists")]
    DuplicatePrice { date: String, category: String },

    #[error("Animal {0} has no open stay")]
    NoOpenStay(AnimalId),

    #[error("Could not allocate a free {kind} ID (last tried {id})")]
    IdExhausted { kind: &'static str, id: String },

    #[error("{0} overflowed")]
    Overflow(&'static str),

    #[error("Database schema version {found} is newer than supported version {supported}")]
    SchemaVersion { found: i32, supported: i32 },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
