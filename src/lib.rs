//! Herd - livestock lifecycle and location history
//!
//! Herd tracks animals across fields (paddocks). Every move, sale and status
//! change is recorded as an append-only event, and the current state of an
//! animal is always derived from that history. All data is partitioned by
//! owner.
//!
//! - [`engine::Lifecycle`] performs the multi-step writes atomically
//! - [`report::Reader`] answers current-state and occupancy queries
//! - [`storage`] holds the SQLite schema, ledgers and project config

pub mod domain;
pub mod storage;
pub mod engine;
pub mod report;
pub mod cli;

pub use domain::{Animal, AnimalId, Field, FieldId, GeneralStatus, OwnerId, ProductiveCycle};
pub use engine::{EngineError, Lifecycle};
pub use report::Reader;
pub use storage::{Database, Project};
