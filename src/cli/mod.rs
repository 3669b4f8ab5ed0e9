//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init` |
//! | Registry | Fields, animals, vaccines | `field add`, `animal intake`, `vaccine list` |
//! | Events | Lifecycle changes | `transfer`, `sell`, `vaccinate`, `status` |
//! | Ledgers | Event history | `transfers`, `sales`, `vaccinations` |
//! | Reports | Derived views | `state`, `occupancy`, `dashboard` |
//! | Prices | Market reference prices | `price add`, `price list` |
//!
//! Animals, fields and vaccines can be referenced by ID or by tag/name.
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Tenancy
//!
//! Every command acts as one owner, taken from `--owner` / `HERD_OWNER`,
//! then the project and global config.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! herd --verbose dashboard
//! ```
//!
//! ## Exit Status
//!
//! `0` on success, `2` when the input was rejected (unknown reference,
//! duplicate, another owner's record, invalid value), `1` for other failures.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod session;
mod field;
mod animal;
mod vaccine;
mod events;
mod report;
mod price;

pub use app::{exit_status, Cli, Commands, run};
pub use output::{Output, OutputFormat};
