//! Main CLI application structure

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{animal, events, field, price, report, vaccine};
use crate::engine::EngineError;
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "herd")]
#[command(author, version, about = "Livestock lifecycle and location history")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Owner (tenant) to act as
    #[arg(long, global = true, env = "HERD_OWNER")]
    pub owner: Option<String>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new herd project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage fields (paddocks)
    #[command(subcommand)]
    Field(field::FieldCommands),

    /// Manage animals
    #[command(subcommand)]
    Animal(animal::AnimalCommands),

    /// Manage the vaccine catalogue
    #[command(subcommand)]
    Vaccine(vaccine::VaccineCommands),

    /// Move an animal to another field
    Transfer(events::TransferArgs),

    /// List transfers, newest first
    Transfers(events::TransferListArgs),

    /// Record the sale of an animal
    Sell(events::SellArgs),

    /// List sales, newest first
    Sales(events::SaleListArgs),

    /// Record a vaccination
    Vaccinate(events::VaccinateArgs),

    /// List vaccinations, newest first
    Vaccinations(events::VaccinationListArgs),

    /// Append a status snapshot (e.g. `--general dead`)
    Status(events::StatusArgs),

    /// Show where an animal is and its current status
    State {
        /// Animal ID or tag
        animal: String,
    },

    /// Show field occupancy (all fields, or one)
    Occupancy {
        /// Field ID or name
        field: Option<String>,
    },

    /// Show totals and month-to-date activity
    Dashboard {
        /// Reference day (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Market reference prices
    #[command(subcommand)]
    Price(price::PriceCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load().map(|c| c.global.default_format).unwrap_or_default(),
    };
    let output = Output::new(format);
    let owner = cli.owner.as_deref();

    debug!(owner = ?owner, "herd starting");

    match cli.command {
        Commands::Init { path } => {
            let project = Project::init(&path)?;
            output.success(&format!("Initialized herd project at {}", project.root().display()));
        }

        Commands::Field(cmd) => field::run(cmd, &output, owner)?,
        Commands::Animal(cmd) => animal::run(cmd, &output, owner)?,
        Commands::Vaccine(cmd) => vaccine::run(cmd, &output, owner)?,

        Commands::Transfer(args) => events::transfer(&output, owner, args)?,
        Commands::Transfers(args) => events::transfers(&output, owner, args)?,
        Commands::Sell(args) => events::sell(&output, owner, args)?,
        Commands::Sales(args) => events::sales(&output, owner, args)?,
        Commands::Vaccinate(args) => events::vaccinate(&output, owner, args)?,
        Commands::Vaccinations(args) => events::vaccinations(&output, owner, args)?,
        Commands::Status(args) => events::status(&output, owner, args)?,

        Commands::State { animal } => report::state(&output, owner, &animal)?,
        Commands::Occupancy { field } => report::occupancy(&output, owner, field.as_deref())?,
        Commands::Dashboard { date } => report::dashboard(&output, owner, date)?,

        Commands::Price(cmd) => price::run(cmd, &output, owner)?,
    }

    debug!("command completed");
    Ok(())
}

/// Process exit status for a failed command
///
/// 2 when the engine rejected the input (not found, duplicate, other owner,
/// invalid), 1 for everything else.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<EngineError>() {
        Some(err) if err.is_rejection() => 2,
        _ => 1,
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default filter
fn init_logging(verbose: bool) {
    let default = if verbose { "herd=debug" } else { "herd=warn" };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeneralStatus, ProductiveCycle};
    use crate::storage::StoreError;
    use clap::CommandFactory;
    use rust_decimal::Decimal;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sell() {
        let cli = Cli::try_parse_from([
            "herd", "sell", "A1", "--buyer", "Buyer X", "--price", "500000.50", "--date", "2024-03-01",
        ])
        .unwrap();

        match cli.command {
            Commands::Sell(args) => {
                assert_eq!(args.animal, "A1");
                assert_eq!(args.price, Decimal::new(50000050, 2));
                assert_eq!(args.date, "2024-03-01".parse().ok());
            }
            _ => panic!("expected sell"),
        }
    }

    #[test]
    fn parses_status_values() {
        let cli = Cli::try_parse_from([
            "herd", "--format", "json", "status", "A1", "--cycle", "heifer_calf", "--general", "dead",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.cycle, Some(ProductiveCycle::HeiferCalf));
                assert_eq!(args.general, Some(GeneralStatus::Dead));
                assert_eq!(args.health, None);
            }
            _ => panic!("expected status"),
        }
    }

    #[test]
    fn rejections_exit_with_two() {
        let rejected = anyhow::Error::from(EngineError::validation("price must not be negative"));
        assert_eq!(exit_status(&rejected), 2);

        let store = EngineError::Store(StoreError::Overflow("sales total"));
        let store = anyhow::Error::from(store);
        assert_eq!(exit_status(&store), 1);

        assert_eq!(exit_status(&anyhow::anyhow!("Not in a herd project")), 1);
    }

    #[test]
    fn rejects_bad_date() {
        assert!(Cli::try_parse_from(["herd", "transfer", "A1", "North", "--date", "01/02/2024"]).is_err());
    }
}
