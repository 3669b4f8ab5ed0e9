//! Market reference price commands

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use rust_decimal::Decimal;

use super::output::Output;
use super::session::{today, Session};
use crate::domain::DateRange;

#[derive(Subcommand)]
pub enum PriceCommands {
    /// Record the reference price of a category
    Add {
        /// Livestock category (e.g. steer, cow)
        category: String,

        #[arg(long)]
        price: Decimal,

        /// Price date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List recorded prices, newest first
    List {
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

pub fn run(cmd: PriceCommands, output: &Output, owner: Option<&str>) -> Result<()> {
    let mut session = Session::open(owner)?;

    match cmd {
        PriceCommands::Add { category, price, date } => {
            let owner = session.owner.clone();
            let recorded = session.lifecycle().record_market_price(
                &owner,
                date.unwrap_or_else(today),
                &category,
                price,
            )?;

            if output.is_json() {
                output.data(&recorded);
            } else {
                output.success(&format!(
                    "Recorded {} at ${} on {}",
                    recorded.category, recorded.price, recorded.date
                ));
            }
        }

        PriceCommands::List { category, from, to } => {
            let prices = session.reader().market_prices(
                &session.owner,
                category.as_deref(),
                &DateRange::new(from, to),
            )?;

            if output.is_json() {
                output.data(&prices);
            } else if prices.is_empty() {
                output.empty("prices");
            } else {
                println!("{:<12} {:<16} {:>12}", "DATE", "CATEGORY", "PRICE");
                println!("{}", "-".repeat(42));
                for p in &prices {
                    println!("{:<12} {:<16} {:>12}", p.date.to_string(), p.category, p.price.to_string());
                }
            }
        }
    }

    Ok(())
}
