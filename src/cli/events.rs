//! Lifecycle event CLI commands: transfers, sales, vaccinations, status

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;

use super::output::{or_dash, Output};
use super::session::{today, Session};
use crate::domain::{
    DateRange, FieldId, GeneralStatus, Health, NewSale, NewStatus, ProductiveCycle, SaleFilter,
    TransferFilter, VaccinationFilter,
};
use crate::engine::{NewVaccination, TransferOutcome};

#[derive(Args)]
pub struct TransferArgs {
    /// Animal ID or tag
    pub animal: String,

    /// Destination field ID or name
    pub field: String,

    /// Transfer date (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args)]
pub struct TransferListArgs {
    /// Animal ID or tag
    #[arg(long)]
    pub animal: Option<String>,

    /// Origin field ID or name
    #[arg(long)]
    pub origin: Option<String>,

    /// Destination field ID or name
    #[arg(long)]
    pub destination: Option<String>,

    /// Earliest date (inclusive)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest date (inclusive)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Args)]
pub struct SellArgs {
    /// Animal ID or tag
    pub animal: String,

    #[arg(long)]
    pub buyer: String,

    #[arg(long)]
    pub price: Decimal,

    /// Sale date (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Where the animal goes
    #[arg(long, default_value = "")]
    pub destination: String,

    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args)]
pub struct SaleListArgs {
    /// Buyer name contains (case-insensitive)
    #[arg(long)]
    pub buyer: Option<String>,

    #[arg(long)]
    pub from: Option<NaiveDate>,

    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Args)]
pub struct VaccinateArgs {
    /// Animal ID or tag
    pub animal: String,

    /// Vaccine ID or name
    pub vaccine: String,

    /// Vaccination date (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long, default_value = "")]
    pub dose: String,

    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args)]
pub struct VaccinationListArgs {
    /// Animal ID or tag
    #[arg(long)]
    pub animal: Option<String>,

    #[arg(long)]
    pub from: Option<NaiveDate>,

    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Animal ID or tag
    pub animal: String,

    /// Productive cycle (calf, steer, bull, heifer-calf, heifer, cow)
    #[arg(long)]
    pub cycle: Option<ProductiveCycle>,

    /// Health (healthy, brucellosis, tuberculosis, other)
    #[arg(long)]
    pub health: Option<Health>,

    /// General status (active, sold, dead, transferred)
    #[arg(long)]
    pub general: Option<GeneralStatus>,

    #[arg(long, default_value = "")]
    pub notes: String,
}

pub fn transfer(output: &Output, owner: Option<&str>, args: TransferArgs) -> Result<()> {
    let mut session = Session::open(owner)?;
    let animal = session.animal_id(&args.animal)?;
    let field = session.field_id(&args.field)?;
    let date = args.date.unwrap_or_else(today);

    let owner = session.owner.clone();
    let outcome = session
        .lifecycle()
        .transfer(&owner, &animal, &field, date, &args.notes)?;

    if output.is_json() {
        output.data(&outcome);
        return Ok(());
    }

    let names = field_names(&session)?;
    match &outcome {
        TransferOutcome::AlreadyThere { field } => {
            output.success(&format!("{} is already in {}", args.animal, name_of(&names, field)));
        }
        TransferOutcome::Moved { transfer: Some(transfer), .. } => {
            output.success(&format!(
                "Moved {} from {} to {} on {}",
                args.animal,
                name_of(&names, &transfer.origin),
                name_of(&names, &transfer.destination),
                transfer.date
            ));
        }
        TransferOutcome::Moved { transfer: None, stay, .. } => {
            output.success(&format!(
                "Placed {} in {} on {}",
                args.animal,
                name_of(&names, &stay.field),
                stay.entry_date
            ));
        }
    }

    Ok(())
}

pub fn transfers(output: &Output, owner: Option<&str>, args: TransferListArgs) -> Result<()> {
    let session = Session::open(owner)?;
    let filter = TransferFilter {
        animal: args.animal.map(|a| session.animal_id(&a)).transpose()?,
        origin: args.origin.map(|f| session.field_id(&f)).transpose()?,
        destination: args.destination.map(|f| session.field_id(&f)).transpose()?,
        dates: DateRange::new(args.from, args.to),
    };
    let transfers = session.reader().transfers(&session.owner, &filter)?;

    if output.is_json() {
        output.data(&transfers);
    } else if transfers.is_empty() {
        output.empty("transfers");
    } else {
        let names = field_names(&session)?;
        println!("{:<12} {:<12} {:<16} {:<16} NOTES", "DATE", "ANIMAL", "FROM", "TO");
        println!("{}", "-".repeat(70));
        for t in &transfers {
            println!(
                "{:<12} {:<12} {:<16} {:<16} {}",
                t.date.to_string(),
                t.animal,
                name_of(&names, &t.origin),
                name_of(&names, &t.destination),
                t.notes
            );
        }
    }

    Ok(())
}

pub fn sell(output: &Output, owner: Option<&str>, args: SellArgs) -> Result<()> {
    let mut session = Session::open(owner)?;
    let animal = session.animal_id(&args.animal)?;

    let sale = NewSale {
        date: args.date.unwrap_or_else(today),
        buyer: args.buyer,
        price: args.price,
        destination: args.destination,
        notes: args.notes,
    };

    let owner = session.owner.clone();
    let outcome = session.lifecycle().sell(&owner, &animal, &sale)?;

    if output.is_json() {
        output.data(&outcome);
    } else {
        output.success(&format!(
            "Sold {} to {} for ${} on {}",
            args.animal, outcome.sale.buyer, outcome.sale.price, outcome.sale.date
        ));
        if outcome.closed_stay.is_none() {
            println!("  (animal had no current field)");
        }
    }

    Ok(())
}

pub fn sales(output: &Output, owner: Option<&str>, args: SaleListArgs) -> Result<()> {
    let session = Session::open(owner)?;
    let filter = SaleFilter {
        buyer: args.buyer,
        dates: DateRange::new(args.from, args.to),
    };
    let sales = session.reader().sales(&session.owner, &filter)?;

    if output.is_json() {
        output.data(&sales);
    } else if sales.is_empty() {
        output.empty("sales");
    } else {
        println!("{:<12} {:<12} {:<24} {:>12} DESTINATION", "DATE", "ANIMAL", "BUYER", "PRICE");
        println!("{}", "-".repeat(80));
        for s in &sales {
            println!(
                "{:<12} {:<12} {:<24} {:>12} {}",
                s.date.to_string(),
                s.animal,
                s.buyer,
                s.price.to_string(),
                s.destination
            );
        }
        println!();
        match sales.iter().try_fold(Decimal::ZERO, |total, s| total.checked_add(s.price)) {
            Some(total) => println!("{} sale(s), total ${}", sales.len(), total),
            None => println!("{} sale(s)", sales.len()),
        }
    }

    Ok(())
}

pub fn vaccinate(output: &Output, owner: Option<&str>, args: VaccinateArgs) -> Result<()> {
    let mut session = Session::open(owner)?;
    let animal = session.animal_id(&args.animal)?;
    let vaccine = session.vaccine_id(&args.vaccine)?;

    let vaccination = NewVaccination {
        vaccine,
        date: args.date.unwrap_or_else(today),
        dose: args.dose,
        notes: args.notes,
    };

    let owner = session.owner.clone();
    let recorded = session.lifecycle().vaccinate(&owner, &animal, &vaccination)?;

    if output.is_json() {
        output.data(&recorded);
    } else {
        output.success(&format!(
            "Vaccinated {} with {} on {}",
            args.animal, args.vaccine, recorded.date
        ));
    }

    Ok(())
}

pub fn vaccinations(output: &Output, owner: Option<&str>, args: VaccinationListArgs) -> Result<()> {
    let session = Session::open(owner)?;
    let filter = VaccinationFilter {
        animal: args.animal.map(|a| session.animal_id(&a)).transpose()?,
        dates: DateRange::new(args.from, args.to),
    };
    let reader = session.reader();
    let vaccinations = reader.vaccinations(&session.owner, &filter)?;

    if output.is_json() {
        output.data(&vaccinations);
    } else if vaccinations.is_empty() {
        output.empty("vaccinations");
    } else {
        let names: HashMap<_, _> = reader
            .vaccines(&session.owner)?
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect();

        println!("{:<12} {:<12} {:<24} DOSE", "DATE", "ANIMAL", "VACCINE");
        println!("{}", "-".repeat(60));
        for v in &vaccinations {
            println!(
                "{:<12} {:<12} {:<24} {}",
                v.date.to_string(),
                v.animal,
                names.get(&v.vaccine).map(String::as_str).unwrap_or("?"),
                v.dose
            );
        }
    }

    Ok(())
}

pub fn status(output: &Output, owner: Option<&str>, args: StatusArgs) -> Result<()> {
    let mut session = Session::open(owner)?;
    let animal = session.animal_id(&args.animal)?;

    let status = NewStatus {
        productive_cycle: args.cycle,
        health: args.health,
        general_status: args.general,
        notes: args.notes,
        recorded_at: None,
    };

    let owner = session.owner.clone();
    let snapshot = session.lifecycle().record_status(&owner, &animal, &status)?;

    if output.is_json() {
        output.data(&snapshot);
    } else {
        output.success(&format!(
            "Recorded status for {}: cycle={} health={} general={}",
            args.animal,
            or_dash(snapshot.productive_cycle),
            or_dash(snapshot.health),
            or_dash(snapshot.general_status)
        ));
    }

    Ok(())
}

/// Field names by ID for display
fn field_names(session: &Session) -> Result<HashMap<FieldId, String>> {
    Ok(session
        .reader()
        .fields(&session.owner)?
        .into_iter()
        .map(|f| (f.id, f.name))
        .collect())
}

fn name_of(names: &HashMap<FieldId, String>, id: &FieldId) -> String {
    names.get(id).cloned().unwrap_or_else(|| id.to_string())
}
