//! Read-only report commands: state, occupancy, dashboard

use anyhow::Result;
use chrono::NaiveDate;

use super::output::{or_dash, Output};
use super::session::{today, Session};
use crate::report::FieldOccupancy;

pub fn state(output: &Output, owner: Option<&str>, animal: &str) -> Result<()> {
    let session = Session::open(owner)?;
    let id = session.animal_id(animal)?;
    let state = session.reader().current_state(&session.owner, &id)?;

    if output.is_json() {
        output.data(&state);
        return Ok(());
    }

    println!("{} ({})", state.tag, state.animal);
    match (&state.field_name, state.since) {
        (Some(name), Some(since)) => println!("  field:   {} since {}", name, since),
        _ => println!("  field:   -"),
    }
    println!("  status:  {}", or_dash(state.general_status));
    println!("  cycle:   {}", or_dash(state.productive_cycle));
    println!("  health:  {}", or_dash(state.health));

    Ok(())
}

pub fn occupancy(output: &Output, owner: Option<&str>, field: Option<&str>) -> Result<()> {
    let session = Session::open(owner)?;
    let reader = session.reader();

    let rows = match field {
        Some(reference) => {
            let id = session.field_id(reference)?;
            vec![reader.field_occupancy(&session.owner, &id)?]
        }
        None => reader.occupancy_by_field(&session.owner)?,
    };

    if output.is_json() {
        if field.is_some() {
            if let Some(row) = rows.first() {
                output.data(row);
            }
        } else {
            output.data(&rows);
        }
    } else if rows.is_empty() {
        output.empty("fields");
    } else {
        print_occupancy(&rows);
    }

    Ok(())
}

pub fn dashboard(output: &Output, owner: Option<&str>, date: Option<NaiveDate>) -> Result<()> {
    let session = Session::open(owner)?;
    let dashboard = session
        .reader()
        .dashboard(&session.owner, date.unwrap_or_else(today))?;

    if output.is_json() {
        output.data(&dashboard);
        return Ok(());
    }

    println!("Dashboard for {} (month from {})", dashboard.today, dashboard.month_start);
    println!();
    println!("Fields:                {}", dashboard.fields);
    println!("Animals:               {}", dashboard.animals);
    println!("Animals sold:          {}", dashboard.animals_sold);
    println!("Avg animals per field: {:.1}", dashboard.avg_animals_per_field);
    println!();
    println!("This month:");
    println!("  sales:        ${}", dashboard.sales_this_month);
    println!("  transfers:    {}", dashboard.transfers_this_month);
    println!("  vaccinations: {}", dashboard.vaccinations_this_month);

    if !dashboard.cycles.is_empty() {
        println!();
        println!("By productive cycle:");
        for (cycle, count) in &dashboard.cycles {
            println!("  {:<12} {}", cycle, count);
        }
    }

    if !dashboard.occupancy.is_empty() {
        println!();
        print_occupancy(&dashboard.occupancy);
    }

    Ok(())
}

fn print_occupancy(rows: &[FieldOccupancy]) {
    println!("{:<20} {:>8} {:>8} {:>9} {:>7} LEVEL", "FIELD", "AREA", "ANIMALS", "DENSITY", "% REC");
    println!("{}", "-".repeat(68));
    for row in rows {
        println!(
            "{:<20} {:>8} {:>8} {:>9.2} {:>7.1} {}",
            row.name,
            or_dash(row.area),
            row.count,
            row.density,
            row.percent_of_recommended,
            row.level
        );
    }
}
