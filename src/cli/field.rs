//! Field CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::{or_dash, Output};
use super::session::Session;
use crate::domain::{Field, FieldUpdate, NewField};
use crate::storage::AnimalFilter;

#[derive(Subcommand)]
pub enum FieldCommands {
    /// Register a field
    Add {
        /// Field name (unique per owner)
        name: String,

        /// Area in hectares
        #[arg(long)]
        area: Option<f64>,

        #[arg(long, default_value = "")]
        location: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List fields
    List,

    /// Show a field with its occupancy and current occupants
    Show {
        /// Field ID or name
        field: String,
    },

    /// Change a field's area, location or description
    Update {
        /// Field ID or name
        field: String,

        #[arg(long)]
        area: Option<f64>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },
}

pub fn run(cmd: FieldCommands, output: &Output, owner: Option<&str>) -> Result<()> {
    let mut session = Session::open(owner)?;

    match cmd {
        FieldCommands::Add { name, area, location, description } => {
            let new = NewField {
                name,
                area,
                location,
                description,
            };
            let owner = session.owner.clone();
            let field = session.lifecycle().create_field(&owner, &new)?;

            if output.is_json() {
                output.data(&field);
            } else {
                output.success(&format!("Created field: {} - {}", field.id, field.name));
            }
        }

        FieldCommands::List => list_fields(output, &session)?,
        FieldCommands::Show { field } => show_field(output, &session, &field)?,

        FieldCommands::Update { field, area, location, description } => {
            let id = session.field_id(&field)?;
            let update = FieldUpdate {
                area,
                location,
                description,
            };
            let owner = session.owner.clone();
            let field = session.lifecycle().update_field(&owner, &id, &update)?;

            if output.is_json() {
                output.data(&field);
            } else {
                output.success(&format!("Updated field: {} - {}", field.id, field.name));
            }
        }
    }

    Ok(())
}

fn list_fields(output: &Output, session: &Session) -> Result<()> {
    let reader = session.reader();
    let occupancy = reader.occupancy_by_field(&session.owner)?;

    if output.is_json() {
        let fields = reader.fields(&session.owner)?;
        let items: Vec<_> = fields
            .iter()
            .zip(&occupancy)
            .map(|(field, occ)| {
                serde_json::json!({
                    "id": field.id.to_string(),
                    "name": field.name,
                    "area": field.area,
                    "location": field.location,
                    "animals": occ.count,
                    "density": occ.density,
                    "occupancy": occ.level,
                })
            })
            .collect();
        output.data(&items);
    } else if occupancy.is_empty() {
        output.empty("fields");
    } else {
        println!("{:<12} {:<20} {:>8} {:>8} {:>9} LEVEL", "ID", "NAME", "AREA", "ANIMALS", "DENSITY");
        println!("{}", "-".repeat(70));
        for occ in &occupancy {
            println!(
                "{:<12} {:<20} {:>8} {:>8} {:>9.2} {}",
                occ.field,
                occ.name,
                or_dash(occ.area),
                occ.count,
                occ.density,
                occ.level
            );
        }
    }

    Ok(())
}

fn show_field(output: &Output, session: &Session, reference: &str) -> Result<()> {
    let id = session.field_id(reference)?;
    let reader = session.reader();
    let field = reader.field(&session.owner, &id)?;
    let occupancy = reader.field_occupancy(&session.owner, &id)?;
    let filter = AnimalFilter {
        field: Some(id),
        ..AnimalFilter::default()
    };
    let animals = reader.animals(&session.owner, &filter)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "field": field,
            "occupancy": occupancy,
            "animals": animals,
        }));
        return Ok(());
    }

    print_field(&field);
    println!(
        "Occupancy:   {} animal(s), {:.2}/ha ({}, {:.1}% of recommended)",
        occupancy.count, occupancy.density, occupancy.level, occupancy.percent_of_recommended
    );

    if !animals.is_empty() {
        println!();
        println!("Animals:");
        for animal in &animals {
            println!("  {} {} ({}, {})", animal.id, animal.tag, animal.breed, animal.sex);
        }
    }

    Ok(())
}

fn print_field(field: &Field) {
    println!("Field: {}", field.id);
    println!("Name:        {}", field.name);
    println!("Area:        {}", or_dash(field.area.map(|a| format!("{} ha", a))));
    if !field.location.is_empty() {
        println!("Location:    {}", field.location);
    }
    if !field.description.is_empty() {
        println!("Description: {}", field.description);
    }
    println!("Created:     {}", field.created_at.format("%Y-%m-%d %H:%M"));
}
