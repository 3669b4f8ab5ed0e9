//! Animal CLI commands

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use tracing::warn;

use super::output::{or_dash, Output};
use super::session::{today, Session};
use crate::domain::{AnimalUpdate, NewAnimal, Sex};
use crate::engine::Placement;
use crate::storage::AnimalFilter;

/// Registration data shared by `intake` and `add`
#[derive(Args)]
pub struct AnimalArgs {
    /// Ear tag (unique per owner)
    tag: String,

    #[arg(long)]
    breed: String,

    /// male / female (or m / f)
    #[arg(long)]
    sex: Sex,

    /// Birth date
    #[arg(long)]
    birth: Option<NaiveDate>,

    /// Intake date (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long, default_value = "")]
    notes: String,
}

impl AnimalArgs {
    fn into_new(self) -> NewAnimal {
        NewAnimal {
            tag: self.tag,
            breed: self.breed,
            sex: self.sex,
            birth_date: self.birth,
            intake_date: self.date.unwrap_or_else(today),
            notes: self.notes,
        }
    }
}

#[derive(Subcommand)]
pub enum AnimalCommands {
    /// Register an animal, place it in a field and stamp its initial status
    Intake {
        #[command(flatten)]
        animal: AnimalArgs,

        /// Initial field ID or name
        #[arg(long)]
        field: Option<String>,
    },

    /// Register an animal without location or status
    Add {
        #[command(flatten)]
        animal: AnimalArgs,
    },

    /// List animals
    List {
        /// Only animals currently in this field (ID or name)
        #[arg(long)]
        field: Option<String>,

        /// Breed contains (case-insensitive)
        #[arg(long)]
        breed: Option<String>,
    },

    /// Show an animal with its current state
    Show {
        /// Animal ID or tag
        animal: String,
    },

    /// Change an animal's breed, birth date or notes
    Update {
        /// Animal ID or tag
        animal: String,

        #[arg(long)]
        breed: Option<String>,

        #[arg(long)]
        birth: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Show an animal's stays and status snapshots
    History {
        /// Animal ID or tag
        animal: String,
    },
}

pub fn run(cmd: AnimalCommands, output: &Output, owner: Option<&str>) -> Result<()> {
    let mut session = Session::open(owner)?;

    match cmd {
        AnimalCommands::Intake { animal, field } => {
            // An unknown field name is reported like an unknown field ID
            let (field, unresolved) = match field {
                Some(reference) => match session.find_field(&reference)? {
                    Some(id) => (Some(id), None),
                    None => {
                        let reason = format!("No field named '{}'", reference.trim());
                        warn!("{}; animal will have no location", reason);
                        (None, Some(reason))
                    }
                },
                None => (None, None),
            };

            let owner = session.owner.clone();
            let mut intake = session
                .lifecycle()
                .intake(&owner, &animal.into_new(), field.as_ref())?;
            if let Some(reason) = unresolved {
                intake.placement = Placement::Skipped { reason };
            }

            if output.is_json() {
                output.data(&intake);
            } else {
                output.success(&format!("Intake: {} - {}", intake.animal.id, intake.animal.tag));
                match &intake.placement {
                    Placement::Placed { stay } => println!("  in field {} since {}", stay.field, stay.entry_date),
                    Placement::Unplaced => println!("  no field assigned"),
                    Placement::Skipped { reason } => println!("  not placed: {}", reason),
                }
            }
        }

        AnimalCommands::Add { animal } => {
            let owner = session.owner.clone();
            let animal = session.lifecycle().create_animal(&owner, &animal.into_new())?;

            if output.is_json() {
                output.data(&animal);
            } else {
                output.success(&format!("Created animal: {} - {}", animal.id, animal.tag));
            }
        }

        AnimalCommands::List { field, breed } => {
            let filter = AnimalFilter {
                field: field.map(|f| session.field_id(&f)).transpose()?,
                breed,
            };
            list_animals(output, &session, &filter)?
        }

        AnimalCommands::Show { animal } => show_animal(output, &session, &animal)?,

        AnimalCommands::Update { animal, breed, birth, notes } => {
            let id = session.animal_id(&animal)?;
            let update = AnimalUpdate {
                breed,
                birth_date: birth,
                notes,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update: pass --breed, --birth or --notes");
            }

            let owner = session.owner.clone();
            let animal = session.lifecycle().update_animal(&owner, &id, &update)?;

            if output.is_json() {
                output.data(&animal);
            } else {
                output.success(&format!("Updated animal: {} - {}", animal.id, animal.tag));
            }
        }

        AnimalCommands::History { animal } => history(output, &session, &animal)?,
    }

    Ok(())
}

fn list_animals(output: &Output, session: &Session, filter: &AnimalFilter) -> Result<()> {
    let reader = session.reader();
    let animals = reader.animals(&session.owner, filter)?;

    if output.is_json() {
        output.data(&animals);
        return Ok(());
    }

    if animals.is_empty() {
        output.empty("animals");
        return Ok(());
    }

    println!("{:<12} {:<10} {:<16} {:<7} {:<12} {:<16} STATUS", "ID", "TAG", "BREED", "SEX", "INTAKE", "FIELD");
    println!("{}", "-".repeat(90));
    for animal in &animals {
        let state = reader.current_state(&session.owner, &animal.id)?;
        println!(
            "{:<12} {:<10} {:<16} {:<7} {:<12} {:<16} {}",
            animal.id,
            animal.tag,
            animal.breed,
            animal.sex,
            animal.intake_date.to_string(),
            or_dash(state.field_name),
            or_dash(state.general_status)
        );
    }
    println!();
    println!("{} animal(s)", animals.len());

    Ok(())
}

fn show_animal(output: &Output, session: &Session, reference: &str) -> Result<()> {
    let id = session.animal_id(reference)?;
    let reader = session.reader();
    let animal = reader.animal(&session.owner, &id)?;
    let state = reader.current_state(&session.owner, &id)?;
    let pending = reader.pending_vaccines(&session.owner, &id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "animal": animal,
            "state": state,
            "pending_vaccines": pending,
        }));
        return Ok(());
    }

    println!("Animal: {}", animal.id);
    println!("Tag:       {}", animal.tag);
    println!("Breed:     {}", animal.breed);
    println!("Sex:       {}", animal.sex);
    println!("Born:      {}", or_dash(animal.birth_date));
    if let Some(days) = animal.age_in_days(today()) {
        println!("Age:       {} days", days);
    }
    println!("Intake:    {}", animal.intake_date);
    match (&state.field_name, state.since) {
        (Some(name), Some(since)) => println!("Field:     {} (since {})", name, since),
        _ => println!("Field:     -"),
    }
    println!("Status:    {}", or_dash(state.general_status));
    println!("Cycle:     {}", or_dash(state.productive_cycle));
    println!("Health:    {}", or_dash(state.health));
    if !animal.notes.is_empty() {
        println!("Notes:     {}", animal.notes);
    }

    if !pending.is_empty() {
        let names: Vec<_> = pending.iter().map(|v| v.name.as_str()).collect();
        println!();
        println!("Pending vaccines: {}", names.join(", "));
    }

    Ok(())
}

fn history(output: &Output, session: &Session, reference: &str) -> Result<()> {
    let id = session.animal_id(reference)?;
    let reader = session.reader();
    let stays = reader.stay_history(&session.owner, &id)?;
    let snapshots = reader.status_history(&session.owner, &id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "stays": stays,
            "status": snapshots,
        }));
        return Ok(());
    }

    println!("Stays:");
    if stays.is_empty() {
        println!("  (none)");
    }
    for stay in &stays {
        let field = reader.field(&session.owner, &stay.field)?;
        println!(
            "  {:<20} {} -> {} ({} days)",
            field.name,
            stay.entry_date,
            or_dash(stay.exit_date),
            stay.days(today())
        );
    }

    println!();
    println!("Status:");
    for snapshot in &snapshots {
        println!(
            "  {}  cycle={} health={} general={} {}",
            snapshot.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            or_dash(snapshot.productive_cycle),
            or_dash(snapshot.health),
            or_dash(snapshot.general_status),
            snapshot.notes
        );
    }

    Ok(())
}
