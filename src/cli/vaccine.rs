//! Vaccine catalogue CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::session::Session;
use crate::domain::NewVaccine;

#[derive(Subcommand)]
pub enum VaccineCommands {
    /// Add a vaccine to the catalogue
    Add {
        /// Vaccine name (unique per owner)
        name: String,

        #[arg(long, default_value = "")]
        laboratory: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List the catalogue
    List,
}

pub fn run(cmd: VaccineCommands, output: &Output, owner: Option<&str>) -> Result<()> {
    let mut session = Session::open(owner)?;

    match cmd {
        VaccineCommands::Add { name, laboratory, description } => {
            let new = NewVaccine {
                name,
                laboratory,
                description,
            };
            let owner = session.owner.clone();
            let vaccine = session.lifecycle().create_vaccine(&owner, &new)?;

            if output.is_json() {
                output.data(&vaccine);
            } else {
                output.success(&format!("Created vaccine: {} - {}", vaccine.id, vaccine.name));
            }
        }

        VaccineCommands::List => {
            let vaccines = session.reader().vaccines(&session.owner)?;

            if output.is_json() {
                output.data(&vaccines);
            } else if vaccines.is_empty() {
                output.empty("vaccines");
            } else {
                println!("{:<12} {:<24} LABORATORY", "ID", "NAME");
                println!("{}", "-".repeat(60));
                for vaccine in &vaccines {
                    println!("{:<12} {:<24} {}", vaccine.id, vaccine.name, vaccine.laboratory);
                }
            }
        }
    }

    Ok(())
}
