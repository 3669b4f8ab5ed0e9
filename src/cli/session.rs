//! Per-invocation context: project, resolved owner and open database

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::domain::{AnimalId, FieldId, OwnerId, VaccineId};
use crate::engine::{self, EngineError, Lifecycle, Settings};
use crate::report::Reader;
use crate::storage::{Database, Project};

pub struct Session {
    pub project: Project,
    pub owner: OwnerId,
    db: Database,
}

impl Session {
    /// Opens the current project and resolves the owner
    pub fn open(owner: Option<&str>) -> Result<Self> {
        let project = Project::open_current()?;
        let owner = project.config().effective_owner(owner)?;
        let db = project.database()?;

        debug!(owner = %owner, root = %project.root().display(), "session opened");
        Ok(Self { project, owner, db })
    }

    pub fn lifecycle(&mut self) -> Lifecycle<'_> {
        let settings = Settings {
            default_cycle: self.project.config().project.default_cycle,
        };
        Lifecycle::new(&mut self.db).with_settings(settings)
    }

    pub fn reader(&self) -> Reader<'_> {
        Reader::new(&self.db).with_occupancy(self.project.config().project.occupancy)
    }

    /// Accepts an animal ID or a tag
    pub fn animal_id(&self, reference: &str) -> Result<AnimalId> {
        self.find_animal(reference)?
            .ok_or_else(|| anyhow!("No animal tagged '{}'", reference.trim()))
    }

    /// Accepts a field ID or a name
    pub fn field_id(&self, reference: &str) -> Result<FieldId> {
        self.find_field(reference)?
            .ok_or_else(|| anyhow!("No field named '{}'", reference.trim()))
    }

    /// Accepts a vaccine ID or a name (case-insensitive)
    pub fn vaccine_id(&self, reference: &str) -> Result<VaccineId> {
        self.find_vaccine(reference)?
            .ok_or_else(|| anyhow!("No vaccine named '{}'", reference.trim()))
    }

    pub fn find_animal(&self, reference: &str) -> Result<Option<AnimalId>> {
        let reader = self.reader();
        resolve(
            reference.parse().ok(),
            |id| reader.animal(&self.owner, id),
            || Ok(reader.animal_tagged(&self.owner, reference)?.map(|animal| animal.id)),
        )
    }

    pub fn find_field(&self, reference: &str) -> Result<Option<FieldId>> {
        let reader = self.reader();
        resolve(
            reference.parse().ok(),
            |id| reader.field(&self.owner, id),
            || Ok(reader.field_named(&self.owner, reference)?.map(|field| field.id)),
        )
    }

    pub fn find_vaccine(&self, reference: &str) -> Result<Option<VaccineId>> {
        let reader = self.reader();
        let wanted = reference.trim().to_lowercase();
        resolve(
            reference.parse().ok(),
            |id| reader.vaccine(&self.owner, id),
            || {
                Ok(reader
                    .vaccines(&self.owner)?
                    .into_iter()
                    .find(|vaccine| vaccine.name.to_lowercase() == wanted)
                    .map(|vaccine| vaccine.id))
            },
        )
    }
}

/// Resolves a reference that may be an ID or a tag/name
///
/// An ID-shaped reference that matches no row falls back to the tag/name
/// lookup. If that finds nothing either, the parsed ID is returned so the
/// command reports it as not found. Another owner's ID is returned as is and
/// rejected by the engine.
fn resolve<T, E>(
    parsed: Option<T>,
    by_id: impl FnOnce(&T) -> engine::Result<E>,
    by_name: impl FnOnce() -> Result<Option<T>>,
) -> Result<Option<T>> {
    if let Some(id) = parsed.as_ref() {
        match by_id(id) {
            Ok(_) | Err(EngineError::CrossTenant { .. }) => return Ok(parsed),
            Err(EngineError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }

    Ok(by_name()?.or(parsed))
}

/// The local calendar day
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
