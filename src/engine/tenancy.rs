//! Owner checks shared by the engine and the reader

use rusqlite::Connection;

use super::error::{EngineError, Result};
use crate::domain::{Animal, AnimalId, Field, FieldId, OwnerId, Vaccine, VaccineId};
use crate::storage::{AnimalRegistry, FieldRegistry, VaccineRegistry};

/// An entity scoped to a single owner
pub trait Owned {
    const KIND: &'static str;

    fn owner(&self) -> &OwnerId;

    fn id_text(&self) -> String;
}

impl Owned for Field {
    const KIND: &'static str = "field";

    fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn id_text(&self) -> String {
        self.id.to_string()
    }
}

impl Owned for Animal {
    const KIND: &'static str = "animal";

    fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn id_text(&self) -> String {
        self.id.to_string()
    }
}

impl Owned for Vaccine {
    const KIND: &'static str = "vaccine";

    fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn id_text(&self) -> String {
        self.id.to_string()
    }
}

/// Passes `entity` through if `owner` owns it
pub fn ensure_owner<T: Owned>(entity: T, owner: &OwnerId) -> Result<T> {
    if entity.owner() == owner {
        Ok(entity)
    } else {
        Err(EngineError::CrossTenant {
            kind: T::KIND,
            id: entity.id_text(),
        })
    }
}

pub(crate) fn owned_field(conn: &Connection, owner: &OwnerId, id: &FieldId) -> Result<Field> {
    ensure_owner(FieldRegistry::new(conn).get(id)?, owner)
}

pub(crate) fn owned_animal(conn: &Connection, owner: &OwnerId, id: &AnimalId) -> Result<Animal> {
    ensure_owner(AnimalRegistry::new(conn).get(id)?, owner)
}

pub(crate) fn owned_vaccine(conn: &Connection, owner: &OwnerId, id: &VaccineId) -> Result<Vaccine> {
    ensure_owner(VaccineRegistry::new(conn).get(id)?, owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewField;
    use crate::storage::Database;
    use chrono::Utc;

    #[test]
    fn other_owner_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let me = OwnerId::new("me").unwrap();
        let you = OwnerId::new("you").unwrap();

        let field = FieldRegistry::new(&tx)
            .create(&me, &NewField::new("North"), Utc::now())
            .unwrap();

        assert!(owned_field(&tx, &me, &field.id).is_ok());
        assert!(matches!(
            owned_field(&tx, &you, &field.id),
            Err(EngineError::CrossTenant { kind: "field", .. })
        ));
    }

    #[test]
    fn missing_entity_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let me = OwnerId::new("me").unwrap();
        let id: AnimalId = "a-0000000".parse().unwrap();

        assert!(matches!(
            owned_animal(&tx, &me, &id),
            Err(EngineError::NotFound { kind: "animal", .. })
        ));
    }
}
