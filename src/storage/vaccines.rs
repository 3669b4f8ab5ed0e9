//! Vaccine catalogue

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::db::{parsed, unused_id};
use super::StoreError;
use crate::domain::{AnimalId, NewVaccine, OwnerId, Vaccine, VaccineId};

const COLUMNS: &str = "v.id, v.owner, v.name, v.laboratory, v.description";

pub struct VaccineRegistry<'c> {
    conn: &'c Connection,
}

impl<'c> VaccineRegistry<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Vaccine> {
        Ok(Vaccine {
            id: parsed(row, 0)?,
            owner: parsed(row, 1)?,
            name: row.get(2)?,
            laboratory: row.get(3)?,
            description: row.get(4)?,
        })
    }

    pub(crate) fn create(
        &self,
        owner: &OwnerId,
        new: &NewVaccine,
        now: DateTime<Utc>,
    ) -> Result<Vaccine, StoreError> {
        let name = new.name.trim();

        let exists: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM vaccines WHERE owner = ?1 AND name = ?2)",
            params![owner.as_str(), name],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::DuplicateName {
                kind: "vaccine",
                name: name.to_string(),
            });
        }

        let id = unused_id(
            "vaccine",
            |salt| VaccineId::salted(owner, name, now, salt),
            |id| Ok(self.find(id)?.is_some()),
        )?;

        let vaccine = Vaccine {
            id,
            owner: owner.clone(),
            name: name.to_string(),
            laboratory: new.laboratory.clone(),
            description: new.description.clone(),
        };

        self.conn.execute(
            "INSERT INTO vaccines (id, owner, name, laboratory, description) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                vaccine.id.to_string(),
                vaccine.owner.as_str(),
                vaccine.name,
                vaccine.laboratory,
                vaccine.description,
            ],
        )?;

        Ok(vaccine)
    }

    pub fn find(&self, id: &VaccineId) -> Result<Option<Vaccine>, StoreError> {
        let vaccine = self
            .conn
            .query_row(
                &format!("SELECT {} FROM vaccines v WHERE v.id = ?1", COLUMNS),
                params![id.to_string()],
                Self::from_row,
            )
            .optional()?;

        Ok(vaccine)
    }

    pub fn get(&self, id: &VaccineId) -> Result<Vaccine, StoreError> {
        self.find(id)?
            .ok_or_else(|| StoreError::not_found("vaccine", id))
    }

    pub fn list(&self, owner: &OwnerId) -> Result<Vec<Vaccine>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM vaccines v WHERE v.owner = ?1 ORDER BY v.rowid",
            COLUMNS
        ))?;

        let vaccines = stmt
            .query_map(params![owner.as_str()], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vaccines)
    }

    /// Owner's vaccines the animal has never received
    pub fn pending_for(&self, owner: &OwnerId, animal: &AnimalId) -> Result<Vec<Vaccine>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM vaccines v
             WHERE v.owner = ?1
             AND NOT EXISTS (
                 SELECT 1 FROM vaccinations x WHERE x.vaccine_id = v.id AND x.animal_id = ?2
             )
             ORDER BY v.rowid",
            COLUMNS
        ))?;

        let vaccines = stmt
            .query_map(params![owner.as_str(), animal.to_string()], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vaccines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn create_list_and_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let registry = VaccineRegistry::new(&tx);
        let owner = OwnerId::new("me").unwrap();

        let aftosa = NewVaccine {
            name: "Aftosa".to_string(),
            laboratory: "Biogenesis Bago".to_string(),
            ..NewVaccine::default()
        };
        let created = registry.create(&owner, &aftosa, Utc::now()).unwrap();

        assert_eq!(registry.get(&created.id).unwrap().laboratory, "Biogenesis Bago");
        assert_eq!(registry.list(&owner).unwrap().len(), 1);
        assert!(matches!(
            registry.create(&owner, &aftosa, Utc::now()),
            Err(StoreError::DuplicateName { kind: "vaccine", .. })
        ));
    }
}
