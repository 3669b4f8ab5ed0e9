//! Animal registry

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::db::{date_text, parsed, parsed_opt, timestamp_text, unused_id};
use super::StoreError;
use crate::domain::{Animal, AnimalId, AnimalUpdate, FieldId, NewAnimal, OwnerId};

const COLUMNS: &str = "a.id, a.owner, a.tag, a.breed, a.sex, a.birth_date, a.intake_date, a.notes, a.created_at";

/// Optional filters for listing animals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimalFilter {
    /// Only animals currently in this field (open stay)
    pub field: Option<FieldId>,
    /// Case-insensitive substring of the breed
    pub breed: Option<String>,
}

/// Animal definitions, scoped by owner
pub struct AnimalRegistry<'c> {
    conn: &'c Connection,
}

impl<'c> AnimalRegistry<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Animal> {
        Ok(Animal {
            id: parsed(row, 0)?,
            owner: parsed(row, 1)?,
            tag: row.get(2)?,
            breed: row.get(3)?,
            sex: parsed(row, 4)?,
            birth_date: parsed_opt(row, 5)?,
            intake_date: parsed(row, 6)?,
            notes: row.get(7)?,
            created_at: parsed(row, 8)?,
        })
    }

    /// Registers an animal; tags are unique per owner
    pub(crate) fn create(
        &self,
        owner: &OwnerId,
        new: &NewAnimal,
        now: DateTime<Utc>,
    ) -> Result<Animal, StoreError> {
        let tag = new.tag.trim();

        if self.find_by_tag(owner, tag)?.is_some() {
            return Err(StoreError::DuplicateTag(tag.to_string()));
        }

        let id = unused_id(
            "animal",
            |salt| AnimalId::salted(owner, tag, now, salt),
            |id| Ok(self.find(id)?.is_some()),
        )?;

        let animal = Animal {
            id,
            owner: owner.clone(),
            tag: tag.to_string(),
            breed: new.breed.trim().to_string(),
            sex: new.sex,
            birth_date: new.birth_date,
            intake_date: new.intake_date,
            notes: new.notes.clone(),
            created_at: now,
        };

        self.conn.execute(
            "INSERT INTO animals (id, owner, tag, breed, sex, birth_date, intake_date, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                animal.id.to_string(),
                animal.owner.as_str(),
                animal.tag,
                animal.breed,
                animal.sex.as_str(),
                animal.birth_date.map(date_text),
                date_text(animal.intake_date),
                animal.notes,
                timestamp_text(animal.created_at),
            ],
        )?;

        Ok(animal)
    }

    /// Updates descriptive fields only; status and location live elsewhere
    pub(crate) fn update(&self, id: &AnimalId, update: &AnimalUpdate) -> Result<Animal, StoreError> {
        let mut animal = self.get(id)?;
        animal.apply(update);

        self.conn.execute(
            "UPDATE animals SET breed = ?2, birth_date = ?3, notes = ?4 WHERE id = ?1",
            params![
                id.to_string(),
                animal.breed,
                animal.birth_date.map(date_text),
                animal.notes,
            ],
        )?;

        Ok(animal)
    }

    pub fn find(&self, id: &AnimalId) -> Result<Option<Animal>, StoreError> {
        let animal = self
            .conn
            .query_row(
                &format!("SELECT {} FROM animals a WHERE a.id = ?1", COLUMNS),
                params![id.to_string()],
                Self::from_row,
            )
            .optional()?;

        Ok(animal)
    }

    pub fn get(&self, id: &AnimalId) -> Result<Animal, StoreError> {
        self.find(id)?
            .ok_or_else(|| StoreError::not_found("animal", id))
    }

    pub fn find_by_tag(&self, owner: &OwnerId, tag: &str) -> Result<Option<Animal>, StoreError> {
        let animal = self
            .conn
            .query_row(
                &format!("SELECT {} FROM animals a WHERE a.owner = ?1 AND a.tag = ?2", COLUMNS),
                params![owner.as_str(), tag],
                Self::from_row,
            )
            .optional()?;

        Ok(animal)
    }

    /// Lists an owner's animals in insertion order
    pub fn list(&self, owner: &OwnerId, filter: &AnimalFilter) -> Result<Vec<Animal>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM animals a
             WHERE a.owner = ?1
             AND (?2 IS NULL OR EXISTS (
                 SELECT 1 FROM stays s
                 WHERE s.animal_id = a.id AND s.field_id = ?2 AND s.exit_date IS NULL
             ))
             ORDER BY a.rowid",
            COLUMNS
        ))?;

        let field = filter.field.as_ref().map(|f| f.to_string());
        let animals = stmt
            .query_map(params![owner.as_str(), field], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let animals = match &filter.breed {
            Some(breed) => {
                let needle = breed.to_lowercase();
                animals
                    .into_iter()
                    .filter(|a| a.breed.to_lowercase().contains(&needle))
                    .collect()
            }
            None => animals,
        };

        Ok(animals)
    }

    /// Number of animals an owner has registered
    pub fn count(&self, owner: &OwnerId) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM animals WHERE owner = ?1",
            params![owner.as_str()],
            |row| row.get(0),
        )?;

        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sex;
    use crate::storage::Database;
    use chrono::NaiveDate;

    fn owner() -> OwnerId {
        OwnerId::new("me").unwrap()
    }

    fn new_animal(tag: &str, breed: &str) -> NewAnimal {
        NewAnimal::new(tag, breed, Sex::Male, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn create_and_get() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let registry = AnimalRegistry::new(&tx);

        let born = NaiveDate::from_ymd_opt(2023, 5, 2).unwrap();
        let animal = registry
            .create(&owner(), &new_animal("A1", "Hereford").born(born), Utc::now())
            .unwrap();
        let loaded = registry.get(&animal.id).unwrap();

        assert_eq!(loaded.tag, "A1");
        assert_eq!(loaded.birth_date, Some(born));
        assert_eq!(loaded.sex, Sex::Male);
    }

    #[test]
    fn duplicate_tag() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let registry = AnimalRegistry::new(&tx);

        registry.create(&owner(), &new_animal("A1", "Angus"), Utc::now()).unwrap();
        let dup = registry.create(&owner(), &new_animal("A1", "Angus"), Utc::now());

        assert!(matches!(dup, Err(StoreError::DuplicateTag(tag)) if tag == "A1"));
    }

    #[test]
    fn clashing_id_is_re_derived() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let registry = AnimalRegistry::new(&tx);
        let now = Utc::now();

        let first = registry.create(&owner(), &new_animal("A1", "Angus"), now).unwrap();
        assert_eq!(first.id, AnimalId::new(&owner(), "A1", now));

        // Free the tag but keep the row, so the same derivation hits a taken ID
        tx.execute("UPDATE animals SET tag = 'Z9' WHERE id = ?1", [first.id.to_string()])
            .unwrap();

        let second = registry.create(&owner(), &new_animal("A1", "Angus"), now).unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.id, AnimalId::salted(&owner(), "A1", now, 1));
        assert_eq!(registry.get(&first.id).unwrap().tag, "Z9");
        assert_eq!(registry.get(&second.id).unwrap().tag, "A1");
    }

    #[test]
    fn breed_filter_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let registry = AnimalRegistry::new(&tx);

        registry.create(&owner(), &new_animal("A1", "Aberdeen Angus"), Utc::now()).unwrap();
        registry.create(&owner(), &new_animal("A2", "Hereford"), Utc::now()).unwrap();

        let filter = AnimalFilter {
            breed: Some("angus".to_string()),
            ..AnimalFilter::default()
        };
        let found = registry.list(&owner(), &filter).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag, "A1");
        assert_eq!(registry.count(&owner()).unwrap(), 2);
    }

    #[test]
    fn update_keeps_tag() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let registry = AnimalRegistry::new(&tx);

        let animal = registry.create(&owner(), &new_animal("A1", "Angus"), Utc::now()).unwrap();
        let updated = registry
            .update(
                &animal.id,
                &AnimalUpdate {
                    breed: Some("Brangus".to_string()),
                    ..AnimalUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.breed, "Brangus");
        assert_eq!(registry.get(&animal.id).unwrap().tag, "A1");
    }
}
