//! Stay ledger: field occupancy intervals per animal
//!
//! The ledger is a plain store. Keeping at most one open stay per animal is
//! the lifecycle engine's job; the partial unique index on `stays` only makes
//! a violation fail loudly instead of corrupting the data.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::db::{date_text, parsed, parsed_opt};
use super::StoreError;
use crate::domain::{AnimalId, FieldId, Stay};

const COLUMNS: &str = "s.id, s.animal_id, s.field_id, s.entry_date, s.exit_date, s.notes";

pub struct StayLedger<'c> {
    conn: &'c Connection,
}

impl<'c> StayLedger<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Stay> {
        Ok(Stay {
            id: row.get(0)?,
            animal: parsed(row, 1)?,
            field: parsed(row, 2)?,
            entry_date: parsed(row, 3)?,
            exit_date: parsed_opt(row, 4)?,
            notes: row.get(5)?,
        })
    }

    /// Opens a stay with no exit date
    ///
    /// The caller must have closed any previous open stay first.
    pub(crate) fn open(
        &self,
        animal: &AnimalId,
        field: &FieldId,
        entry_date: NaiveDate,
        notes: &str,
    ) -> Result<Stay, StoreError> {
        self.conn.execute(
            "INSERT INTO stays (animal_id, field_id, entry_date, notes) VALUES (?1, ?2, ?3, ?4)",
            params![animal.to_string(), field.to_string(), date_text(entry_date), notes],
        )?;

        Ok(Stay {
            id: self.conn.last_insert_rowid(),
            animal: animal.clone(),
            field: field.clone(),
            entry_date,
            exit_date: None,
            notes: notes.to_string(),
        })
    }

    /// Sets the exit date of the animal's open stay and returns it
    pub(crate) fn close_open(&self, animal: &AnimalId, exit_date: NaiveDate) -> Result<Stay, StoreError> {
        let mut stay = self
            .open_stay(animal)?
            .ok_or_else(|| StoreError::NoOpenStay(animal.clone()))?;

        self.conn.execute(
            "UPDATE stays SET exit_date = ?2 WHERE id = ?1",
            params![stay.id, date_text(exit_date)],
        )?;

        stay.exit_date = Some(exit_date);
        Ok(stay)
    }

    /// The animal's open stay, if any
    pub fn open_stay(&self, animal: &AnimalId) -> Result<Option<Stay>, StoreError> {
        let stay = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM stays s WHERE s.animal_id = ?1 AND s.exit_date IS NULL",
                    COLUMNS
                ),
                params![animal.to_string()],
                Self::from_row,
            )
            .optional()?;

        Ok(stay)
    }

    /// Field of the open stay, if any
    pub fn current_field(&self, animal: &AnimalId) -> Result<Option<FieldId>, StoreError> {
        Ok(self.open_stay(animal)?.map(|stay| stay.field))
    }

    /// Animals whose open stay is in `field`, earliest arrival first
    pub fn occupants(&self, field: &FieldId) -> Result<Vec<AnimalId>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT animal_id FROM stays
             WHERE field_id = ?1 AND exit_date IS NULL
             ORDER BY entry_date, id",
        )?;

        let animals = stmt
            .query_map(params![field.to_string()], |row| parsed::<AnimalId>(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(animals)
    }

    /// Every stay of the animal, most recent entry first
    pub fn history(&self, animal: &AnimalId) -> Result<Vec<Stay>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM stays s WHERE s.animal_id = ?1 ORDER BY s.entry_date DESC, s.id DESC",
            COLUMNS
        ))?;

        let stays = stmt
            .query_map(params![animal.to_string()], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stays)
    }

    /// Number of open stays for the animal (0 or 1 when the invariant holds)
    pub fn open_count(&self, animal: &AnimalId) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM stays WHERE animal_id = ?1 AND exit_date IS NULL",
            params![animal.to_string()],
            |row| row.get(0),
        )?;

        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewAnimal, NewField, OwnerId, Sex};
    use crate::storage::{AnimalRegistry, Database, FieldRegistry};
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn open_close_and_query() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let owner = OwnerId::new("me").unwrap();

        let north = FieldRegistry::new(&tx)
            .create(&owner, &NewField::new("North"), Utc::now())
            .unwrap();
        let animal = AnimalRegistry::new(&tx)
            .create(&owner, &NewAnimal::new("A1", "Angus", Sex::Male, date("2024-01-01")), Utc::now())
            .unwrap();

        let stays = StayLedger::new(&tx);
        assert!(stays.current_field(&animal.id).unwrap().is_none());

        stays.open(&animal.id, &north.id, date("2024-01-01"), "").unwrap();
        assert_eq!(stays.current_field(&animal.id).unwrap(), Some(north.id.clone()));
        assert_eq!(stays.occupants(&north.id).unwrap(), vec![animal.id.clone()]);
        assert_eq!(stays.open_count(&animal.id).unwrap(), 1);

        let closed = stays.close_open(&animal.id, date("2024-02-01")).unwrap();
        assert_eq!(closed.exit_date, Some(date("2024-02-01")));
        assert!(stays.current_field(&animal.id).unwrap().is_none());
        assert!(stays.occupants(&north.id).unwrap().is_empty());
        assert_eq!(stays.history(&animal.id).unwrap().len(), 1);
    }

    #[test]
    fn close_without_open_stay() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.read().unwrap();
        let animal: AnimalId = "a-1234567".parse().unwrap();

        let result = StayLedger::new(&tx).close_open(&animal, date("2024-01-01"));
        assert!(matches!(result, Err(StoreError::NoOpenStay(id)) if id == animal));
    }
}
