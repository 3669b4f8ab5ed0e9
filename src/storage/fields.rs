//! Field registry

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::db::{parsed, timestamp_text, unused_id};
use super::StoreError;
use crate::domain::{Field, FieldId, FieldUpdate, NewField, OwnerId};

const COLUMNS: &str = "id, owner, name, area, location, description, created_at";

/// Field definitions, scoped by owner
pub struct FieldRegistry<'c> {
    conn: &'c Connection,
}

impl<'c> FieldRegistry<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Field> {
        Ok(Field {
            id: parsed(row, 0)?,
            owner: parsed(row, 1)?,
            name: row.get(2)?,
            area: row.get(3)?,
            location: row.get(4)?,
            description: row.get(5)?,
            created_at: parsed(row, 6)?,
        })
    }

    /// Registers a field; names are unique per owner
    pub(crate) fn create(
        &self,
        owner: &OwnerId,
        new: &NewField,
        now: DateTime<Utc>,
    ) -> Result<Field, StoreError> {
        let name = new.name.trim();

        if self.find_by_name(owner, name)?.is_some() {
            return Err(StoreError::DuplicateName {
                kind: "field",
                name: name.to_string(),
            });
        }

        let id = unused_id(
            "field",
            |salt| FieldId::salted(owner, name, now, salt),
            |id| Ok(self.find(id)?.is_some()),
        )?;

        let field = Field {
            id,
            owner: owner.clone(),
            name: name.to_string(),
            area: new.area,
            location: new.location.clone(),
            description: new.description.clone(),
            created_at: now,
        };

        self.conn.execute(
            "INSERT INTO fields (id, owner, name, area, location, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                field.id.to_string(),
                field.owner.as_str(),
                field.name,
                field.area,
                field.location,
                field.description,
                timestamp_text(field.created_at),
            ],
        )?;

        Ok(field)
    }

    /// Applies descriptive changes and returns the updated field
    pub(crate) fn update(&self, id: &FieldId, update: &FieldUpdate) -> Result<Field, StoreError> {
        let mut field = self.get(id)?;

        if let Some(area) = update.area {
            field.area = Some(area);
        }
        if let Some(location) = &update.location {
            field.location = location.clone();
        }
        if let Some(description) = &update.description {
            field.description = description.clone();
        }

        self.conn.execute(
            "UPDATE fields SET area = ?2, location = ?3, description = ?4 WHERE id = ?1",
            params![id.to_string(), field.area, field.location, field.description],
        )?;

        Ok(field)
    }

    pub fn find(&self, id: &FieldId) -> Result<Option<Field>, StoreError> {
        let field = self
            .conn
            .query_row(
                &format!("SELECT {} FROM fields WHERE id = ?1", COLUMNS),
                params![id.to_string()],
                Self::from_row,
            )
            .optional()?;

        Ok(field)
    }

    pub fn get(&self, id: &FieldId) -> Result<Field, StoreError> {
        self.find(id)?
            .ok_or_else(|| StoreError::not_found("field", id))
    }

    pub fn find_by_name(&self, owner: &OwnerId, name: &str) -> Result<Option<Field>, StoreError> {
        let field = self
            .conn
            .query_row(
                &format!("SELECT {} FROM fields WHERE owner = ?1 AND name = ?2", COLUMNS),
                params![owner.as_str(), name],
                Self::from_row,
            )
            .optional()?;

        Ok(field)
    }

    /// Lists an owner's fields in insertion order
    pub fn list(&self, owner: &OwnerId) -> Result<Vec<Field>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM fields WHERE owner = ?1 ORDER BY rowid",
            COLUMNS
        ))?;

        let fields = stmt
            .query_map(params![owner.as_str()], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(fields)
    }
}
