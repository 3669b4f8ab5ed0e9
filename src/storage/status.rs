//! Status history: append-only snapshots per animal
//!
//! "Current status" is the snapshot with the latest `recorded_at`, ties
//! broken by the highest row id (the one inserted last).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::db::{parsed, parsed_opt, timestamp_text};
use super::StoreError;
use crate::domain::{
    AnimalId, GeneralStatus, Health, NewStatus, OwnerId, ProductiveCycle, StatusSnapshot,
};

const COLUMNS: &str = "s.id, s.animal_id, s.recorded_at, s.productive_cycle, s.health, s.general_status, s.notes";
const NEWEST_FIRST: &str = "ORDER BY s.recorded_at DESC, s.id DESC";

/// Latest known value of each status dimension
///
/// A snapshot may set only some dimensions (a transfer stamps just the
/// general status), so each one is taken from the newest snapshot that set it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CurrentValues {
    pub productive_cycle: Option<ProductiveCycle>,
    pub health: Option<Health>,
    pub general_status: Option<GeneralStatus>,
}

pub struct StatusHistory<'c> {
    conn: &'c Connection,
}

impl<'c> StatusHistory<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<StatusSnapshot> {
        Ok(StatusSnapshot {
            id: row.get(0)?,
            animal: parsed(row, 1)?,
            recorded_at: parsed(row, 2)?,
            productive_cycle: parsed_opt(row, 3)?,
            health: parsed_opt(row, 4)?,
            general_status: parsed_opt(row, 5)?,
            notes: row.get(6)?,
        })
    }

    /// Appends a snapshot; prior snapshots are never touched
    pub(crate) fn append(
        &self,
        animal: &AnimalId,
        status: &NewStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusSnapshot, StoreError> {
        let recorded_at = status.recorded_at.unwrap_or(now);

        self.conn.execute(
            "INSERT INTO status_snapshots (animal_id, recorded_at, productive_cycle, health, general_status, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                animal.to_string(),
                timestamp_text(recorded_at),
                status.productive_cycle.map(|c| c.as_str()),
                status.health.map(|h| h.as_str()),
                status.general_status.map(|g| g.as_str()),
                status.notes,
            ],
        )?;

        Ok(StatusSnapshot {
            id: self.conn.last_insert_rowid(),
            animal: animal.clone(),
            recorded_at,
            productive_cycle: status.productive_cycle,
            health: status.health,
            general_status: status.general_status,
            notes: status.notes.clone(),
        })
    }

    /// Latest snapshot, or `None` if the animal has none yet
    pub fn current(&self, animal: &AnimalId) -> Result<Option<StatusSnapshot>, StoreError> {
        let snapshot = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM status_snapshots s WHERE s.animal_id = ?1 {} LIMIT 1",
                    COLUMNS, NEWEST_FIRST
                ),
                params![animal.to_string()],
                Self::from_row,
            )
            .optional()?;

        Ok(snapshot)
    }

    /// All snapshots, newest first
    pub fn history(&self, animal: &AnimalId) -> Result<Vec<StatusSnapshot>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM status_snapshots s WHERE s.animal_id = ?1 {}",
            COLUMNS, NEWEST_FIRST
        ))?;

        let snapshots = stmt
            .query_map(params![animal.to_string()], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    /// Folds the history into the latest value of each dimension
    pub fn current_values(&self, animal: &AnimalId) -> Result<CurrentValues, StoreError> {
        let mut values = CurrentValues::default();

        for snapshot in self.history(animal)? {
            values.productive_cycle = values.productive_cycle.or(snapshot.productive_cycle);
            values.health = values.health.or(snapshot.health);
            values.general_status = values.general_status.or(snapshot.general_status);

            if values.productive_cycle.is_some()
                && values.health.is_some()
                && values.general_status.is_some()
            {
                break;
            }
        }

        Ok(values)
    }

    /// Distinct animals per latest recorded productive cycle
    pub fn cycle_counts(&self, owner: &OwnerId) -> Result<BTreeMap<ProductiveCycle, usize>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.productive_cycle, COUNT(*)
             FROM status_snapshots s
             JOIN animals a ON a.id = s.animal_id
             WHERE a.owner = ?1
             AND s.id = (
                 SELECT s2.id FROM status_snapshots s2
                 WHERE s2.animal_id = s.animal_id AND s2.productive_cycle IS NOT NULL
                 ORDER BY s2.recorded_at DESC, s2.id DESC
                 LIMIT 1
             )
             GROUP BY s.productive_cycle",
        )?;

        let mut counts = BTreeMap::new();
        let rows = stmt.query_map(params![owner.as_str()], |row| {
            Ok((parsed::<ProductiveCycle>(row, 0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (cycle, count) = row?;
            counts.insert(cycle, count as usize);
        }

        Ok(counts)
    }

    /// Distinct animals that were ever stamped with `status`
    pub fn animals_ever(&self, owner: &OwnerId, status: GeneralStatus) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT s.animal_id)
             FROM status_snapshots s
             JOIN animals a ON a.id = s.animal_id
             WHERE a.owner = ?1 AND s.general_status = ?2",
            params![owner.as_str(), status.as_str()],
            |row| row.get(0),
        )?;

        Ok(n as usize)
    }
}
