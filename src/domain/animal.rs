//! Animal domain model
//!
//! An animal record holds identity and descriptive data only. Where the
//! animal is and what state it is in live in the stay ledger and the status
//! history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::{AnimalId, IdError, OwnerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            _ => Err(IdError::UnknownVariant {
                kind: "sex",
                value: s.to_string(),
            }),
        }
    }
}

/// A tracked animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub owner: OwnerId,
    /// Ear tag, unique per owner
    pub tag: String,
    pub breed: String,
    pub sex: Sex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub intake_date: NaiveDate,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Animal {
    /// Approximate age in days at `on`, if the birth date is known
    pub fn age_in_days(&self, on: NaiveDate) -> Option<i64> {
        self.birth_date.map(|born| (on - born).num_days())
    }

    /// Applies descriptive changes; identity fields are left untouched
    pub fn apply(&mut self, update: &AnimalUpdate) {
        if let Some(breed) = &update.breed {
            self.breed = breed.clone();
        }
        if let Some(birth_date) = update.birth_date {
            self.birth_date = Some(birth_date);
        }
        if let Some(notes) = &update.notes {
            self.notes = notes.clone();
        }
    }
}

/// Input for registering an animal
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnimal {
    pub tag: String,
    pub breed: String,
    pub sex: Sex,
    pub birth_date: Option<NaiveDate>,
    pub intake_date: NaiveDate,
    pub notes: String,
}

impl NewAnimal {
    pub fn new(tag: impl Into<String>, breed: impl Into<String>, sex: Sex, intake_date: NaiveDate) -> Self {
        Self {
            tag: tag.into(),
            breed: breed.into(),
            sex,
            birth_date: None,
            intake_date,
            notes: String::new(),
        }
    }

    pub fn born(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }
}

/// Mutable descriptive fields of an animal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimalUpdate {
    pub breed: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl AnimalUpdate {
    pub fn is_empty(&self) -> bool {
        self.breed.is_none() && self.birth_date.is_none() && self.notes.is_none()
    }
}
