//! Ledger entries: stays, commercial events and vaccinations
//!
//! All of these are append-only facts. The only mutation any of them ever
//! sees is a stay getting its exit date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{AnimalId, FieldId, OwnerId, VaccineId};

/// Interval during which an animal occupies a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub id: i64,
    pub animal: AnimalId,
    pub field: FieldId,
    pub entry_date: NaiveDate,
    /// `None` while the animal is still in the field
    pub exit_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl Stay {
    pub fn is_open(&self) -> bool {
        self.exit_date.is_none()
    }

    /// Days spent in the field, counting an open stay up to `today`
    pub fn days(&self, today: NaiveDate) -> i64 {
        (self.exit_date.unwrap_or(today) - self.entry_date).num_days()
    }
}

/// A committed movement of an animal between two fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub animal: AnimalId,
    pub origin: FieldId,
    pub destination: FieldId,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// A commercial disposal of an animal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub animal: AnimalId,
    pub date: NaiveDate,
    pub buyer: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub destination: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// Input for recording a sale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub date: NaiveDate,
    pub buyer: String,
    pub price: Decimal,
    pub destination: String,
    pub notes: String,
}

impl NewSale {
    pub fn new(date: NaiveDate, buyer: impl Into<String>, price: Decimal) -> Self {
        Self {
            date,
            buyer: buyer.into(),
            price,
            destination: String::new(),
            notes: String::new(),
        }
    }

    /// Summary stamped on the "sold" status snapshot
    pub fn summary(&self) -> String {
        format!("Sold to {} for ${}", self.buyer, self.price)
    }
}

/// A vaccine product in an owner's catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccine {
    pub id: VaccineId,
    pub owner: OwnerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub laboratory: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Input for registering a vaccine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewVaccine {
    pub name: String,
    pub laboratory: String,
    pub description: String,
}

/// A vaccine applied to an animal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccination {
    pub id: i64,
    pub animal: AnimalId,
    pub vaccine: VaccineId,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dose: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// Largest accepted price: 12 digits, 2 of them after the point
pub fn max_price() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Reference market price for a livestock category on a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub id: i64,
    pub owner: OwnerId,
    pub date: NaiveDate,
    pub category: String,
    pub price: Decimal,
}

/// Inclusive date bounds for ledger queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferFilter {
    pub animal: Option<AnimalId>,
    pub origin: Option<FieldId>,
    pub destination: Option<FieldId>,
    pub dates: DateRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleFilter {
    /// Case-insensitive substring of the buyer name
    pub buyer: Option<String>,
    pub dates: DateRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaccinationFilter {
    pub animal: Option<AnimalId>,
    pub dates: DateRange,
}
