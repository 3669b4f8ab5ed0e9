//! Domain models for herd
//!
//! Contains the entity types, identifiers and pure rules (density, status
//! defaults) without any I/O concerns.

mod id;
mod field;
mod animal;
mod status;
mod ledger;

pub use id::{AnimalId, FieldId, IdError, OwnerId, VaccineId};
pub use field::{density, Field, FieldUpdate, NewField, OccupancyLevel, OccupancyThresholds};
pub use animal::{Animal, AnimalUpdate, NewAnimal, Sex};
pub use status::{GeneralStatus, Health, NewStatus, ProductiveCycle, StatusSnapshot};
pub use ledger::{
    max_price, DateRange, MarketPrice, NewSale, NewVaccine, Sale, SaleFilter, Stay, Transfer, TransferFilter,
    Vaccination, VaccinationFilter, Vaccine,
};
