//! # Lifecycle Engine
//!
//! The only writer of the stay ledger and the status history. Every
//! operation runs in one `BEGIN IMMEDIATE` transaction: ownership and input
//! checks come first, then the writes, then the commit. An error anywhere
//! drops the transaction, which rolls back everything it wrote.
//!
//! Current location and status are never stored as columns; they are the
//! open stay and the latest snapshot.
//!
//! ## Operations
//!
//! | Operation | Writes |
//! |-----------|--------|
//! | [`Lifecycle::intake`] | animal, optional stay, default snapshot |
//! | [`Lifecycle::transfer`] | closes origin stay + transfer row (if any origin), new stay, snapshot |
//! | [`Lifecycle::sell`] | sale, "sold" snapshot, closes open stay (if any) |
//! | [`Lifecycle::vaccinate`] | vaccination |
//! | [`Lifecycle::record_status`] | snapshot |

mod error;
mod tenancy;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{
    max_price, Animal, AnimalId, AnimalUpdate, Field, FieldId, FieldUpdate, GeneralStatus, MarketPrice,
    NewAnimal, NewField, NewSale, NewStatus, NewVaccine, OwnerId, ProductiveCycle, Sale,
    StatusSnapshot, Stay, Transfer, Vaccination, Vaccine, VaccineId,
};
use crate::storage::{
    AnimalRegistry, Database, EventLedger, FieldRegistry, PriceList, StatusHistory, StayLedger,
    StoreError, VaccineRegistry,
};

pub use error::{EngineError, Result};
pub use tenancy::{ensure_owner, Owned};

pub(crate) use tenancy::{owned_animal, owned_field, owned_vaccine};

/// Where an intake left the new animal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum Placement {
    /// A stay was opened in the requested field
    Placed { stay: Stay },

    /// No field was requested
    Unplaced,

    /// A field was requested but could not be used; the animal has no location
    Skipped { reason: String },
}

/// Result of [`Lifecycle::intake`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intake {
    pub animal: Animal,
    #[serde(flatten)]
    pub placement: Placement,
    pub status: StatusSnapshot,
}

/// Result of [`Lifecycle::transfer`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// The animal already stays in the destination; nothing was written
    AlreadyThere { field: FieldId },

    /// The animal now stays in the destination
    Moved {
        /// `None` when the animal had no location before
        transfer: Option<Transfer>,
        stay: Stay,
        status: StatusSnapshot,
    },
}

/// Result of [`Lifecycle::sell`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleOutcome {
    pub sale: Sale,
    pub status: StatusSnapshot,
    /// The stay the sale ended, if the animal had one
    pub closed_stay: Option<Stay>,
}

/// Input for [`Lifecycle::vaccinate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVaccination {
    pub vaccine: VaccineId,
    pub date: NaiveDate,
    pub dose: String,
    pub notes: String,
}

impl NewVaccination {
    pub fn new(vaccine: VaccineId, date: NaiveDate) -> Self {
        Self {
            vaccine,
            date,
            dose: String::new(),
            notes: String::new(),
        }
    }
}

/// Engine settings taken from project configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct Settings {
    /// Productive cycle stamped on the intake snapshot
    pub default_cycle: ProductiveCycle,
}

/// Write side of herd: the lifecycle state machine over the ledgers
pub struct Lifecycle<'db> {
    db: &'db mut Database,
    settings: Settings,
}

impl<'db> Lifecycle<'db> {
    pub fn new(db: &'db mut Database) -> Self {
        Self {
            db,
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers an animal, places it in `field` and stamps the default status
    ///
    /// A `field` that does not exist or belongs to someone else does not fail
    /// the intake; the animal is created without a location and the reason is
    /// reported in [`Placement::Skipped`].
    pub fn intake(
        &mut self,
        owner: &OwnerId,
        new: &NewAnimal,
        field: Option<&FieldId>,
    ) -> Result<Intake> {
        validate_animal(new)?;

        let tx = self.db.write()?;

        let target = match field {
            None => None,
            Some(id) => match owned_field(&tx, owner, id) {
                Ok(field) => Some(Ok(field)),
                Err(err @ (EngineError::NotFound { .. } | EngineError::CrossTenant { .. })) => {
                    debug!(field = %id, error = %err, "skipping initial stay");
                    Some(Err(err.to_string()))
                }
                Err(err) => return Err(err),
            },
        };

        let now = Utc::now();
        let animal = AnimalRegistry::new(&tx).create(owner, new, now)?;

        let placement = match target {
            None => Placement::Unplaced,
            Some(Err(reason)) => Placement::Skipped { reason },
            Some(Ok(field)) => {
                let note = format!("Initial intake into {}", field.name);
                let stay = StayLedger::new(&tx).open(&animal.id, &field.id, animal.intake_date, &note)?;
                Placement::Placed { stay }
            }
        };

        let status = StatusHistory::new(&tx).append(
            &animal.id,
            &NewStatus::intake(self.settings.default_cycle),
            now,
        )?;

        tx.commit()?;

        info!(animal = %animal.id, tag = %animal.tag, owner = %owner, "intake");
        Ok(Intake {
            animal,
            placement,
            status,
        })
    }

    /// Moves an animal to `destination` on `date`
    ///
    /// Transferring to the field the animal already occupies writes nothing and
    /// returns [`TransferOutcome::AlreadyThere`].
    pub fn transfer(
        &mut self,
        owner: &OwnerId,
        animal: &AnimalId,
        destination: &FieldId,
        date: NaiveDate,
        notes: &str,
    ) -> Result<TransferOutcome> {
        let tx = self.db.write()?;

        let animal = owned_animal(&tx, owner, animal)?;
        let destination = owned_field(&tx, owner, destination)?;

        let stays = StayLedger::new(&tx);
        let origin = stays.open_stay(&animal.id)?;

        if let Some(origin) = &origin {
            if origin.field == destination.id {
                debug!(animal = %animal.id, field = %destination.id, "already in destination");
                return Ok(TransferOutcome::AlreadyThere {
                    field: destination.id,
                });
            }
            if date < origin.entry_date {
                return Err(EngineError::validation(format!(
                    "transfer date {} is before the animal entered its current field on {}",
                    date, origin.entry_date
                )));
            }
        }

        let origin_name = match &origin {
            Some(origin) => Some(FieldRegistry::new(&tx).get(&origin.field)?.name),
            None => None,
        };
        let summary = transfer_summary(origin_name.as_deref(), &destination.name, notes);

        let transfer = match origin {
            Some(origin) => {
                stays.close_open(&animal.id, date)?;
                let transfer = EventLedger::new(&tx).record_transfer(
                    &animal.id,
                    &origin.field,
                    &destination.id,
                    date,
                    notes,
                )?;
                Some(transfer)
            }
            None => None,
        };

        let stay = stays.open(&animal.id, &destination.id, date, notes)?;
        let status = StatusHistory::new(&tx).append(
            &animal.id,
            &NewStatus::general(GeneralStatus::Transferred, summary),
            Utc::now(),
        )?;

        tx.commit()?;

        info!(
            animal = %animal.id,
            origin = ?transfer.as_ref().map(|t| t.origin.to_string()),
            destination = %destination.id,
            %date,
            "transfer"
        );
        Ok(TransferOutcome::Moved {
            transfer,
            stay,
            status,
        })
    }

    /// Records a sale, marks the animal sold and ends its stay if it has one
    pub fn sell(&mut self, owner: &OwnerId, animal: &AnimalId, sale: &NewSale) -> Result<SaleOutcome> {
        if sale.buyer.trim().is_empty() {
            return Err(EngineError::validation("buyer must not be empty"));
        }
        validate_price(sale.price)?;

        let tx = self.db.write()?;

        let animal = owned_animal(&tx, owner, animal)?;

        let stays = StayLedger::new(&tx);
        if let Some(open) = stays.open_stay(&animal.id)? {
            if sale.date < open.entry_date {
                return Err(EngineError::validation(format!(
                    "sale date {} is before the animal entered its current field on {}",
                    sale.date, open.entry_date
                )));
            }
        }

        let recorded = EventLedger::new(&tx).record_sale(&animal.id, sale)?;
        let status = StatusHistory::new(&tx).append(
            &animal.id,
            &NewStatus::general(GeneralStatus::Sold, sale.summary()),
            Utc::now(),
        )?;

        let closed_stay = match stays.close_open(&animal.id, sale.date) {
            Ok(stay) => Some(stay),
            Err(StoreError::NoOpenStay(_)) => {
                debug!(animal = %animal.id, "sold without an open stay");
                None
            }
            Err(err) => return Err(err.into()),
        };

        tx.commit()?;

        info!(animal = %animal.id, buyer = %recorded.buyer, price = %recorded.price, "sale");
        Ok(SaleOutcome {
            sale: recorded,
            status,
            closed_stay,
        })
    }

    /// Records a vaccination; location and status are untouched
    pub fn vaccinate(
        &mut self,
        owner: &OwnerId,
        animal: &AnimalId,
        vaccination: &NewVaccination,
    ) -> Result<Vaccination> {
        let tx = self.db.write()?;

        let animal = owned_animal(&tx, owner, animal)?;
        let vaccine = owned_vaccine(&tx, owner, &vaccination.vaccine)?;

        let recorded = EventLedger::new(&tx).record_vaccination(
            &animal.id,
            &vaccine.id,
            vaccination.date,
            vaccination.dose.trim(),
            &vaccination.notes,
        )?;

        tx.commit()?;

        info!(animal = %animal.id, vaccine = %vaccine.name, date = %vaccination.date, "vaccination");
        Ok(recorded)
    }

    /// Appends a status snapshot (e.g. a death, a health change)
    pub fn record_status(
        &mut self,
        owner: &OwnerId,
        animal: &AnimalId,
        status: &NewStatus,
    ) -> Result<StatusSnapshot> {
        if status.is_empty() {
            return Err(EngineError::validation(
                "a status needs a productive cycle, health or general status",
            ));
        }

        let tx = self.db.write()?;

        let animal = owned_animal(&tx, owner, animal)?;
        let snapshot = StatusHistory::new(&tx).append(&animal.id, status, Utc::now())?;

        tx.commit()?;

        info!(animal = %animal.id, general = ?snapshot.general_status, "status recorded");
        Ok(snapshot)
    }

    pub fn create_field(&mut self, owner: &OwnerId, new: &NewField) -> Result<Field> {
        if new.name.trim().is_empty() {
            return Err(EngineError::validation("field name must not be empty"));
        }
        validate_area(new.area)?;

        let tx = self.db.write()?;
        let field = FieldRegistry::new(&tx).create(owner, new, Utc::now())?;
        tx.commit()?;

        info!(field = %field.id, name = %field.name, owner = %owner, "field created");
        Ok(field)
    }

    pub fn update_field(&mut self, owner: &OwnerId, id: &FieldId, update: &FieldUpdate) -> Result<Field> {
        validate_area(update.area)?;

        let tx = self.db.write()?;
        owned_field(&tx, owner, id)?;
        let field = FieldRegistry::new(&tx).update(id, update)?;
        tx.commit()?;

        debug!(field = %field.id, "field updated");
        Ok(field)
    }

    /// Registers an animal without placing it or stamping a status
    pub fn create_animal(&mut self, owner: &OwnerId, new: &NewAnimal) -> Result<Animal> {
        validate_animal(new)?;

        let tx = self.db.write()?;
        let animal = AnimalRegistry::new(&tx).create(owner, new, Utc::now())?;
        tx.commit()?;

        info!(animal = %animal.id, tag = %animal.tag, owner = %owner, "animal created");
        Ok(animal)
    }

    /// Changes descriptive data only; location and status are untouched
    pub fn update_animal(
        &mut self,
        owner: &OwnerId,
        id: &AnimalId,
        update: &AnimalUpdate,
    ) -> Result<Animal> {
        if update.breed.as_deref().is_some_and(|b| b.trim().is_empty()) {
            return Err(EngineError::validation("breed must not be empty"));
        }

        let tx = self.db.write()?;
        let mut preview = owned_animal(&tx, owner, id)?;
        preview.apply(update);
        if let Some(birth) = preview.birth_date {
            if birth > preview.intake_date {
                return Err(EngineError::validation(format!(
                    "birth date {} is after intake date {}",
                    birth, preview.intake_date
                )));
            }
        }

        let animal = AnimalRegistry::new(&tx).update(id, update)?;
        tx.commit()?;

        debug!(animal = %animal.id, "animal updated");
        Ok(animal)
    }

    pub fn create_vaccine(&mut self, owner: &OwnerId, new: &NewVaccine) -> Result<Vaccine> {
        if new.name.trim().is_empty() {
            return Err(EngineError::validation("vaccine name must not be empty"));
        }

        let tx = self.db.write()?;
        let vaccine = VaccineRegistry::new(&tx).create(owner, new, Utc::now())?;
        tx.commit()?;

        info!(vaccine = %vaccine.id, name = %vaccine.name, owner = %owner, "vaccine created");
        Ok(vaccine)
    }

    /// Records the market reference price of a category on a date
    pub fn record_market_price(
        &mut self,
        owner: &OwnerId,
        date: NaiveDate,
        category: &str,
        price: Decimal,
    ) -> Result<MarketPrice> {
        if category.trim().is_empty() {
            return Err(EngineError::validation("category must not be empty"));
        }
        validate_price(price)?;

        let tx = self.db.write()?;
        let recorded = PriceList::new(&tx).record(owner, date, category, price)?;
        tx.commit()?;

        info!(category = %recorded.category, price = %recorded.price, %date, "market price recorded");
        Ok(recorded)
    }
}

fn validate_animal(new: &NewAnimal) -> Result<()> {
    if new.tag.trim().is_empty() {
        return Err(EngineError::validation("tag must not be empty"));
    }
    if new.breed.trim().is_empty() {
        return Err(EngineError::validation("breed must not be empty"));
    }
    if let Some(birth) = new.birth_date {
        if birth > new.intake_date {
            return Err(EngineError::validation(format!(
                "birth date {} is after intake date {}",
                birth, new.intake_date
            )));
        }
    }
    Ok(())
}

/// Note stamped on the "transferred" snapshot
fn transfer_summary(origin: Option<&str>, destination: &str, notes: &str) -> String {
    let summary = match origin {
        Some(origin) => format!("Transferred from {} to {}", origin, destination),
        None => format!("Placed in {}", destination),
    };
    match notes.trim() {
        "" => summary,
        notes => format!("{} ({})", summary, notes),
    }
}

fn validate_price(price: Decimal) -> Result<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(EngineError::validation("price must not be negative"));
    }
    if price > max_price() {
        return Err(EngineError::validation(format!("price must not exceed {}", max_price())));
    }
    if price.normalize().scale() > 2 {
        return Err(EngineError::validation("price must have at most 2 decimal places"));
    }
    Ok(())
}

fn validate_area(area: Option<f64>) -> Result<()> {
    match area {
        Some(area) if !(area > 0.0) => Err(EngineError::validation(format!(
            "area must be positive, got {}",
            area
        ))),
        _ => Ok(()),
    }
}
