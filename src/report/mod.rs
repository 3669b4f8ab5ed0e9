//! # Occupancy and aggregation reads
//!
//! Stateless projections over the ledgers. Every method opens its own read
//! transaction, so all the numbers one call returns come from the same
//! committed snapshot and never show half of a lifecycle operation.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use rusqlite::Connection;
use serde::Serialize;

use crate::domain::{
    Animal, AnimalId, DateRange, Field, FieldId, GeneralStatus, Health, MarketPrice,
    OccupancyLevel, OwnerId, ProductiveCycle, Sale, SaleFilter, StatusSnapshot, Stay, Transfer,
    TransferFilter, Vaccination, VaccinationFilter, Vaccine, VaccineId,
};
use crate::engine::{owned_animal, owned_field, owned_vaccine, Result};
use crate::storage::{
    AnimalFilter, AnimalRegistry, Database, EventLedger, FieldRegistry, OccupancyConfig, PriceList,
    StatusHistory, StayLedger, VaccineRegistry,
};

/// Where an animal is and what state it is in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentState {
    pub animal: AnimalId,
    pub tag: String,
    pub field: Option<FieldId>,
    pub field_name: Option<String>,
    pub since: Option<NaiveDate>,
    pub general_status: Option<GeneralStatus>,
    pub productive_cycle: Option<ProductiveCycle>,
    pub health: Option<Health>,
}

/// Occupancy figures for one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOccupancy {
    pub field: FieldId,
    pub name: String,
    pub count: usize,
    pub area: Option<f64>,
    /// Animals per hectare
    pub density: f64,
    pub level: OccupancyLevel,
    /// Density as a percentage of the recommended density
    pub percent_of_recommended: f64,
}

/// Owner-wide summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub month_start: NaiveDate,
    pub fields: usize,
    pub animals: usize,
    pub animals_sold: usize,
    pub sales_this_month: Decimal,
    pub transfers_this_month: usize,
    pub vaccinations_this_month: usize,
    pub avg_animals_per_field: f64,
    pub occupancy: Vec<FieldOccupancy>,
    pub cycles: BTreeMap<ProductiveCycle, usize>,
}

/// Read side of herd
pub struct Reader<'db> {
    db: &'db Database,
    occupancy: OccupancyConfig,
}

impl<'db> Reader<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            occupancy: OccupancyConfig::default(),
        }
    }

    pub fn with_occupancy(mut self, occupancy: OccupancyConfig) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn fields(&self, owner: &OwnerId) -> Result<Vec<Field>> {
        let tx = self.db.read()?;
        let fields = FieldRegistry::new(&tx).list(owner)?;
        Ok(fields)
    }

    pub fn field(&self, owner: &OwnerId, id: &FieldId) -> Result<Field> {
        let tx = self.db.read()?;
        owned_field(&tx, owner, id)
    }

    /// Looks a field up by name
    pub fn field_named(&self, owner: &OwnerId, name: &str) -> Result<Option<Field>> {
        let tx = self.db.read()?;
        let field = FieldRegistry::new(&tx).find_by_name(owner, name.trim())?;
        Ok(field)
    }

    pub fn animals(&self, owner: &OwnerId, filter: &AnimalFilter) -> Result<Vec<Animal>> {
        let tx = self.db.read()?;
        let animals = AnimalRegistry::new(&tx).list(owner, filter)?;
        Ok(animals)
    }

    pub fn animal(&self, owner: &OwnerId, id: &AnimalId) -> Result<Animal> {
        let tx = self.db.read()?;
        owned_animal(&tx, owner, id)
    }

    /// Looks an animal up by tag
    pub fn animal_tagged(&self, owner: &OwnerId, tag: &str) -> Result<Option<Animal>> {
        let tx = self.db.read()?;
        let animal = AnimalRegistry::new(&tx).find_by_tag(owner, tag.trim())?;
        Ok(animal)
    }

    pub fn vaccines(&self, owner: &OwnerId) -> Result<Vec<Vaccine>> {
        let tx = self.db.read()?;
        let vaccines = VaccineRegistry::new(&tx).list(owner)?;
        Ok(vaccines)
    }

    pub fn vaccine(&self, owner: &OwnerId, id: &VaccineId) -> Result<Vaccine> {
        let tx = self.db.read()?;
        owned_vaccine(&tx, owner, id)
    }

    /// Location plus the latest value of each status dimension
    pub fn current_state(&self, owner: &OwnerId, animal: &AnimalId) -> Result<CurrentState> {
        let tx = self.db.read()?;
        let animal = owned_animal(&tx, owner, animal)?;

        let stay = StayLedger::new(&tx).open_stay(&animal.id)?;
        let field = match &stay {
            Some(stay) => FieldRegistry::new(&tx).find(&stay.field)?,
            None => None,
        };
        let values = StatusHistory::new(&tx).current_values(&animal.id)?;

        Ok(CurrentState {
            animal: animal.id,
            tag: animal.tag,
            field: stay.as_ref().map(|s| s.field.clone()),
            field_name: field.map(|f| f.name),
            since: stay.map(|s| s.entry_date),
            general_status: values.general_status,
            productive_cycle: values.productive_cycle,
            health: values.health,
        })
    }

    /// The latest snapshot as recorded
    pub fn current_status(&self, owner: &OwnerId, animal: &AnimalId) -> Result<Option<StatusSnapshot>> {
        let tx = self.db.read()?;
        let animal = owned_animal(&tx, owner, animal)?;
        let snapshot = StatusHistory::new(&tx).current(&animal.id)?;
        Ok(snapshot)
    }

    pub fn status_history(&self, owner: &OwnerId, animal: &AnimalId) -> Result<Vec<StatusSnapshot>> {
        let tx = self.db.read()?;
        let animal = owned_animal(&tx, owner, animal)?;
        let history = StatusHistory::new(&tx).history(&animal.id)?;
        Ok(history)
    }

    pub fn stay_history(&self, owner: &OwnerId, animal: &AnimalId) -> Result<Vec<Stay>> {
        let tx = self.db.read()?;
        let animal = owned_animal(&tx, owner, animal)?;
        let stays = StayLedger::new(&tx).history(&animal.id)?;
        Ok(stays)
    }

    pub fn field_occupancy(&self, owner: &OwnerId, field: &FieldId) -> Result<FieldOccupancy> {
        let tx = self.db.read()?;
        let field = owned_field(&tx, owner, field)?;
        self.occupancy_of(&tx, field)
    }

    /// Occupancy of every field, in registration order
    pub fn occupancy_by_field(&self, owner: &OwnerId) -> Result<Vec<FieldOccupancy>> {
        let tx = self.db.read()?;
        self.all_occupancy(&tx, owner)
    }

    /// Distinct animals per latest productive cycle
    pub fn cycle_counts(&self, owner: &OwnerId) -> Result<BTreeMap<ProductiveCycle, usize>> {
        let tx = self.db.read()?;
        let counts = StatusHistory::new(&tx).cycle_counts(owner)?;
        Ok(counts)
    }

    /// Owner's vaccines the animal has never received
    pub fn pending_vaccines(&self, owner: &OwnerId, animal: &AnimalId) -> Result<Vec<Vaccine>> {
        let tx = self.db.read()?;
        let animal = owned_animal(&tx, owner, animal)?;
        let pending = VaccineRegistry::new(&tx).pending_for(owner, &animal.id)?;
        Ok(pending)
    }

    pub fn transfers(&self, owner: &OwnerId, filter: &TransferFilter) -> Result<Vec<Transfer>> {
        let tx = self.db.read()?;
        let transfers = EventLedger::new(&tx).transfers(owner, filter)?;
        Ok(transfers)
    }

    pub fn sales(&self, owner: &OwnerId, filter: &SaleFilter) -> Result<Vec<Sale>> {
        let tx = self.db.read()?;
        let sales = EventLedger::new(&tx).sales(owner, filter)?;
        Ok(sales)
    }

    pub fn vaccinations(&self, owner: &OwnerId, filter: &VaccinationFilter) -> Result<Vec<Vaccination>> {
        let tx = self.db.read()?;
        let vaccinations = EventLedger::new(&tx).vaccinations(owner, filter)?;
        Ok(vaccinations)
    }

    pub fn market_prices(
        &self,
        owner: &OwnerId,
        category: Option<&str>,
        dates: &DateRange,
    ) -> Result<Vec<MarketPrice>> {
        let tx = self.db.read()?;
        let prices = PriceList::new(&tx).list(owner, category, dates)?;
        Ok(prices)
    }

    /// Totals, month-to-date activity, occupancy and cycle distribution
    pub fn dashboard(&self, owner: &OwnerId, today: NaiveDate) -> Result<Dashboard> {
        let tx = self.db.read()?;

        let month_start = today - Duration::days(i64::from(today.day0()));
        let month = DateRange::new(Some(month_start), Some(today));

        let fields = FieldRegistry::new(&tx).list(owner)?.len();
        let animals = AnimalRegistry::new(&tx).count(owner)?;
        let status = StatusHistory::new(&tx);
        let events = EventLedger::new(&tx);

        let avg_animals_per_field = if fields > 0 {
            animals as f64 / fields as f64
        } else {
            0.0
        };

        Ok(Dashboard {
            today,
            month_start,
            fields,
            animals,
            animals_sold: status.animals_ever(owner, GeneralStatus::Sold)?,
            sales_this_month: events.sales_total(owner, &month)?,
            transfers_this_month: events.transfer_count(owner, &month)?,
            vaccinations_this_month: events.vaccination_count(owner, &month)?,
            avg_animals_per_field,
            occupancy: self.all_occupancy(&tx, owner)?,
            cycles: status.cycle_counts(owner)?,
        })
    }

    fn all_occupancy(&self, conn: &Connection, owner: &OwnerId) -> Result<Vec<FieldOccupancy>> {
        FieldRegistry::new(conn)
            .list(owner)?
            .into_iter()
            .map(|field| self.occupancy_of(conn, field))
            .collect()
    }

    fn occupancy_of(&self, conn: &Connection, field: Field) -> Result<FieldOccupancy> {
        let count = StayLedger::new(conn).occupants(&field.id)?.len();
        let density = field.density(count);
        let percent_of_recommended = if self.occupancy.recommended_density > 0.0 {
            density / self.occupancy.recommended_density * 100.0
        } else {
            0.0
        };

        Ok(FieldOccupancy {
            level: self.occupancy.thresholds().classify(density),
            field: field.id,
            name: field.name,
            count,
            area: field.area,
            density,
            percent_of_recommended,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewAnimal, NewField, NewSale, NewStatus, NewVaccine, Sex};
    use crate::engine::{EngineError, Lifecycle, NewVaccination};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).unwrap()
    }

    fn cow(tag: &str) -> NewAnimal {
        NewAnimal::new(tag, "Hereford", Sex::Female, date("2024-01-01"))
    }

    #[test]
    fn current_state_follows_the_ledgers() {
        let mut db = Database::open_in_memory().unwrap();
        let me = owner("me");
        let north = Lifecycle::new(&mut db).create_field(&me, &NewField::new("North")).unwrap();
        let animal = Lifecycle::new(&mut db)
            .intake(&me, &cow("A1"), Some(&north.id))
            .unwrap()
            .animal;

        let state = Reader::new(&db).current_state(&me, &animal.id).unwrap();
        assert_eq!(state.field, Some(north.id.clone()));
        assert_eq!(state.field_name.as_deref(), Some("North"));
        assert_eq!(state.since, Some(date("2024-01-01")));
        assert_eq!(state.general_status, Some(GeneralStatus::Active));
        assert_eq!(state.productive_cycle, Some(ProductiveCycle::Calf));
        assert_eq!(state.health, Some(Health::Healthy));

        let sale = NewSale::new(date("2024-02-01"), "Feria", Decimal::new(900, 0));
        Lifecycle::new(&mut db).sell(&me, &animal.id, &sale).unwrap();

        let state = Reader::new(&db).current_state(&me, &animal.id).unwrap();
        assert_eq!(state.field, None);
        assert_eq!(state.general_status, Some(GeneralStatus::Sold));
        // Dimensions the sale did not set keep their latest value
        assert_eq!(state.productive_cycle, Some(ProductiveCycle::Calf));

        let raw = Reader::new(&db).current_status(&me, &animal.id).unwrap().unwrap();
        assert_eq!(raw.productive_cycle, None);
    }

    #[test]
    fn reads_are_owner_scoped() {
        let mut db = Database::open_in_memory().unwrap();
        let me = owner("me");
        let north = Lifecycle::new(&mut db).create_field(&me, &NewField::new("North")).unwrap();
        let animal = Lifecycle::new(&mut db).intake(&me, &cow("A1"), Some(&north.id)).unwrap().animal;

        let reader = Reader::new(&db);
        let you = owner("you");
        assert!(matches!(
            reader.current_state(&you, &animal.id),
            Err(EngineError::CrossTenant { .. })
        ));
        assert!(matches!(
            reader.field_occupancy(&you, &north.id),
            Err(EngineError::CrossTenant { .. })
        ));
        assert!(reader.fields(&you).unwrap().is_empty());
        assert!(reader.animals(&you, &AnimalFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn occupancy_levels_use_thresholds() {
        let mut db = Database::open_in_memory().unwrap();
        let me = owner("me");
        let small = Lifecycle::new(&mut db)
            .create_field(&me, &NewField::new("Small").with_area(1.0))
            .unwrap();
        let large = Lifecycle::new(&mut db)
            .create_field(&me, &NewField::new("Large").with_area(100.0))
            .unwrap();
        let unknown = Lifecycle::new(&mut db).create_field(&me, &NewField::new("Unmeasured")).unwrap();

        for tag in ["A1", "A2", "A3"] {
            Lifecycle::new(&mut db).intake(&me, &cow(tag), Some(&small.id)).unwrap();
        }
        Lifecycle::new(&mut db).intake(&me, &cow("B1"), Some(&large.id)).unwrap();
        Lifecycle::new(&mut db).intake(&me, &cow("C1"), Some(&unknown.id)).unwrap();

        let reader = Reader::new(&db);
        let small_occ = reader.field_occupancy(&me, &small.id).unwrap();
        assert_eq!(small_occ.count, 3);
        assert_eq!(small_occ.density, 3.0);
        assert_eq!(small_occ.level, OccupancyLevel::High);
        assert_eq!(small_occ.percent_of_recommended, 150.0);

        let large_occ = reader.field_occupancy(&me, &large.id).unwrap();
        assert_eq!(large_occ.level, OccupancyLevel::Low);

        let unknown_occ = reader.field_occupancy(&me, &unknown.id).unwrap();
        assert_eq!(unknown_occ.count, 1);
        assert_eq!(unknown_occ.density, 0.0);
        assert_eq!(unknown_occ.level, OccupancyLevel::Low);

        let lenient = OccupancyConfig {
            low_below: 0.0,
            high_above: 5.0,
            recommended_density: 3.0,
        };
        let relaxed = Reader::new(&db).with_occupancy(lenient);
        let small_occ = relaxed.field_occupancy(&me, &small.id).unwrap();
        assert_eq!(small_occ.level, OccupancyLevel::Medium);
        assert_eq!(small_occ.percent_of_recommended, 100.0);

        let all = reader.occupancy_by_field(&me).unwrap();
        let names: Vec<_> = all.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Small", "Large", "Unmeasured"]);
    }

    #[test]
    fn animal_filters() {
        let mut db = Database::open_in_memory().unwrap();
        let me = owner("me");
        let north = Lifecycle::new(&mut db).create_field(&me, &NewField::new("North")).unwrap();
        let south = Lifecycle::new(&mut db).create_field(&me, &NewField::new("South")).unwrap();

        let a1 = Lifecycle::new(&mut db).intake(&me, &cow("A1"), Some(&north.id)).unwrap().animal;
        Lifecycle::new(&mut db)
            .intake(&me, &NewAnimal::new("A2", "Aberdeen Angus", Sex::Male, date("2024-01-01")), Some(&north.id))
            .unwrap();
        Lifecycle::new(&mut db)
            .transfer(&me, &a1.id, &south.id, date("2024-02-01"), "")
            .unwrap();

        let reader = Reader::new(&db);
        let in_north = AnimalFilter {
            field: Some(north.id.clone()),
            ..AnimalFilter::default()
        };
        let tags: Vec<_> = reader
            .animals(&me, &in_north)
            .unwrap()
            .into_iter()
            .map(|a| a.tag)
            .collect();
        assert_eq!(tags, vec!["A2"]);

        let angus = AnimalFilter {
            breed: Some("ANGUS".to_string()),
            ..AnimalFilter::default()
        };
        assert_eq!(reader.animals(&me, &angus).unwrap().len(), 1);
        assert_eq!(reader.animals(&me, &AnimalFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn cycle_counts_group_distinct_animals() {
        let mut db = Database::open_in_memory().unwrap();
        let me = owner("me");

        let a1 = Lifecycle::new(&mut db).intake(&me, &cow("A1"), None).unwrap().animal;
        Lifecycle::new(&mut db).intake(&me, &cow("A2"), None).unwrap();
        let grown = NewStatus {
            productive_cycle: Some(ProductiveCycle::Heifer),
            ..NewStatus::default()
        };
        Lifecycle::new(&mut db).record_status(&me, &a1.id, &grown).unwrap();
        Lifecycle::new(&mut db)
            .record_status(&me, &a1.id, &NewStatus::general(GeneralStatus::Dead, ""))
            .unwrap();

        let counts = Reader::new(&db).cycle_counts(&me).unwrap();
        assert_eq!(counts.get(&ProductiveCycle::Heifer), Some(&1));
        assert_eq!(counts.get(&ProductiveCycle::Calf), Some(&1));
    }

    #[test]
    fn dashboard_month_to_date() {
        let mut db = Database::open_in_memory().unwrap();
        let me = owner("me");
        let north = Lifecycle::new(&mut db)
            .create_field(&me, &NewField::new("North").with_area(2.0))
            .unwrap();
        let south = Lifecycle::new(&mut db).create_field(&me, &NewField::new("South")).unwrap();
        let vaccine = Lifecycle::new(&mut db)
            .create_vaccine(&me, &NewVaccine { name: "Aftosa".to_string(), ..NewVaccine::default() })
            .unwrap();

        let a1 = Lifecycle::new(&mut db).intake(&me, &cow("A1"), Some(&north.id)).unwrap().animal;
        let a2 = Lifecycle::new(&mut db).intake(&me, &cow("A2"), Some(&north.id)).unwrap().animal;
        Lifecycle::new(&mut db).intake(&me, &cow("A3"), Some(&north.id)).unwrap();

        // Last month
        Lifecycle::new(&mut db)
            .transfer(&me, &a1.id, &south.id, date("2024-02-20"), "")
            .unwrap();
        Lifecycle::new(&mut db)
            .sell(&me, &a2.id, &NewSale::new(date("2024-02-25"), "Feria", Decimal::new(700, 0)))
            .unwrap();

        // This month
        Lifecycle::new(&mut db)
            .sell(&me, &a1.id, &NewSale::new(date("2024-03-05"), "Feria", Decimal::new(80050, 2)))
            .unwrap();
        Lifecycle::new(&mut db)
            .vaccinate(&me, &a2.id, &NewVaccination::new(vaccine.id, date("2024-03-02")))
            .unwrap();

        let dashboard = Reader::new(&db).dashboard(&me, date("2024-03-10")).unwrap();
        assert_eq!(dashboard.month_start, date("2024-03-01"));
        assert_eq!(dashboard.fields, 2);
        assert_eq!(dashboard.animals, 3);
        assert_eq!(dashboard.animals_sold, 2);
        assert_eq!(dashboard.sales_this_month, Decimal::new(80050, 2));
        assert_eq!(dashboard.transfers_this_month, 0);
        assert_eq!(dashboard.vaccinations_this_month, 1);
        assert_eq!(dashboard.avg_animals_per_field, 1.5);

        let north_occ = &dashboard.occupancy[0];
        assert_eq!(north_occ.count, 1);
        assert_eq!(north_occ.density, 0.5);
        assert_eq!(north_occ.percent_of_recommended, 25.0);
        assert_eq!(dashboard.cycles.get(&ProductiveCycle::Calf), Some(&3));

        assert!(Reader::new(&db).pending_vaccines(&me, &a2.id).unwrap().is_empty());
        assert_eq!(Reader::new(&db).pending_vaccines(&me, &a1.id).unwrap().len(), 1);
    }
}
