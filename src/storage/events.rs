//! Commercial and sanitary event ledgers: transfers, sales, vaccinations
//!
//! Listings are owner-scoped through the animal reference and come back
//! newest event date first.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::{params, params_from_iter, Connection, Row};

use super::db::{date_text, parsed};
use super::StoreError;
use crate::domain::{
    AnimalId, DateRange, FieldId, NewSale, OwnerId, Sale, SaleFilter, Transfer, TransferFilter,
    Vaccination, VaccinationFilter, VaccineId,
};

/// Accumulates a WHERE clause with positional text parameters
struct Query {
    sql: String,
    args: Vec<String>,
}

impl Query {
    fn new(select: &str, owner: &OwnerId) -> Self {
        Self {
            sql: format!("{} WHERE a.owner = ?1", select),
            args: vec![owner.to_string()],
        }
    }

    fn and(&mut self, condition: &str, arg: impl ToString) {
        self.args.push(arg.to_string());
        self.sql
            .push_str(&format!(" AND {}", condition.replace('?', &format!("?{}", self.args.len()))));
    }

    fn dates(&mut self, column: &str, range: &DateRange) {
        if let Some(from) = range.from {
            self.and(&format!("{} >= ?", column), date_text(from));
        }
        if let Some(to) = range.to {
            self.and(&format!("{} <= ?", column), date_text(to));
        }
    }

    fn finish(mut self, order: &str) -> (String, Vec<String>) {
        self.sql.push(' ');
        self.sql.push_str(order);
        (self.sql, self.args)
    }
}

pub struct EventLedger<'c> {
    conn: &'c Connection,
}

impl<'c> EventLedger<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn transfer_from_row(row: &Row<'_>) -> rusqlite::Result<Transfer> {
        Ok(Transfer {
            id: row.get(0)?,
            animal: parsed(row, 1)?,
            origin: parsed(row, 2)?,
            destination: parsed(row, 3)?,
            date: parsed(row, 4)?,
            notes: row.get(5)?,
        })
    }

    fn sale_from_row(row: &Row<'_>) -> rusqlite::Result<Sale> {
        Ok(Sale {
            id: row.get(0)?,
            animal: parsed(row, 1)?,
            date: parsed(row, 2)?,
            buyer: row.get(3)?,
            price: parsed(row, 4)?,
            destination: row.get(5)?,
            notes: row.get(6)?,
        })
    }

    fn vaccination_from_row(row: &Row<'_>) -> rusqlite::Result<Vaccination> {
        Ok(Vaccination {
            id: row.get(0)?,
            animal: parsed(row, 1)?,
            vaccine: parsed(row, 2)?,
            date: parsed(row, 3)?,
            dose: row.get(4)?,
            notes: row.get(5)?,
        })
    }

    pub(crate) fn record_transfer(
        &self,
        animal: &AnimalId,
        origin: &FieldId,
        destination: &FieldId,
        date: NaiveDate,
        notes: &str,
    ) -> Result<Transfer, StoreError> {
        self.conn.execute(
            "INSERT INTO transfers (animal_id, origin_id, destination_id, date, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                animal.to_string(),
                origin.to_string(),
                destination.to_string(),
                date_text(date),
                notes,
            ],
        )?;

        Ok(Transfer {
            id: self.conn.last_insert_rowid(),
            animal: animal.clone(),
            origin: origin.clone(),
            destination: destination.clone(),
            date,
            notes: notes.to_string(),
        })
    }

    pub(crate) fn record_sale(&self, animal: &AnimalId, sale: &NewSale) -> Result<Sale, StoreError> {
        self.conn.execute(
            "INSERT INTO sales (animal_id, date, buyer, price, destination, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                animal.to_string(),
                date_text(sale.date),
                sale.buyer.trim(),
                sale.price.to_string(),
                sale.destination,
                sale.notes,
            ],
        )?;

        Ok(Sale {
            id: self.conn.last_insert_rowid(),
            animal: animal.clone(),
            date: sale.date,
            buyer: sale.buyer.trim().to_string(),
            price: sale.price,
            destination: sale.destination.clone(),
            notes: sale.notes.clone(),
        })
    }

    pub(crate) fn record_vaccination(
        &self,
        animal: &AnimalId,
        vaccine: &VaccineId,
        date: NaiveDate,
        dose: &str,
        notes: &str,
    ) -> Result<Vaccination, StoreError> {
        self.conn.execute(
            "INSERT INTO vaccinations (animal_id, vaccine_id, date, dose, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![animal.to_string(), vaccine.to_string(), date_text(date), dose, notes],
        )?;

        Ok(Vaccination {
            id: self.conn.last_insert_rowid(),
            animal: animal.clone(),
            vaccine: vaccine.clone(),
            date,
            dose: dose.to_string(),
            notes: notes.to_string(),
        })
    }

    pub fn transfers(&self, owner: &OwnerId, filter: &TransferFilter) -> Result<Vec<Transfer>, StoreError> {
        let mut query = Query::new(
            "SELECT t.id, t.animal_id, t.origin_id, t.destination_id, t.date, t.notes
             FROM transfers t JOIN animals a ON a.id = t.animal_id",
            owner,
        );
        if let Some(animal) = &filter.animal {
            query.and("t.animal_id = ?", animal);
        }
        if let Some(origin) = &filter.origin {
            query.and("t.origin_id = ?", origin);
        }
        if let Some(destination) = &filter.destination {
            query.and("t.destination_id = ?", destination);
        }
        query.dates("t.date", &filter.dates);

        let (sql, args) = query.finish("ORDER BY t.date DESC, t.id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let transfers = stmt
            .query_map(params_from_iter(args.iter()), Self::transfer_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transfers)
    }

    pub fn sales(&self, owner: &OwnerId, filter: &SaleFilter) -> Result<Vec<Sale>, StoreError> {
        let mut query = Query::new(
            "SELECT x.id, x.animal_id, x.date, x.buyer, x.price, x.destination, x.notes
             FROM sales x JOIN animals a ON a.id = x.animal_id",
            owner,
        );
        query.dates("x.date", &filter.dates);

        let (sql, args) = query.finish("ORDER BY x.date DESC, x.id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let sales = stmt
            .query_map(params_from_iter(args.iter()), Self::sale_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let sales = match &filter.buyer {
            Some(buyer) => {
                let needle = buyer.to_lowercase();
                sales
                    .into_iter()
                    .filter(|s| s.buyer.to_lowercase().contains(&needle))
                    .collect()
            }
            None => sales,
        };

        Ok(sales)
    }

    pub fn vaccinations(
        &self,
        owner: &OwnerId,
        filter: &VaccinationFilter,
    ) -> Result<Vec<Vaccination>, StoreError> {
        let mut query = Query::new(
            "SELECT v.id, v.animal_id, v.vaccine_id, v.date, v.dose, v.notes
             FROM vaccinations v JOIN animals a ON a.id = v.animal_id",
            owner,
        );
        if let Some(animal) = &filter.animal {
            query.and("v.animal_id = ?", animal);
        }
        query.dates("v.date", &filter.dates);

        let (sql, args) = query.finish("ORDER BY v.date DESC, v.id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let vaccinations = stmt
            .query_map(params_from_iter(args.iter()), Self::vaccination_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vaccinations)
    }

    /// Sum of sale prices in the range
    pub fn sales_total(&self, owner: &OwnerId, dates: &DateRange) -> Result<Decimal, StoreError> {
        let filter = SaleFilter {
            buyer: None,
            dates: *dates,
        };
        self.sales(owner, &filter)?
            .iter()
            .try_fold(Decimal::ZERO, |total, sale| total.checked_add(sale.price))
            .ok_or(StoreError::Overflow("sales total"))
    }

    pub fn transfer_count(&self, owner: &OwnerId, dates: &DateRange) -> Result<usize, StoreError> {
        let filter = TransferFilter {
            dates: *dates,
            ..TransferFilter::default()
        };
        Ok(self.transfers(owner, &filter)?.len())
    }

    pub fn vaccination_count(&self, owner: &OwnerId, dates: &DateRange) -> Result<usize, StoreError> {
        let filter = VaccinationFilter {
            animal: None,
            dates: *dates,
        };
        Ok(self.vaccinations(owner, &filter)?.len())
    }
}
