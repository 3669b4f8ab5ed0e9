//! Market reference prices per livestock category

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::db::{date_text, parsed};
use super::StoreError;
use crate::domain::{DateRange, MarketPrice, OwnerId};

const COLUMNS: &str = "id, owner, date, category, price";

pub struct PriceList<'c> {
    conn: &'c Connection,
}

impl<'c> PriceList<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<MarketPrice> {
        Ok(MarketPrice {
            id: row.get(0)?,
            owner: parsed(row, 1)?,
            date: parsed(row, 2)?,
            category: row.get(3)?,
            price: parsed(row, 4)?,
        })
    }

    /// Records a price; one entry per (date, category) and owner
    pub(crate) fn record(
        &self,
        owner: &OwnerId,
        date: NaiveDate,
        category: &str,
        price: Decimal,
    ) -> Result<MarketPrice, StoreError> {
        let category = category.trim();

        let exists: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM market_prices WHERE owner = ?1 AND date = ?2 AND category = ?3)",
            params![owner.as_str(), date_text(date), category],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::DuplicatePrice {
                date: date_text(date),
                category: category.to_string(),
            });
        }

        self.conn.execute(
            "INSERT INTO market_prices (owner, date, category, price) VALUES (?1, ?2, ?3, ?4)",
            params![owner.as_str(), date_text(date), category, price.to_string()],
        )?;

        Ok(MarketPrice {
            id: self.conn.last_insert_rowid(),
            owner: owner.clone(),
            date,
            category: category.to_string(),
            price,
        })
    }

    /// Prices newest first, optionally for one category
    pub fn list(
        &self,
        owner: &OwnerId,
        category: Option<&str>,
        dates: &DateRange,
    ) -> Result<Vec<MarketPrice>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM market_prices
             WHERE owner = ?1
             AND (?2 IS NULL OR category = ?2)
             AND (?3 IS NULL OR date >= ?3)
             AND (?4 IS NULL OR date <= ?4)
             ORDER BY date DESC, id DESC",
            COLUMNS
        ))?;

        let prices = stmt
            .query_map(
                params![
                    owner.as_str(),
                    category,
                    dates.from.map(date_text),
                    dates.to.map(date_text),
                ],
                Self::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(prices)
    }

    /// Most recent price for a category
    pub fn latest(&self, owner: &OwnerId, category: &str) -> Result<Option<MarketPrice>, StoreError> {
        let price = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM market_prices WHERE owner = ?1 AND category = ?2 ORDER BY date DESC, id DESC LIMIT 1",
                    COLUMNS
                ),
                params![owner.as_str(), category],
                Self::from_row,
            )
            .optional()?;

        Ok(price)
    }
}
