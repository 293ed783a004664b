//! Price record types
//!
//! - `PriceRow`: a validated CSV row on its way into the store
//! - `StoredPriceRecord`: a row as persisted, with its surrogate key
//! - `ImportResult`: store-wide totals snapshot taken when a load commits

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Date shape accepted for `create_date` cells and emitted on export.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Length of a `YYYY-MM-DD` literal.
pub const DATE_LEN: usize = 10;

/// A parsed, validated price row.
///
/// The price is kept as normalized decimal text and never passes through a
/// binary float.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRow {
    pub id: i64,
    pub create_date: NaiveDate,
    pub name: String,
    pub category: String,
    pub price_text: String,
}

impl PriceRow {
    pub fn new(
        id: i64,
        create_date: NaiveDate,
        name: impl Into<String>,
        category: impl Into<String>,
        price_text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            create_date,
            name: name.into(),
            category: category.into(),
            price_text: price_text.into(),
        }
    }
}

/// A price row as held by the store. Append-only; never updated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPriceRecord {
    /// Surrogate key assigned by the store
    pub row_id: i64,
    pub id: i64,
    pub create_date: NaiveDate,
    pub name: String,
    pub category: String,
    /// Stored decimal text, exported verbatim
    pub price: String,
}

impl From<StoredPriceRecord> for PriceRow {
    fn from(rec: StoredPriceRecord) -> Self {
        PriceRow::new(rec.id, rec.create_date, rec.name, rec.category, rec.price)
    }
}

/// Totals over the whole store as of the load's commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportResult {
    pub total_items: u64,
    pub total_categories: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

impl std::fmt::Display for ImportResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Price Totals:")?;
        writeln!(f, "  Items: {}", self.total_items)?;
        writeln!(f, "  Categories: {}", self.total_categories)?;
        writeln!(f, "  Total price: {}", self.total_price)
    }
}
