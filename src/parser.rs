//! CSV Row Parser
//!
//! Turns the CSV payload into validated [`PriceRow`]s. The first record decides
//! the column layout:
//! - a header naming `id`, `name`, `category`, `price` and `create_date`
//!   (or `createdate`) in any order gives a [`ColumnLayout::Named`] layout;
//! - anything else is a data row and the layout is inferred from whether its
//!   second cell looks like a date.
//!
//! Parsing is all-or-nothing: the first invalid row aborts with its error.

use chrono::NaiveDate;
use csv::ByteRecord;
use rust_decimal::Decimal;

use crate::record::{DATE_FORMAT, DATE_LEN, PriceRow};
use crate::{Error, Result};

/// Physical column position of each logical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndexes {
    pub id: usize,
    pub name: usize,
    pub category: usize,
    pub price: usize,
    pub create_date: usize,
}

/// Column orders assumed when the file has no header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferredOrder {
    /// `id, create_date, name, category, price`
    DateSecond,
    /// `id, name, category, price, create_date`
    DateLast,
}

/// How cells map to fields for one parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    /// Positions taken from the header row
    Named(ColumnIndexes),
    /// Positions assumed from a fixed order
    Inferred(InferredOrder),
}

impl ColumnLayout {
    /// Resolve the layout from the first record.
    pub fn detect(first: &[String]) -> Self {
        match header_indexes(first) {
            Some(idx) => ColumnLayout::Named(idx),
            None => ColumnLayout::Inferred(InferredOrder::infer(first)),
        }
    }

    /// Whether the first record was consumed as a header.
    pub fn has_header(&self) -> bool {
        matches!(self, ColumnLayout::Named(_))
    }

    pub fn indexes(&self) -> ColumnIndexes {
        match self {
            ColumnLayout::Named(idx) => *idx,
            ColumnLayout::Inferred(order) => order.indexes(),
        }
    }
}

impl InferredOrder {
    pub fn infer(row: &[String]) -> Self {
        if row.len() >= 2 && looks_like_date(&row[1]) {
            InferredOrder::DateSecond
        } else {
            InferredOrder::DateLast
        }
    }

    pub fn indexes(&self) -> ColumnIndexes {
        match self {
            InferredOrder::DateSecond => ColumnIndexes {
                id: 0,
                create_date: 1,
                name: 2,
                category: 3,
                price: 4,
            },
            InferredOrder::DateLast => ColumnIndexes {
                id: 0,
                name: 1,
                category: 2,
                price: 3,
                create_date: 4,
            },
        }
    }
}

fn header_indexes(header: &[String]) -> Option<ColumnIndexes> {
    let lower: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
    let pos = |key: &str| lower.iter().position(|v| v == key);

    Some(ColumnIndexes {
        id: pos("id")?,
        name: pos("name")?,
        category: pos("category")?,
        price: pos("price")?,
        create_date: pos("create_date").or_else(|| pos("createdate"))?,
    })
}

/// Parse a CSV payload into price rows.
pub fn parse(csv_bytes: &[u8]) -> Result<Vec<PriceRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        // Ragged rows are allowed.
        .flexible(true)
        .from_reader(csv_bytes);

    let mut record = ByteRecord::new();
    if !reader.read_byte_record(&mut record)? || record.is_empty() {
        return Err(Error::EmptyInput);
    }

    let first = cells(&record);
    let layout = ColumnLayout::detect(&first);
    let idx = layout.indexes();
    tracing::debug!("CSV column layout: {:?}", layout);

    let mut rows = Vec::with_capacity(1024);
    if !layout.has_header() {
        rows.push(parse_row(&idx, &first)?);
    }

    while reader.read_byte_record(&mut record)? {
        if record.is_empty() {
            continue;
        }
        let row = parse_row(&idx, &cells(&record)).inspect_err(|e| {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            tracing::debug!("Rejecting CSV line {}: {}", line, e);
        })?;
        rows.push(row);
    }

    Ok(rows)
}

fn cells(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).into_owned())
        .collect()
}

/// Decode one record with the resolved indexes.
pub fn parse_row(idx: &ColumnIndexes, rec: &[String]) -> Result<PriceRow> {
    let get = |i: usize| rec.get(i).map(|s| s.trim()).unwrap_or("");

    let id_text = get(idx.id);
    let id: i64 = id_text
        .parse()
        .map_err(|_| Error::InvalidId(id_text.to_string()))?;

    let date_text = get(idx.create_date);
    let create_date =
        parse_date(date_text).ok_or_else(|| Error::InvalidDate(date_text.to_string()))?;

    let price_text = normalize_price(get(idx.price));
    if price_text.is_empty() {
        return Err(Error::EmptyPrice);
    }
    if Decimal::from_str_exact(&price_text).is_err() {
        return Err(Error::InvalidPrice(price_text));
    }

    Ok(PriceRow::new(
        id,
        create_date,
        get(idx.name),
        get(idx.category),
        price_text,
    ))
}

/// Trim and rewrite comma decimal separators to dots.
pub fn normalize_price(s: &str) -> String {
    s.trim().replace(',', ".")
}

/// Parse a strict `YYYY-MM-DD` literal.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() != DATE_LEN || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    // chrono's %Y takes a sign, so the digit runs are checked here.
    let digits = |r: std::ops::Range<usize>| bytes[r].iter().all(u8::is_ascii_digit);
    if !(digits(0..4) && digits(5..7) && digits(8..10)) {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

pub fn looks_like_date(s: &str) -> bool {
    parse_date(s).is_some()
}
