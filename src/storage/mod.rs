//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with one append-only table:
//! - prices(row_id, id, create_date, name, category, price)
//!
//! Prices are stored as exact decimal text and summed with `rust_decimal`,
//! never through SQLite's floating point `SUM`.

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteStore, busy_as_timeout};
