//! SQLite storage implementation

use std::path::Path;
use std::time::{Duration, Instant};

use rusqlite::{Connection, ErrorCode, TransactionBehavior, params};
use rust_decimal::Decimal;

use super::schema;
use crate::record::{ImportResult, PriceRow, StoredPriceRecord};
use crate::{Error, Result};

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed storage for price records
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_busy_timeout(path, BUSY_TIMEOUT)
    }

    /// Open a database file, waiting at most `busy` on another writer's lock.
    pub fn open_with_busy_timeout(path: &Path, busy: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy)?;
        // WAL lets the export query read while an import holds the write lock.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Opened {} (journal_mode={})", path.display(), mode);

        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Load ==========

    /// Insert `rows` in order and recompute store-wide totals in one transaction.
    ///
    /// Either every row is committed and the returned totals reflect the
    /// committed table, or nothing is persisted. An empty batch still reports
    /// the live totals. With a `deadline`, waiting on another writer's lock is
    /// bounded by the time left, and the deadline is checked before each insert
    /// and before commit; missing it rolls the transaction back with
    /// [`Error::Timeout`].
    pub fn load_and_aggregate(
        &mut self,
        rows: &[PriceRow],
        deadline: Option<Instant>,
    ) -> Result<ImportResult> {
        if let Some(at) = deadline {
            self.conn
                .busy_timeout(at.saturating_duration_since(Instant::now()))?;
        }

        let totals = self.load_in_transaction(rows, deadline).map_err(|err| {
            if deadline.is_some() {
                busy_as_timeout(err)
            } else {
                err
            }
        })?;

        tracing::info!(
            "Loaded {} rows; store now holds {} items in {} categories",
            rows.len(),
            totals.total_items,
            totals.total_categories
        );
        Ok(totals)
    }

    fn load_in_transaction(
        &mut self,
        rows: &[PriceRow],
        deadline: Option<Instant>,
    ) -> Result<ImportResult> {
        // IMMEDIATE takes the write lock up front so concurrent loads queue on
        // the busy timeout instead of failing a lock upgrade.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO prices (id, create_date, name, category, price)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for row in rows {
                check_deadline(deadline)?;
                stmt.execute(params![
                    row.id,
                    row.create_date,
                    row.name,
                    row.category,
                    row.price_text,
                ])?;
            }
        }

        // Stored text that is not an exact decimal fails the sum and rolls back.
        let totals = aggregates_in(&tx)?;
        check_deadline(deadline)?;
        tx.commit()?;
        Ok(totals)
    }

    // ========== Queries ==========

    /// Current store-wide totals
    pub fn aggregates(&self) -> Result<ImportResult> {
        aggregates_in(&self.conn)
    }

    /// Count all stored records
    pub fn count_records(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM prices", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// All records in export order: `(id, create_date, name, category)`,
    /// insertion order breaking remaining ties.
    pub fn all_records(&self) -> Result<Vec<StoredPriceRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT row_id, id, create_date, name, category, price
            FROM prices
            ORDER BY id, create_date, name, category, row_id
            "#,
        )?;

        let records = stmt
            .query_map([], |row| self.row_to_record(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Helper to convert a row to a StoredPriceRecord
    fn row_to_record(&self, row: &rusqlite::Row) -> rusqlite::Result<StoredPriceRecord> {
        Ok(StoredPriceRecord {
            row_id: row.get(0)?,
            id: row.get(1)?,
            create_date: row.get(2)?,
            name: row.get(3)?,
            category: row.get(4)?,
            price: row.get(5)?,
        })
    }
}

fn aggregates_in(conn: &Connection) -> Result<ImportResult> {
    let (items, categories): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT category) FROM prices",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut stmt = conn.prepare("SELECT price FROM prices")?;
    let mut rows = stmt.query([])?;
    let mut total_price = Decimal::ZERO;
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        total_price = total_price
            .checked_add(parse_decimal(&text)?)
            .ok_or_else(|| Error::InvalidPrice(format!("sum overflows at {}", text)))?;
    }

    Ok(ImportResult {
        total_items: items as u64,
        total_categories: categories as u64,
        total_price,
    })
}

fn parse_decimal(text: &str) -> Result<Decimal> {
    Decimal::from_str_exact(text).map_err(|_| Error::InvalidPrice(text.to_string()))
}

/// A lock wait that ran out is reported as a missed deadline.
pub fn busy_as_timeout(err: Error) -> Error {
    match err {
        Error::Persistence(ref e) if e.sqlite_error_code() == Some(ErrorCode::DatabaseBusy) => {
            Error::Timeout
        }
        other => other,
    }
}

fn check_deadline(deadline: Option<Instant>) -> Result<()> {
    match deadline {
        Some(at) if Instant::now() >= at => Err(Error::Timeout),
        _ => Ok(()),
    }
}
