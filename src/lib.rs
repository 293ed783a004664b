//! # Pricepipe - Price list import/export pipeline
//!
//! Pricepipe ingests an archive holding a CSV price list, normalizes the rows and
//! loads them into a relational store, and re-exports the stored rows as a fresh
//! archive.
//!
//! Pricepipe provides:
//! - Archive extraction for zip and tar (optionally gzip-wrapped) uploads
//! - CSV parsing with header detection and positional column inference
//! - Transactional load with store-wide aggregate recompute
//! - Deterministic CSV/zip export of the stored rows

pub mod record;
pub mod archive;
pub mod parser;
pub mod storage;
pub mod export;
pub mod service;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use record::{PriceRow, StoredPriceRecord, ImportResult};
pub use archive::{ArchiveKind, ArchiveReader, extract};
pub use parser::{ColumnLayout, parse};
pub use storage::SqliteStore;
pub use export::build_export;
pub use service::PriceService;
pub use config::PricepipeConfig;

/// Result type alias for Pricepipe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Pricepipe operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported archive type: {0}")]
    UnsupportedArchiveType(String),

    #[error("archive read error: {0}")]
    ArchiveRead(String),

    #[error("csv file not found in archive")]
    CsvNotFound,

    #[error("empty csv")]
    EmptyInput,

    #[error("read csv: {0}")]
    MalformedCsv(String),

    #[error("invalid id {0:?}")]
    InvalidId(String),

    #[error("invalid create_date {0:?}")]
    InvalidDate(String),

    #[error("empty price")]
    EmptyPrice,

    #[error("invalid price {0:?}")]
    InvalidPrice(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("request deadline exceeded")]
    Timeout,

    #[error("upload too large: {size} bytes exceeds limit of {limit} bytes")]
    UploadTooLarge { size: u64, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure was caused by the uploaded content rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedArchiveType(_)
                | Error::ArchiveRead(_)
                | Error::CsvNotFound
                | Error::EmptyInput
                | Error::MalformedCsv(_)
                | Error::InvalidId(_)
                | Error::InvalidDate(_)
                | Error::EmptyPrice
                | Error::InvalidPrice(_)
                | Error::UploadTooLarge { .. }
        )
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => Error::Io(e),
            _ => Error::MalformedCsv(reason),
        }
    }
}
