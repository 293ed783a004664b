//! Request-scoped import/export pipeline
//!
//! `PriceService` holds only configuration. Every call opens its own store
//! connection, so calls are independent and may run concurrently on separate
//! workers; the store's transactions are the only coordination point.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::PricepipeConfig;
use crate::record::ImportResult;
use crate::storage::{self, SqliteStore};
use crate::{Error, Result, archive, export, parser};

#[derive(Debug, Clone)]
pub struct PriceService {
    database_path: PathBuf,
    max_upload_bytes: u64,
    request_timeout: Duration,
}

impl PriceService {
    pub fn new(database_path: impl Into<PathBuf>, max_upload_bytes: u64, request_timeout: Duration) -> Self {
        Self {
            database_path: database_path.into(),
            max_upload_bytes,
            request_timeout,
        }
    }

    pub fn from_config(config: &PricepipeConfig) -> Self {
        Self::new(
            config.database_path(),
            config.max_upload_bytes,
            config.request_timeout(),
        )
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Deadline for a request starting now
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.request_timeout
    }

    /// Reject uploads above the configured ceiling.
    pub fn check_upload_size(&self, size: usize) -> Result<()> {
        let size = size as u64;
        if size > self.max_upload_bytes {
            return Err(Error::UploadTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.database_path)
    }

    /// Run extract -> parse -> load under a fresh deadline.
    pub fn import(&self, archive_type: &str, raw: &[u8]) -> Result<ImportResult> {
        self.import_until(archive_type, raw, self.deadline())
    }

    /// Run extract -> parse -> load, aborting once `deadline` passes.
    ///
    /// Extraction and parse failures return before the store is touched.
    pub fn import_until(&self, archive_type: &str, raw: &[u8], deadline: Instant) -> Result<ImportResult> {
        self.check_upload_size(raw.len())?;

        let csv_bytes = archive::extract(archive_type, raw)?;
        let rows = parser::parse(&csv_bytes)?;
        tracing::debug!("Parsed {} rows from {} byte CSV", rows.len(), csv_bytes.len());

        if Instant::now() >= deadline {
            return Err(Error::Timeout);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let mut store = SqliteStore::open_with_busy_timeout(&self.database_path, remaining)
            .map_err(storage::busy_as_timeout)?;
        store.load_and_aggregate(&rows, Some(deadline))
    }

    /// Build the export archive from the current store contents.
    pub fn export(&self) -> Result<Vec<u8>> {
        let store = self.open_store()?;
        let records = store.all_records()?;
        export::build_export(&records)
    }

    /// Live store-wide totals
    pub fn totals(&self) -> Result<ImportResult> {
        self.open_store()?.aggregates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(dir: &tempfile::TempDir, max_upload_bytes: u64) -> PriceService {
        PriceService::new(dir.path().join("prices.db"), max_upload_bytes, Duration::from_secs(30))
    }

    #[test]
    fn test_oversized_upload_rejected_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir, 8);
        let err = svc.import("bogus-type", &[0u8; 9]).unwrap_err();
        assert!(matches!(err, Error::UploadTooLarge { size: 9, limit: 8 }));
    }

    #[test]
    fn test_bad_archive_never_opens_store() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir, 1024);
        assert!(svc.import("zip", b"garbage").is_err());
        assert!(!svc.database_path().exists());
    }

    #[test]
    fn test_expired_deadline_is_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir, 1 << 20);
        let archive = export::build_export(&[]).unwrap();
        let err = svc
            .import_until("zip", &archive, Instant::now() - Duration::from_millis(1))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }
}
