//! Export Builder
//!
//! Serializes stored records back to CSV and packs the CSV as `data.csv` in an
//! in-memory zip archive.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::archive::PREFERRED_CSV_NAME;
use crate::record::{DATE_FORMAT, StoredPriceRecord};
use crate::{Error, Result};

/// Header row written on every export
pub const EXPORT_HEADER: [&str; 5] = ["id", "name", "category", "price", "create_date"];

/// Download file name for the export archive
pub const EXPORT_FILE_NAME: &str = "prices.zip";

/// Serialize records to CSV bytes.
pub fn build_csv(records: &[StoredPriceRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;
    for rec in records {
        writer.write_record([
            rec.id.to_string(),
            rec.name.clone(),
            rec.category.clone(),
            rec.price.clone(),
            rec.create_date.format(DATE_FORMAT).to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

/// Build the export archive: a zip with one `data.csv` entry.
pub fn build_export(records: &[StoredPriceRecord]) -> Result<Vec<u8>> {
    let csv_bytes = build_csv(records)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    zip.start_file(PREFERRED_CSV_NAME, options)
        .map_err(std::io::Error::other)?;
    zip.write_all(&csv_bytes)?;
    let archive = zip
        .finish()
        .map_err(std::io::Error::other)?
        .into_inner();

    tracing::info!(
        "Built export archive: {} records, {} bytes",
        records.len(),
        archive.len()
    );
    Ok(archive)
}
