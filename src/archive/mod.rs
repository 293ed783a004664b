//! Archive Extractor
//!
//! Locates the CSV payload inside an uploaded archive. Each container format
//! provides an [`ArchiveReader`]; they share one selection policy:
//! an entry whose base name is `data.csv` (any case, any directory depth) wins,
//! otherwise the first entry whose base name ends in `.csv`.

pub mod tar;
pub mod zip;

pub use self::tar::TarReader;
pub use self::zip::ZipReader;

use crate::{Error, Result};
use std::str::FromStr;

/// Base name of the preferred CSV entry.
pub const PREFERRED_CSV_NAME: &str = "data.csv";

/// Trait for archive readers
///
/// Readers never mutate the input; the payload is returned as an owned copy.
pub trait ArchiveReader: Send + Sync {
    /// Format name (for logging)
    fn format_name(&self) -> &str;

    /// Find and read the CSV payload
    fn find_csv_payload(&self, raw: &[u8]) -> Result<Vec<u8>>;
}

/// Supported archive formats, selected by the request's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArchiveKind {
    #[default]
    Zip,
    /// Plain or gzip-wrapped tar
    Tar,
}

impl ArchiveKind {
    /// Resolve a type tag. Case-insensitive; an empty tag means zip.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "zip" => Ok(ArchiveKind::Zip),
            "tar" => Ok(ArchiveKind::Tar),
            _ => Err(Error::UnsupportedArchiveType(tag.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::Tar => "tar",
        }
    }

    /// Reader implementing this format
    pub fn reader(&self) -> Box<dyn ArchiveReader> {
        match self {
            ArchiveKind::Zip => Box::new(ZipReader),
            ArchiveKind::Tar => Box::new(TarReader),
        }
    }
}

impl FromStr for ArchiveKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ArchiveKind::from_tag(s)
    }
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the CSV payload from `raw` using the reader selected by `archive_type`.
pub fn extract(archive_type: &str, raw: &[u8]) -> Result<Vec<u8>> {
    let kind = ArchiveKind::from_tag(archive_type)?;
    let reader = kind.reader();
    let payload = reader.find_csv_payload(raw)?;
    tracing::debug!(
        "Extracted {} byte CSV payload from {} byte {} archive",
        payload.len(),
        raw.len(),
        reader.format_name()
    );
    Ok(payload)
}

/// How an archive entry relates to the CSV selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryMatch {
    /// Base name is exactly `data.csv`
    Preferred,
    /// Some other `.csv` file
    Candidate,
    Other,
}

/// Lowercased final path component, ignoring directories and trailing separators.
pub(crate) fn entry_base_name(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches(['/', '\\']);
    let base = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    base.to_lowercase()
}

pub(crate) fn classify_entry(name: &str) -> EntryMatch {
    let base = entry_base_name(name);
    if base == PREFERRED_CSV_NAME {
        EntryMatch::Preferred
    } else if base.ends_with(".csv") {
        EntryMatch::Candidate
    } else {
        EntryMatch::Other
    }
}
