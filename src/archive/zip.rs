//! Zip reader
//!
//! Zip has a central directory, so every entry name is known up front: the
//! preferred name is searched across all entries before any fallback is read.

use std::io::{Cursor, Read};

use ::zip::ZipArchive;

use super::{ArchiveReader, EntryMatch, classify_entry};
use crate::{Error, Result};

/// Reads the CSV payload out of a zip archive
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipReader;

impl ArchiveReader for ZipReader {
    fn format_name(&self) -> &str {
        "zip"
    }

    fn find_csv_payload(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(raw))
            .map_err(|e| Error::ArchiveRead(format!("open zip: {}", e)))?;

        // `file_names()` follows central directory order, matching `by_index`.
        let entries: Vec<(usize, EntryMatch)> = archive
            .file_names()
            .enumerate()
            .filter(|(_, name)| !name.ends_with('/'))
            .map(|(idx, name)| (idx, classify_entry(name)))
            .collect();

        let selected = entries
            .iter()
            .find(|(_, m)| *m == EntryMatch::Preferred)
            .or_else(|| entries.iter().find(|(_, m)| *m == EntryMatch::Candidate))
            .map(|(idx, _)| *idx)
            .ok_or(Error::CsvNotFound)?;

        read_entry(&mut archive, selected)
    }
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, idx: usize) -> Result<Vec<u8>> {
    let mut file = archive
        .by_index(idx)
        .map_err(|e| Error::ArchiveRead(format!("open file in zip: {}", e)))?;
    tracing::debug!("Selected zip entry {:?}", file.name());

    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|e| Error::ArchiveRead(format!("read csv from zip: {}", e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use ::zip::ZipWriter;
    use ::zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(::zip::CompressionMethod::Deflated);
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(body).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_prefers_data_csv_at_any_depth() {
        let raw = build_zip(&[
            ("first.csv", b"first"),
            ("nested/", b""),
            ("nested/Data.CSV", b"wanted"),
            ("last.csv", b"last"),
        ]);
        assert_eq!(ZipReader.find_csv_payload(&raw).unwrap(), b"wanted");
    }

    #[test]
    fn test_falls_back_to_first_csv() {
        let raw = build_zip(&[
            ("readme.txt", b"hello"),
            ("b/prices.csv", b"first csv"),
            ("a/other.csv", b"second csv"),
        ]);
        assert_eq!(ZipReader.find_csv_payload(&raw).unwrap(), b"first csv");
    }

    #[test]
    fn test_no_csv_entry() {
        let raw = build_zip(&[("readme.txt", b"hello"), ("data.csv.txt", b"nope")]);
        assert!(matches!(ZipReader.find_csv_payload(&raw), Err(Error::CsvNotFound)));
    }

    #[test]
    fn test_garbage_is_read_error() {
        let err = ZipReader.find_csv_payload(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, Error::ArchiveRead(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_input_left_untouched() {
        let raw = build_zip(&[("data.csv", b"1,a,b,2,2024-01-01")]);
        let before = raw.clone();
        let payload = ZipReader.find_csv_payload(&raw).unwrap();
        assert_eq!(raw, before);
        assert_eq!(payload, b"1,a,b,2,2024-01-01");
    }
}
