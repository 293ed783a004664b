//! Tar reader
//!
//! Tar is a forward-only stream: an entry can only be read while the cursor is
//! on it. The first `.csv` entry is therefore buffered as a fallback while the
//! scan continues, and a later `data.csv` replaces it.

use std::io::Read;

use flate2::read::MultiGzDecoder;

use super::{ArchiveReader, EntryMatch, classify_entry};
use crate::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reads the CSV payload out of a tar or tar.gz archive
#[derive(Debug, Default, Clone, Copy)]
pub struct TarReader;

/// Check for gzip framing
pub fn is_gzip(raw: &[u8]) -> bool {
    raw.len() >= 2 && raw[..2] == GZIP_MAGIC
}

impl ArchiveReader for TarReader {
    fn format_name(&self) -> &str {
        "tar"
    }

    fn find_csv_payload(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let stream: Box<dyn Read + '_> = if is_gzip(raw) {
            tracing::debug!("Detected gzip framing on tar upload");
            // Concatenated gzip members decode as one stream.
            Box::new(MultiGzDecoder::new(raw))
        } else {
            Box::new(raw)
        };

        let mut archive = ::tar::Archive::new(stream);
        let entries = archive
            .entries()
            .map_err(|e| Error::ArchiveRead(format!("read tar: {}", e)))?;

        let mut fallback: Option<Vec<u8>> = None;
        for entry in entries {
            let mut entry = entry.map_err(|e| Error::ArchiveRead(format!("read tar: {}", e)))?;
            if entry.header().entry_type().is_dir() {
                continue;
            }

            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            match classify_entry(&name) {
                EntryMatch::Preferred => {
                    tracing::debug!("Selected tar entry {:?}", name);
                    return read_entry(&mut entry, &name);
                }
                EntryMatch::Candidate if fallback.is_none() => {
                    fallback = Some(read_entry(&mut entry, &name)?);
                }
                _ => {}
            }
        }

        fallback.ok_or(Error::CsvNotFound)
    }
}

fn read_entry(entry: &mut impl Read, name: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    entry
        .read_to_end(&mut buf)
        .map_err(|e| Error::ArchiveRead(format!("read {} from tar: {}", name, e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = ::tar::Builder::new(Vec::new());
        for (name, body) in entries {
            let mut header = ::tar::Header::new_gnu();
            if name.ends_with('/') {
                header.set_entry_type(::tar::EntryType::Directory);
                header.set_size(0);
            } else {
                header.set_size(body.len() as u64);
            }
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *body).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(raw: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(raw).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_gzip_magic() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip(&[0x1f]));
        assert!(!is_gzip(b"PK\x03\x04"));
    }

    #[test]
    fn test_later_data_csv_overrides_fallback() {
        let raw = build_tar(&[
            ("exports/", b""),
            ("exports/first.csv", b"fallback"),
            ("exports/deep/DATA.csv", b"wanted"),
        ]);
        assert_eq!(TarReader.find_csv_payload(&raw).unwrap(), b"wanted");
    }

    #[test]
    fn test_first_csv_when_no_data_csv() {
        let raw = build_tar(&[
            ("notes.txt", b"ignore me"),
            ("one.csv", b"first"),
            ("two.csv", b"second"),
        ]);
        assert_eq!(TarReader.find_csv_payload(&raw).unwrap(), b"first");
    }

    #[test]
    fn test_gzipped_tar_is_transparent() {
        let raw = gzip(&build_tar(&[("data.csv", b"compressed payload")]));
        assert_eq!(TarReader.find_csv_payload(&raw).unwrap(), b"compressed payload");
    }

    #[test]
    fn test_multi_member_gzip() {
        let tar = build_tar(&[("notes.txt", b"skip"), ("data.csv", b"second member")]);
        let (head, tail) = tar.split_at(512);
        let mut raw = gzip(head);
        raw.extend_from_slice(&gzip(tail));
        assert_eq!(TarReader.find_csv_payload(&raw).unwrap(), b"second member");
    }

    #[test]
    fn test_no_csv_entry() {
        let raw = build_tar(&[("readme.md", b"# hi")]);
        assert!(matches!(TarReader.find_csv_payload(&raw), Err(Error::CsvNotFound)));
    }

    #[test]
    fn test_garbage_header_is_read_error() {
        let raw = vec![b'A'; 1024];
        assert!(matches!(TarReader.find_csv_payload(&raw), Err(Error::ArchiveRead(_))));
    }
}
