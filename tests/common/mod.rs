//! Archive fixtures shared by the integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const SAMPLE_CSV: &str = "id,name,category,price,create_date\n\
1,Widget,Tools,9.99,2024-01-01\n\
2,Gadget,Tools,\"19,99\",2024-01-02\n\
3,Apple,Food,0.50,2024-01-03\n";

pub fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn tar_gz_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, body) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, body.as_bytes()).unwrap();
    }
    let tar = builder.into_inner().unwrap();

    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&tar).unwrap();
    enc.finish().unwrap()
}

/// Headerless CSV with `count` rows starting at `first_id`.
pub fn batch_csv(first_id: i64, count: i64, category: &str) -> String {
    (first_id..first_id + count)
        .map(|id| format!("{},item-{},{},1.25,2024-02-01\n", id, id, category))
        .collect()
}

/// Hold the database write lock from another connection for `hold`.
///
/// Returns once the lock is taken; join the handle to wait for its release.
pub fn hold_write_lock(path: PathBuf, hold: Duration) -> JoinHandle<()> {
    let (locked_tx, locked_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let conn = rusqlite::Connection::open(path).unwrap();
        conn.execute_batch("BEGIN IMMEDIATE").unwrap();
        locked_tx.send(()).unwrap();
        thread::sleep(hold);
        conn.execute_batch("COMMIT").unwrap();
    });
    locked_rx.recv().unwrap();
    handle
}
