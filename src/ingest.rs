//! CSV ingestion: header plus lazily-read data rows.
//!
//! The first record of the stream is the header. Every later record is a
//! data row aligned to the header by position. Rows may be shorter or
//! longer than the header; [`zip_shortest`] pairs cells with header names
//! up to the shorter of the two. Empty lines and rows of empty cells are
//! skipped.
//!
//! The stream must decode as UTF-8 (a leading byte-order mark is dropped).
//! A decode failure surfaces as [`HitError::Decode`] from the iterator and
//! callers are expected to abandon the whole import.

use crate::error::{HitError, HitResult};
use crate::types::FieldMap;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A parsed CSV header and the not-yet-read data rows behind it.
///
/// Single pass: once iterated, the rows are gone. Re-open the source to
/// read them again.
pub struct CsvRecords<R: Read> {
    header: Vec<String>,
    records: csv::StringRecordsIntoIter<BufReader<R>>,
    blank_rows: usize,
}

impl<R: Read> CsvRecords<R> {
    /// Consume the header row from `reader`.
    ///
    /// An empty stream yields an empty header and no rows.
    pub fn parse(reader: R) -> HitResult<Self> {
        let mut buffered = BufReader::new(reader);
        if buffered.fill_buf()?.starts_with(UTF8_BOM) {
            buffered.consume(UTF8_BOM.len());
        }

        let mut records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(buffered)
            .into_records();

        let header = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => Vec::new(),
        };

        Ok(Self {
            header,
            records,
            blank_rows: 0,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of rows skipped so far because every cell was empty (`,,`).
    ///
    /// Lines with no cells at all never reach this iterator; the CSV reader
    /// drops them, so they are not counted.
    pub fn blank_rows(&self) -> usize {
        self.blank_rows
    }

    /// Turn the remaining rows into header-keyed records.
    pub fn into_field_maps(self) -> impl Iterator<Item = HitResult<FieldMap>> {
        let header = self.header.clone();
        self.map(move |row| row.map(|cells| zip_shortest(&header, &cells)))
    }
}

impl<R: Read> Iterator for CsvRecords<R> {
    type Item = HitResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(err) => return Some(Err(HitError::from(err))),
            };

            if record.iter().all(str::is_empty) {
                self.blank_rows += 1;
                continue;
            }

            return Some(Ok(record.iter().map(str::to_string).collect()));
        }
    }
}

/// Pair header names with row cells by position, stopping at the shorter.
///
/// A short row produces a record without its trailing keys; cells past the
/// end of the header are dropped. Repeated header names keep the last cell.
pub fn zip_shortest(header: &[String], row: &[String]) -> FieldMap {
    header
        .iter()
        .zip(row.iter())
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect()
}

/// Open a CSV file for ingestion, decompressing `.gz` files on the fly.
pub fn open_csv_file(path: &Path) -> HitResult<Box<dyn Read>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}
