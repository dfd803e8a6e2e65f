//! CSV parsing into import records.
//!
//! Headers are matched case-insensitively after trimming. Only the first
//! four columns are read; anything to the right is ignored. A leading UTF-8
//! BOM is dropped, since spreadsheet exports routinely add one.

use docport_core::Record;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const MAX_COLUMNS: usize = 4;

const PRODUCT: &str = "product";
const NUMBER: &str = "number";
const DESCRIPTION: &str = "description";
const VERBAL_DISCLAIMER: &str = "verbal disclaimer";

/// Errors reading a CSV file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The file could not be read.
    #[error("failed to read CSV file {}: {source}", .path.display())]
    Io {
        /// The CSV path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The header row is missing or unreadable.
    #[error("failed to read CSV headers: {0}")]
    Headers(csv::Error),

    /// A data row is unreadable.
    #[error("failed to read CSV row {row}: {source}")]
    Row {
        /// 1-based line of the row, header included.
        row: u64,
        /// Parser error.
        source: csv::Error,
    },
}

#[derive(Debug, Default)]
struct Columns {
    product: Option<usize>,
    number: Option<usize>,
    description: Option<usize>,
    verbal_disclaimer: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Self {
        let mut columns = Self::default();
        for (idx, header) in headers.iter().take(MAX_COLUMNS).enumerate() {
            let normalized = header.trim().to_lowercase();
            debug!(column = idx, header, normalized = %normalized, "csv header");
            let slot = match normalized.as_str() {
                PRODUCT => &mut columns.product,
                NUMBER => &mut columns.number,
                DESCRIPTION => &mut columns.description,
                VERBAL_DISCLAIMER => &mut columns.verbal_disclaimer,
                _ => continue,
            };
            // Last duplicate wins.
            *slot = Some(idx);
        }
        columns
    }

    fn missing(&self) -> Vec<&'static str> {
        [
            (self.product, "product (for field Product)"),
            (self.number, "number (for field Number)"),
            (self.description, "description (for field Description)"),
            (self.verbal_disclaimer, "verbal disclaimer (for field DisclaimerVerbiage)"),
        ]
        .into_iter()
        .filter(|(idx, _)| idx.is_none())
        .map(|(_, name)| name)
        .collect()
    }

    fn record(&self, row: &csv::StringRecord) -> Record {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        Record {
            product: cell(self.product),
            number: cell(self.number),
            description: cell(self.description),
            verbal_disclaimer: cell(self.verbal_disclaimer),
            auto_select: String::new(),
        }
    }
}

/// Reads and parses a CSV file.
pub fn parse_file(path: &Path) -> Result<Vec<Record>, CsvError> {
    let data = fs::read(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bytes(&data)
}

/// Parses CSV content.
pub fn parse_bytes(data: &[u8]) -> Result<Vec<Record>, CsvError> {
    let data = match data.strip_prefix(BOM) {
        Some(rest) => {
            info!("BOM detected and removed from CSV file");
            rest
        }
        None => data,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader.headers().map_err(CsvError::Headers)?.clone();
    if headers.len() > MAX_COLUMNS {
        warn!(
            columns = headers.len(),
            "CSV has more than {MAX_COLUMNS} columns, only processing the first {MAX_COLUMNS}"
        );
    }

    let columns = Columns::locate(&headers);
    let missing = columns.missing();
    if !missing.is_empty() {
        warn!(?missing, "missing expected columns, affected fields will be empty");
    }

    let mut records = Vec::new();
    let mut row = csv::StringRecord::new();
    let mut line = 1u64;
    loop {
        line += 1;
        match reader.read_record(&mut row) {
            Ok(true) => records.push(columns.record(&row)),
            Ok(false) => break,
            Err(source) => return Err(CsvError::Row { row: line, source }),
        }
    }

    info!(records = records.len(), "parsed records from CSV");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_match_case_insensitively() {
        let csv = b"Product, NUMBER ,Description,Verbal Disclaimer\nWidget,A-1,Blue,Say it\n";
        let records = parse_bytes(csv).unwrap();
        assert_eq!(
            records,
            vec![Record {
                product: "Widget".into(),
                number: "A-1".into(),
                description: "Blue".into(),
                verbal_disclaimer: "Say it".into(),
                auto_select: String::new(),
            }]
        );
    }

    #[test]
    fn bom_is_stripped() {
        let mut csv = BOM.to_vec();
        csv.extend_from_slice(b"number,product\n7,thing\n");
        let records = parse_bytes(&csv).unwrap();
        assert_eq!(records[0].number, "7");
        assert_eq!(records[0].product, "thing");
    }

    #[test]
    fn only_first_four_columns_count() {
        let csv = b"extra,number,product,description,verbal disclaimer\nx,1,p,d,v\n";
        let records = parse_bytes(csv).unwrap();
        assert_eq!(records[0].number, "1");
        assert_eq!(records[0].description, "d");
        // Fifth column is beyond the limit.
        assert_eq!(records[0].verbal_disclaimer, "");
    }

    #[test]
    fn quoted_commas_and_short_rows() {
        let csv = b"product,number,description,verbal disclaimer\n\"a, b\",2,\"say \"\"hi\"\"\",\"x, y\"\nc,3\n";
        let records = parse_bytes(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product, "a, b");
        assert_eq!(records[0].description, "say \"hi\"");
        assert_eq!(records[0].verbal_disclaimer, "x, y");
        assert_eq!(records[1].number, "3");
        assert_eq!(records[1].description, "");
    }

    #[test]
    fn empty_number_is_kept_for_the_reconciler() {
        let records = parse_bytes(b"product,number\np,\n").unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_unkeyed());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_file(&dir.path().join("none.csv")).unwrap_err();
        assert!(matches!(err, CsvError::Io { .. }));
    }

    #[test]
    fn parse_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "Number,Product\n9,nine\n10,ten\n").unwrap();
        let records = parse_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].product, "ten");
    }
}
