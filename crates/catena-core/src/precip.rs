//! Series-mode precipitation CSV reader.
//!
//! Expected columns: timestamp, precipitation depth (mm). A header row is
//! auto-detected: if the first row's timestamp field does not parse, it is
//! treated as a header and skipped. Reading is synchronous and completes
//! once, before the evolution loop starts.

use crate::driver::PrecipRecord;
use crate::error::{EvolutionError, Result};
use chrono::NaiveDateTime;
use std::io;
use std::path::Path;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
}

/// Read a precipitation record from a CSV file.
pub fn read_precipitation(path: &Path) -> Result<Vec<PrecipRecord>> {
    let file = std::fs::File::open(path).map_err(|e| {
        EvolutionError::Input(format!("cannot open precipitation file {}: {e}", path.display()))
    })?;
    parse_precipitation(file)
}

/// Parse a precipitation record from any reader.
pub fn parse_precipitation(reader: impl io::Read) -> Result<Vec<PrecipRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (row, entry) in csv_reader.records().enumerate() {
        let entry = entry
            .map_err(|e| EvolutionError::Input(format!("precipitation row {}: {e}", row + 1)))?;
        if entry.len() < 2 {
            return Err(EvolutionError::Input(format!(
                "precipitation row {}: expected 2 columns, got {}",
                row + 1,
                entry.len()
            )));
        }

        let timestamp = match parse_timestamp(&entry[0]) {
            Some(t) => t,
            // Header auto-detection: only the first row may fail to parse.
            None if row == 0 => continue,
            None => {
                return Err(EvolutionError::Input(format!(
                    "precipitation row {}: unparseable timestamp `{}`",
                    row + 1,
                    &entry[0]
                )));
            }
        };

        let precip_mm: f64 = entry[1].parse().map_err(|_| {
            EvolutionError::Input(format!(
                "precipitation row {}: unparseable depth `{}`",
                row + 1,
                &entry[1]
            ))
        })?;
        if !precip_mm.is_finite() || precip_mm < 0.0 {
            return Err(EvolutionError::Input(format!(
                "precipitation row {}: depth {precip_mm} must be finite and non-negative",
                row + 1
            )));
        }

        records.push(PrecipRecord { timestamp, precip_mm });
    }

    if records.is_empty() {
        return Err(EvolutionError::Input(
            "precipitation file contains no data rows".to_string(),
        ));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_headerless_csv() {
        let csv = "2020-01-01 00:00:00,15.0\n2020-01-01 00:30:00,5.5\n";
        let records = parse_precipitation(Cursor::new(csv)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].precip_mm, 5.5);
    }

    #[test]
    fn header_row_is_auto_detected() {
        let csv = "timestamp,precipitation_mm\n2020-01-01 00:00,15.0\n";
        let records = parse_precipitation(Cursor::new(csv)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].precip_mm, 15.0);
    }

    #[test]
    fn iso_t_separator_accepted() {
        let csv = "2020-01-01T06:00:00,2.0\n";
        let records = parse_precipitation(Cursor::new(csv)).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn bad_timestamp_mid_file_is_an_error() {
        let csv = "2020-01-01 00:00,1.0\nnot-a-date,2.0\n";
        let err = parse_precipitation(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, EvolutionError::Input(_)), "got {err}");
    }

    #[test]
    fn negative_depth_rejected() {
        let csv = "2020-01-01 00:00,-3.0\n";
        assert!(parse_precipitation(Cursor::new(csv)).is_err());
    }

    #[test]
    fn header_only_file_rejected() {
        let csv = "timestamp,precipitation_mm\n";
        assert!(parse_precipitation(Cursor::new(csv)).is_err());
    }
}
