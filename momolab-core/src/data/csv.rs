//! CSV bar files: `timestamp,open,high,low,close,volume`.
//!
//! Timestamps may be RFC 3339, `YYYY-MM-DD HH:MM:SS` (read as UTC), or
//! integer Unix seconds.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::domain::Bar;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unparsable timestamp {value:?}")]
    Timestamp { row: usize, value: String },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Symbol implied by a bar file: its stem, upper-cased.
pub fn symbol_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
}

pub fn load_bars_csv(path: &Path, symbol: &str) -> Result<Vec<Bar>, CsvError> {
    let file = std::fs::File::open(path).map_err(|source| CsvError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_bars_csv(file, symbol)
}

pub fn read_bars_csv<R: Read>(reader: R, symbol: &str) -> Result<Vec<Bar>, CsvError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut bars = Vec::new();
    for (row, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let r = record?;
        let timestamp = parse_timestamp(&r.timestamp).ok_or_else(|| CsvError::Timestamp {
            row: row + 1,
            value: r.timestamp.clone(),
        })?;
        let volume = if r.volume.is_finite() && r.volume > 0.0 {
            r.volume.round() as u64
        } else {
            0
        };
        bars.push(Bar::new(symbol, timestamp, r.open, r.high, r.low, r.close, volume));
    }
    Ok(bars)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    text.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
timestamp,open,high,low,close,volume
2025-08-29T13:30:00Z,100.0,100.5,99.5,100.2,1200
2025-08-29 13:31:00,100.2,100.9,100.1,100.8,900.4
1756474320,100.8,101.0,100.6,100.7,0
";

    #[test]
    fn reads_all_timestamp_forms() {
        let bars = read_bars_csv(SAMPLE.as_bytes(), "WMT").unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].symbol, "WMT");
        assert_eq!(bars[1].timestamp - bars[0].timestamp, chrono::Duration::minutes(1));
        assert_eq!(bars[2].timestamp - bars[1].timestamp, chrono::Duration::minutes(1));
        assert_eq!(bars[1].volume, 900);
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let text = "timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n";
        match read_bars_csv(text.as_bytes(), "X") {
            Err(CsvError::Timestamp { row, value }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_price_column_is_csv_error() {
        let text = "timestamp,open,high\n2025-08-29T13:30:00Z,1,2\n";
        assert!(matches!(
            read_bars_csv(text.as_bytes(), "X"),
            Err(CsvError::Csv(_))
        ));
    }

    #[test]
    fn symbol_from_file_stem() {
        assert_eq!(
            symbol_from_path(Path::new("/data/wmt.csv")).as_deref(),
            Some("WMT")
        );
    }
}
