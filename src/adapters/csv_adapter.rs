//! CSV file data adapter.
//!
//! Columns are located by header name, case-insensitively, so both a plain
//! `date,open,high,low,close,volume` file and the wider layout written by
//! market-data downloaders (`Date,Open,High,Low,Close,Adj Close,Volume`) load
//! without configuration. `Adj Close` is ignored; a missing volume column
//! reads as 0.
//!
//! The adapter points either at one file or at a directory holding
//! `<CODE>.csv` files.

use crate::domain::error::MacrossError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const DATE_HEADERS: [&str; 4] = ["date", "datetime", "timestamp", "price"];

/// Leading rows some downloaders emit under the header row.
const METADATA_ROWS: [&str; 2] = ["ticker", "date"];

pub struct CsvAdapter {
    path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, MacrossError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| names.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| MacrossError::Data {
                reason: format!("missing {} column", name),
            })
        };

        let date = DATE_HEADERS
            .iter()
            .find_map(|&name| find(name))
            .ok_or_else(|| MacrossError::Data {
                reason: "missing date column".into(),
            })?;

        Ok(Columns {
            date,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
        })
    }
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{}.csv", code))
        } else {
            self.path.clone()
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // "2020-01-02 00:00:00-05:00" keeps only the calendar date
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_price(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<f64, MacrossError> {
    let raw = record.get(index).unwrap_or("");
    raw.parse::<f64>().map_err(|e| MacrossError::Data {
        reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
    })
}

fn parse_volume(
    record: &csv::StringRecord,
    index: Option<usize>,
    line: u64,
) -> Result<i64, MacrossError> {
    let raw = match index.and_then(|i| record.get(i)) {
        None | Some("") => return Ok(0),
        Some(raw) => raw,
    };
    raw.parse::<f64>()
        .map(|v| v.round() as i64)
        .map_err(|e| MacrossError::Data {
            reason: format!("line {}: invalid volume value '{}': {}", line, raw, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, MacrossError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| MacrossError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let columns = Columns::from_headers(rdr.headers()?)?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());

            let date_str = record.get(columns.date).unwrap_or("");
            let date = match parse_date(date_str) {
                Some(d) => d,
                None if bars.is_empty()
                    && METADATA_ROWS.contains(&date_str.to_lowercase().as_str()) =>
                {
                    continue;
                }
                None => {
                    return Err(MacrossError::Data {
                        reason: format!("line {}: invalid date '{}'", line, date_str),
                    });
                }
            };

            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }

            bars.push(OhlcvBar {
                date,
                open: parse_price(&record, columns.open, "open", line)?,
                high: parse_price(&record, columns.high, "high", line)?,
                low: parse_price(&record, columns.low, "low", line)?,
                close: parse_price(&record, columns.close, "close", line)?,
                volume: parse_volume(&record, columns.volume, line)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}
