#![allow(dead_code)]

use chrono::NaiveDate;
use macross::domain::backtest::BacktestConfig;
use macross::domain::error::MacrossError;
pub use macross::domain::ohlcv::OhlcvBar;
use macross::domain::price_series::PriceSeries;
use macross::ports::data_port::DataPort;
use std::cell::RefCell;
use std::collections::HashMap;

/// Closes that cross up at index 5, down at 9 and up again at 13 with
/// periods 2/4.
pub const CROSSING_CLOSES: [f64; 15] = [
    10.0, 10.0, 10.0, 10.0, 10.0, 11.0, 12.0, 13.0, 12.0, 11.0, 10.0, 9.0, 10.0, 11.0, 12.0,
];

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub requests: RefCell<Vec<(String, Option<NaiveDate>, Option<NaiveDate>)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, MacrossError> {
        self.requests
            .borrow_mut()
            .push((code.to_string(), start_date, end_date));
        if let Some(reason) = self.errors.get(code) {
            return Err(MacrossError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(code).cloned().unwrap_or_default())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: date(date_str),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
    }
}

/// One bar per calendar day from 2024-01-01, opening `open_offset` away from
/// the close.
pub fn bars_from_closes(closes: &[f64], open_offset: f64) -> Vec<OhlcvBar> {
    let start = date("2024-01-01");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: close + open_offset,
            high: close.max(close + open_offset) + 1.0,
            low: close.min(close + open_offset) - 1.0,
            close,
            volume: 1000 + i as i64,
        })
        .collect()
}

pub fn series_from_closes(code: &str, closes: &[f64], open_offset: f64) -> PriceSeries {
    PriceSeries::new(code, bars_from_closes(closes, open_offset)).unwrap()
}

/// Deterministic zig-zag price path that produces several crossovers.
pub fn wave_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 10.0 * (t / 6.0).sin() + 0.05 * t
        })
        .collect()
}

pub fn small_config() -> BacktestConfig {
    BacktestConfig {
        short_period: 2,
        long_period: 4,
        initial_cash: 1_000.0,
        commission_rate: 0.0,
        printlog: false,
        ..Default::default()
    }
}
