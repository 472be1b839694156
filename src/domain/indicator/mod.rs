//! Technical indicators for the crossover strategy.
//!
//! - `sma`: streaming simple moving average and its batch series form
//! - `crossover`: sign-change detection between a short and a long average
//!
//! Indicator values are `Option<f64>`: `None` while the lookback window is
//! still filling.

pub mod crossover;
pub mod sma;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub period: usize,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(|p| p.value)
    }

    /// Number of leading points without a value.
    pub fn warmup(&self) -> usize {
        self.values.iter().take_while(|p| p.value.is_none()).count()
    }
}

impl fmt::Display for IndicatorSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SMA({})", self.period)
    }
}
