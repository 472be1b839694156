//! Crossover of a short and a long moving average.
//!
//! Up   (+1): short[i-1] <= long[i-1] and short[i] > long[i]
//! Down (-1): short[i-1] >= long[i-1] and short[i] < long[i]
//! None  (0): anything else, including any bar where either average is
//! undefined at i or i-1.
//!
//! Averages within [`TIE_TOLERANCE`] of each other, relative to their
//! magnitude, compare equal, so rounding in the running sums cannot fire a
//! cross on a flat run.

use std::cmp::Ordering;
use std::fmt;

use crate::domain::indicator::sma::RollingSma;
use crate::domain::indicator::IndicatorSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    Up,
    Down,
    #[default]
    None,
}

impl Signal {
    pub fn value(self) -> i8 {
        match self {
            Signal::Up => 1,
            Signal::Down => -1,
            Signal::None => 0,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

pub const TIE_TOLERANCE: f64 = 1e-12;

/// Order `short` against `long`, treating near-equal averages as equal.
pub fn compare_averages(short: f64, long: f64) -> Ordering {
    if (short - long).abs() <= TIE_TOLERANCE * short.abs().max(long.abs()) {
        Ordering::Equal
    } else {
        short.partial_cmp(&long).unwrap_or(Ordering::Equal)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossoverDetector {
    prev: Option<Ordering>,
}

impl CrossoverDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, short: Option<f64>, long: Option<f64>) -> Signal {
        let (Some(short), Some(long)) = (short, long) else {
            self.prev = None;
            return Signal::None;
        };

        let now = compare_averages(short, long);
        let signal = match (self.prev, now) {
            (Some(prev), Ordering::Greater) if prev != Ordering::Greater => Signal::Up,
            (Some(prev), Ordering::Less) if prev != Ordering::Less => Signal::Down,
            _ => Signal::None,
        };

        self.prev = Some(now);
        signal
    }
}

pub fn calculate_crossover(short: &IndicatorSeries, long: &IndicatorSeries) -> Vec<Signal> {
    let mut detector = CrossoverDetector::new();
    (0..short.values.len().min(long.values.len()))
        .map(|i| detector.update(short.value_at(i), long.value_at(i)))
        .collect()
}

/// One bar's output from [`CrossoverIndicator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverReading {
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub signal: Signal,
}

/// Both averages plus the detector, fed one close at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossoverIndicator {
    short: RollingSma,
    long: RollingSma,
    detector: CrossoverDetector,
}

impl CrossoverIndicator {
    pub fn new(short_period: usize, long_period: usize) -> Self {
        Self {
            short: RollingSma::new(short_period),
            long: RollingSma::new(long_period),
            detector: CrossoverDetector::new(),
        }
    }

    pub fn update(&mut self, close: f64) -> CrossoverReading {
        let sma_short = self.short.update(close);
        let sma_long = self.long.update(close);
        let signal = self.detector.update(sma_short, sma_long);
        CrossoverReading {
            sma_short,
            sma_long,
            signal,
        }
    }
}
