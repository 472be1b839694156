//! Simple Moving Average.
//!
//! SMA(n)[i] = (C[i] + C[i-1] + ... + C[i-n+1]) / n
//! Warmup: first (n-1) bars have no value.
//!
//! Computed incrementally: a running sum over a fixed-size window, so each
//! update is O(1) regardless of the period. The sum is Neumaier-compensated
//! so adding and removing closes does not drift over long series.

use std::collections::VecDeque;

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq)]
pub struct RollingSma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    compensation: f64,
}

impl RollingSma {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            compensation: 0.0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Push the next close and return the average once the window is full.
    /// A period of 0 never produces a value.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }

        self.window.push_back(close);
        self.accumulate(close);
        if self.window.len() > self.period {
            if let Some(leaving) = self.window.pop_front() {
                self.accumulate(-leaving);
            }
        }

        self.current()
    }

    fn accumulate(&mut self, x: f64) {
        let total = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - total) + x;
        } else {
            self.compensation += (x - total) + self.sum;
        }
        self.sum = total;
    }

    pub fn current(&self) -> Option<f64> {
        if self.period > 0 && self.window.len() == self.period {
            Some((self.sum + self.compensation) / self.period as f64)
        } else {
            None
        }
    }
}

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut sma = RollingSma::new(period);
    let values = bars
        .iter()
        .map(|bar| IndicatorPoint {
            date: bar.date,
            value: sma.update(bar.close),
        })
        .collect();

    IndicatorSeries { period, values }
}
