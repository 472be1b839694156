//! Ordered, immutable price history for one instrument.

use chrono::NaiveDate;

use super::error::MacrossError;
use super::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    code: String,
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    /// Build a series, rejecting empty input, non-increasing dates and
    /// non-positive prices. Date gaps are kept as they are.
    pub fn new(code: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, MacrossError> {
        let code = code.into();
        if bars.is_empty() {
            return Err(MacrossError::NoData { code });
        }

        if let Some(bad) = bars.iter().find(|b| !b.has_valid_prices()) {
            return Err(MacrossError::Data {
                reason: format!("{} has a non-positive or non-finite price on {}", code, bad.date),
            });
        }

        if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(MacrossError::Data {
                reason: format!(
                    "{} dates must be strictly increasing ({} followed by {})",
                    code, w[0].date, w[1].date
                ),
            });
        }

        Ok(Self { code, bars })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&OhlcvBar> {
        self.bars.get(index)
    }

    /// Always `Some` for a series built through [`PriceSeries::new`].
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Fail fast when the series is shorter than `minimum` bars.
    pub fn require_bars(&self, minimum: usize) -> Result<(), MacrossError> {
        if self.bars.len() < minimum {
            return Err(MacrossError::InsufficientData {
                code: self.code.clone(),
                bars: self.bars.len(),
                minimum,
            });
        }
        Ok(())
    }
}
