//! Price data access port trait.

use crate::domain::error::MacrossError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `code` in date order, limited to the inclusive window when
    /// bounds are given.
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, MacrossError>;
}
