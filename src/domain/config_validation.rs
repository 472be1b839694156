//! Configuration validation.
//!
//! Runs before any simulation work; every violation is reported as
//! `ConfigInvalid` naming the INI section and key it came from.

use chrono::NaiveDate;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::MacrossError;

pub fn validate_config(config: &BacktestConfig) -> Result<(), MacrossError> {
    validate_periods(config.short_period, config.long_period)?;
    validate_position_size(config.position_size)?;
    validate_initial_cash(config.initial_cash)?;
    validate_commission_rate(config.commission_rate)?;
    validate_risk_free_rate(config.risk_free_rate)?;
    validate_annualization_factor(config.annualization_factor)?;
    Ok(())
}

/// Read a raw period value, rejecting anything below 1.
pub fn validate_period(key: &str, raw: i64) -> Result<usize, MacrossError> {
    if raw < 1 {
        return Err(MacrossError::invalid(
            "strategy",
            key,
            format!("{} must be at least 1 (got {})", key, raw),
        ));
    }
    usize::try_from(raw).map_err(|_| MacrossError::invalid("strategy", key, "period is too large"))
}

fn validate_periods(short_period: usize, long_period: usize) -> Result<(), MacrossError> {
    if short_period < 1 {
        return Err(MacrossError::invalid(
            "strategy",
            "short_period",
            "short_period must be at least 1",
        ));
    }
    if long_period < 1 {
        return Err(MacrossError::invalid(
            "strategy",
            "long_period",
            "long_period must be at least 1",
        ));
    }
    if short_period >= long_period {
        return Err(MacrossError::invalid(
            "strategy",
            "short_period",
            format!(
                "short_period ({}) must be less than long_period ({})",
                short_period, long_period
            ),
        ));
    }
    Ok(())
}

fn validate_position_size(value: f64) -> Result<(), MacrossError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(MacrossError::invalid(
            "strategy",
            "position_size",
            "position_size must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_initial_cash(value: f64) -> Result<(), MacrossError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(MacrossError::invalid(
            "backtest",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_commission_rate(value: f64) -> Result<(), MacrossError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(MacrossError::invalid(
            "backtest",
            "commission_rate",
            "commission_rate must be non-negative",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(value: f64) -> Result<(), MacrossError> {
    if !(0.0..1.0).contains(&value) {
        return Err(MacrossError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_annualization_factor(value: f64) -> Result<(), MacrossError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(MacrossError::invalid(
            "backtest",
            "annualization_factor",
            "annualization_factor must be positive",
        ));
    }
    Ok(())
}

/// Parse an optional `YYYY-MM-DD` value from the `[data]` section.
pub fn parse_date(value: Option<&str>, key: &str) -> Result<Option<NaiveDate>, MacrossError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                MacrossError::invalid(
                    "data",
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

pub fn validate_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), MacrossError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(MacrossError::invalid(
                "data",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}
