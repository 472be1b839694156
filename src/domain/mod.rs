//! Core domain types and logic.

pub mod ohlcv;
pub mod price_series;
pub mod indicator;
pub mod position;
pub mod account;
pub mod execution;
pub mod event;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
