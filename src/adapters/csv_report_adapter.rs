//! CSV report adapter implementing ReportPort.
//!
//! Writes four files into the output directory:
//!
//! - `summary.csv`: `key,value` rows for the run parameters and metrics
//! - `trades.csv`: one row per closed trade
//! - `bars.csv`: per-bar close, averages, signal, position and equity
//! - `events.csv`: the trade event log
//!
//! Undefined values (warmup averages, N/A ratios) are written as empty cells.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MacrossError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;

pub const SUMMARY_FILE: &str = "summary.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const BARS_FILE: &str = "bars.csv";
pub const EVENTS_FILE: &str = "events.csv";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value
        .filter(|v| v.is_finite())
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_default()
}

fn summary_rows(result: &BacktestResult, metrics: &Metrics) -> Vec<(&'static str, String)> {
    let config = &result.config;
    let mut rows = vec![
        ("code", metrics.code.clone()),
        ("short_period", config.short_period.to_string()),
        ("long_period", config.long_period.to_string()),
        ("position_size", config.position_size.to_string()),
        ("commission_rate", config.commission_rate.to_string()),
        ("fill_timing", config.fill_timing.to_string()),
        ("bars", result.bars.len().to_string()),
        ("starting_cash", format!("{:.2}", metrics.starting_cash)),
        ("ending_equity", format!("{:.2}", metrics.ending_equity)),
        ("total_return_pct", format!("{:.4}", metrics.total_return_pct)),
        (
            "annualized_return_pct",
            format!("{:.4}", metrics.annualized_return_pct),
        ),
        ("sharpe_ratio", opt(metrics.sharpe_ratio, 4)),
        ("max_drawdown_pct", format!("{:.4}", metrics.max_drawdown_pct)),
        (
            "max_drawdown_duration",
            metrics.max_drawdown_duration.to_string(),
        ),
        ("total_trades", metrics.total_trades.to_string()),
        ("trades_won", metrics.trades_won.to_string()),
        ("trades_lost", metrics.trades_lost.to_string()),
        ("trades_breakeven", metrics.trades_breakeven.to_string()),
        ("open_trades", metrics.open_trades.to_string()),
        ("win_rate_pct", opt(metrics.win_rate_pct, 2)),
        ("profit_factor", opt(metrics.profit_factor, 4)),
        ("total_net_pnl", format!("{:.2}", metrics.total_net_pnl)),
        ("total_commission", format!("{:.2}", metrics.total_commission)),
        ("avg_win", format!("{:.2}", metrics.avg_win)),
        ("avg_loss", format!("{:.2}", metrics.avg_loss)),
        ("largest_win", format!("{:.2}", metrics.largest_win)),
        ("largest_loss", format!("{:.2}", metrics.largest_loss)),
        ("avg_holding_days", format!("{:.1}", metrics.avg_holding_days)),
    ];

    if let Some(position) = result.open_position() {
        rows.push(("open_quantity", position.quantity.to_string()));
        rows.push(("open_entry_price", format!("{:.4}", position.entry_price)));
        rows.push(("open_entry_date", position.entry_date.to_string()));
    }

    rows
}

fn write_summary(
    path: &Path,
    result: &BacktestResult,
    metrics: &Metrics,
) -> Result<(), MacrossError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["key", "value"])?;
    for (key, value) in summary_rows(result, metrics) {
        wtr.write_record([key, value.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_trades(path: &Path, result: &BacktestResult) -> Result<(), MacrossError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "entry_date",
        "exit_date",
        "quantity",
        "entry_price",
        "exit_price",
        "gross_pnl",
        "commission",
        "net_pnl",
        "holding_days",
    ])?;
    for trade in &result.account.closed_trades {
        wtr.write_record([
            trade.entry_date.to_string(),
            trade.exit_date.to_string(),
            trade.quantity.to_string(),
            format!("{:.4}", trade.entry_price),
            format!("{:.4}", trade.exit_price),
            format!("{:.2}", trade.gross_pnl),
            format!("{:.2}", trade.commission),
            format!("{:.2}", trade.net_pnl),
            trade.holding_days().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_bars(path: &Path, result: &BacktestResult) -> Result<(), MacrossError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "date", "close", "sma_short", "sma_long", "signal", "quantity", "cash", "equity",
    ])?;
    for bar in &result.bars {
        wtr.write_record([
            bar.date.to_string(),
            format!("{:.4}", bar.close),
            opt(bar.sma_short, 4),
            opt(bar.sma_long, 4),
            bar.signal.to_string(),
            bar.quantity.to_string(),
            format!("{:.2}", bar.cash),
            format!("{:.2}", bar.equity),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_events(path: &Path, result: &BacktestResult) -> Result<(), MacrossError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["date", "event"])?;
    for event in &result.events {
        wtr.write_record([event.date.to_string(), event.kind.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_dir: &Path,
    ) -> Result<(), MacrossError> {
        fs::create_dir_all(output_dir)?;
        write_summary(&output_dir.join(SUMMARY_FILE), result, metrics)?;
        write_trades(&output_dir.join(TRADES_FILE), result)?;
        write_bars(&output_dir.join(BARS_FILE), result)?;
        write_events(&output_dir.join(EVENTS_FILE), result)?;
        Ok(())
    }
}
