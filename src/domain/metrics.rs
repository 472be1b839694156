//! Performance metrics and statistics.
//!
//! The statistic functions are pure over an already-computed trade log and
//! equity curve. [`Metrics`] is the summary record handed to reports; ratios
//! that cannot be defined (no trades, flat equity) are `None` and print as
//! "N/A".

use std::fmt;

use super::account::EquityPoint;
use super::backtest::BacktestResult;
use super::position::ClosedTrade;

/// final / initial - 1
pub fn total_return(initial_cash: f64, final_equity: f64) -> f64 {
    if initial_cash > 0.0 {
        final_equity / initial_cash - 1.0
    } else {
        0.0
    }
}

/// Compound growth rate per `periods_per_year` bars.
pub fn annualized_return(total_return: f64, periods: usize, periods_per_year: f64) -> f64 {
    let years = periods as f64 / periods_per_year;
    if years > 0.0 && total_return.is_finite() && total_return > -1.0 {
        (1.0 + total_return).powf(1.0 / years) - 1.0
    } else {
        0.0
    }
}

/// Fraction of closed trades with positive net pnl, `None` without trades.
pub fn win_rate(trades: &[ClosedTrade]) -> Option<f64> {
    if trades.is_empty() {
        return None;
    }
    let won = trades.iter().filter(|t| t.net_pnl > 0.0).count();
    Some(won as f64 / trades.len() as f64)
}

/// Largest peak-to-trough decline as a fraction of the peak.
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }

    max_dd
}

/// Longest run of consecutive bars spent below a previous peak.
pub fn max_drawdown_duration(equity_curve: &[EquityPoint]) -> usize {
    let mut peak = f64::MIN;
    let mut current = 0usize;
    let mut longest = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }

    longest
}

fn period_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

/// Annualized Sharpe ratio of per-bar returns.
///
/// (mean - rf / factor) / stddev * sqrt(factor), population stddev.
/// `None` with fewer than two returns or zero volatility.
pub fn sharpe_ratio(
    equity_curve: &[EquityPoint],
    risk_free_rate: f64,
    annualization_factor: f64,
) -> Option<f64> {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    // Constant returns still accumulate rounding noise in the variance.
    if stddev <= f64::EPSILON * mean.abs().max(1.0) {
        return None;
    }

    let excess = mean - risk_free_rate / annualization_factor;
    Some(excess / stddev * annualization_factor.sqrt())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub code: String,
    pub starting_cash: f64,
    pub ending_equity: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown_pct: f64,
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub open_trades: usize,
    pub win_rate_pct: Option<f64>,
    pub profit_factor: Option<f64>,
    pub total_net_pnl: f64,
    pub total_commission: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_days: f64,
}

impl Metrics {
    pub fn compute(result: &BacktestResult) -> Self {
        let account = &result.account;
        let config = &result.config;
        let trades = &account.closed_trades;
        let curve = &account.equity_curve;

        let ending_equity = account.final_equity();
        let total = total_return(account.initial_cash, ending_equity);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in trades {
            let pnl = trade.net_pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
        }

        let total_trades = trades.len();
        let profit_factor = if total_losses > 0.0 {
            Some(total_wins / total_losses)
        } else {
            None
        };

        let open_commission = account
            .position
            .as_ref()
            .map_or(0.0, |p| p.entry_commission);

        Metrics {
            code: result.code.clone(),
            starting_cash: account.initial_cash,
            ending_equity,
            total_return_pct: total * 100.0,
            annualized_return_pct: annualized_return(total, curve.len(), config.annualization_factor)
                * 100.0,
            sharpe_ratio: sharpe_ratio(curve, config.risk_free_rate, config.annualization_factor),
            max_drawdown_pct: max_drawdown(curve) * 100.0,
            max_drawdown_duration: max_drawdown_duration(curve),
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven: total_trades - trades_won - trades_lost,
            open_trades: usize::from(account.position.is_some()),
            win_rate_pct: win_rate(trades).map(|w| w * 100.0),
            profit_factor,
            total_net_pnl: trades.iter().map(|t| t.net_pnl).sum(),
            total_commission: trades.iter().map(|t| t.commission).sum::<f64>() + open_commission,
            avg_win: if trades_won > 0 {
                total_wins / trades_won as f64
            } else {
                0.0
            },
            avg_loss: if trades_lost > 0 {
                total_losses / trades_lost as f64
            } else {
                0.0
            },
            largest_win,
            largest_loss,
            avg_holding_days: if total_trades > 0 {
                trades.iter().map(|t| t.holding_days()).sum::<i64>() as f64 / total_trades as f64
            } else {
                0.0
            },
        }
    }
}

fn fmt_opt(value: Option<f64>, precision: usize, suffix: &str) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}{}", precision, v, suffix),
        _ => "N/A".to_string(),
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Results: {} ===", self.code)?;
        writeln!(f, "Starting Cash:    {:.2}", self.starting_cash)?;
        writeln!(f, "Ending Equity:    {:.2}", self.ending_equity)?;
        writeln!(f, "Total Return:     {:.2}%", self.total_return_pct)?;
        writeln!(f, "Annualized:       {:.2}%", self.annualized_return_pct)?;
        writeln!(f, "Sharpe Ratio:     {}", fmt_opt(self.sharpe_ratio, 4, ""))?;
        writeln!(f, "Max Drawdown:     {:.2}%", self.max_drawdown_pct)?;
        writeln!(f, "Total Trades:     {}", self.total_trades)?;
        writeln!(f, "Won Trades:       {}", self.trades_won)?;
        writeln!(f, "Lost Trades:      {}", self.trades_lost)?;
        writeln!(f, "Open Trades:      {}", self.open_trades)?;
        writeln!(f, "Win Rate:         {}", fmt_opt(self.win_rate_pct, 2, "%"))?;
        writeln!(f, "Profit Factor:    {}", fmt_opt(self.profit_factor, 2, ""))?;
        write!(f, "Net PnL:          {:.2}", self.total_net_pnl)
    }
}
