//! Backtest engine and per-bar event loop.
//!
//! A [`Simulation`] owns the account, the indicator state, at most one
//! pending order and the event log for a single run. Each [`Simulation::step`]
//! consumes one bar:
//!
//! 1. fill the pending order at this bar's open (next-open mode only)
//! 2. feed the close into the crossover indicator
//! 3. FLAT + Up signal opens a position, LONG + Down signal closes it
//! 4. record equity and the bar snapshot
//!
//! Every other signal/state combination leaves the state unchanged.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use super::account::Account;
use super::config_validation::validate_config;
use super::error::MacrossError;
use super::event::{EventKind, TradeEvent};
use super::execution::{enter_long, exit_position, order_size, EntryResult, Order, Side};
use super::indicator::crossover::{CrossoverIndicator, Signal};
use super::ohlcv::OhlcvBar;
use super::position::Position;
use super::price_series::PriceSeries;

/// When a market order created on a signal bar is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillTiming {
    /// At the close of the bar that produced the signal.
    #[default]
    Close,
    /// At the open of the following bar. Size is still computed from the
    /// signal bar's close, so the fill can be rejected for lack of cash.
    NextOpen,
}

impl FromStr for FillTiming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "close" => Ok(FillTiming::Close),
            "next_open" | "next-open" | "nextopen" => Ok(FillTiming::NextOpen),
            other => Err(format!(
                "unknown fill timing '{}' (expected close or next_open)",
                other
            )),
        }
    }
}

impl fmt::Display for FillTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillTiming::Close => write!(f, "close"),
            FillTiming::NextOpen => write!(f, "next_open"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub short_period: usize,
    pub long_period: usize,
    pub initial_cash: f64,
    pub commission_rate: f64,
    /// Fraction of available cash committed on entry.
    pub position_size: f64,
    pub printlog: bool,
    pub fill_timing: FillTiming,
    pub risk_free_rate: f64,
    pub annualization_factor: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            short_period: 10,
            long_period: 30,
            initial_cash: 100_000.0,
            commission_rate: 0.001,
            position_size: 0.95,
            printlog: true,
            fill_timing: FillTiming::Close,
            risk_free_rate: 0.0,
            annualization_factor: 252.0,
        }
    }
}

impl BacktestConfig {
    /// The first crossover can fire one bar after the long average is
    /// defined, so fewer bars than this can never trade.
    pub fn minimum_bars(&self) -> usize {
        self.long_period + 1
    }
}

/// Snapshot of one bar after the step completed.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub signal: Signal,
    pub quantity: i64,
    pub cash: f64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub code: String,
    pub config: BacktestConfig,
    pub account: Account,
    pub events: Vec<TradeEvent>,
    pub bars: Vec<BarRecord>,
}

impl BacktestResult {
    /// Position still held when the data ran out.
    pub fn open_position(&self) -> Option<&Position> {
        self.account.position.as_ref()
    }
}

pub struct Simulation<'a> {
    series: &'a PriceSeries,
    config: BacktestConfig,
    account: Account,
    indicator: CrossoverIndicator,
    pending: Option<Order>,
    events: Vec<TradeEvent>,
    bars: Vec<BarRecord>,
    cursor: usize,
}

impl<'a> Simulation<'a> {
    pub fn new(series: &'a PriceSeries, config: &BacktestConfig) -> Self {
        Simulation {
            series,
            config: config.clone(),
            account: Account::new(config.initial_cash, config.commission_rate),
            indicator: CrossoverIndicator::new(config.short_period, config.long_period),
            pending: None,
            events: Vec::new(),
            bars: Vec::with_capacity(series.len()),
            cursor: 0,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn events(&self) -> &[TradeEvent] {
        &self.events
    }

    pub fn pending_order(&self) -> Option<&Order> {
        self.pending.as_ref()
    }

    /// Process the next bar. Returns `false` once every bar has been consumed.
    pub fn step(&mut self) -> bool {
        let series = self.series;
        let Some(bar) = series.get(self.cursor) else {
            return false;
        };
        let index = self.cursor;

        if let Some(order) = self.pending.take() {
            self.fill(order, bar.open, bar.date);
        }

        let reading = self.indicator.update(bar.close);
        match (reading.signal, self.account.is_flat()) {
            (Signal::Up, true) => self.on_buy_signal(index, bar),
            (Signal::Down, false) => self.on_sell_signal(index, bar),
            _ => {}
        }

        let equity = self.account.record_equity(bar.date, bar.close);
        self.bars.push(BarRecord {
            date: bar.date,
            close: bar.close,
            sma_short: reading.sma_short,
            sma_long: reading.sma_long,
            signal: reading.signal,
            quantity: self.account.quantity(),
            cash: self.account.cash,
            equity,
        });

        self.cursor += 1;
        true
    }

    /// Process all remaining bars and close out the run.
    pub fn run(mut self) -> BacktestResult {
        while self.step() {}
        self.finish()
    }

    /// Cancel any order left without a bar to fill on and hand back the result.
    pub fn finish(mut self) -> BacktestResult {
        if let Some(order) = self.pending.take() {
            let date = self
                .bars
                .last()
                .map(|b| b.date)
                .unwrap_or(order.signal_date);
            self.events.push(TradeEvent::new(
                date,
                EventKind::OrderCancelled {
                    side: order.side,
                    quantity: order.quantity,
                },
            ));
        }

        BacktestResult {
            code: self.series.code().to_string(),
            config: self.config,
            account: self.account,
            events: self.events,
            bars: self.bars,
        }
    }

    fn on_buy_signal(&mut self, index: usize, bar: &OhlcvBar) {
        self.events
            .push(TradeEvent::new(bar.date, EventKind::BuySignal { close: bar.close }));

        let quantity = order_size(self.account.cash, self.config.position_size, bar.close);
        if quantity <= 0 {
            self.events.push(TradeEvent::new(
                bar.date,
                EventKind::SizingSkipped {
                    cash: self.account.cash,
                    price: bar.close,
                },
            ));
            return;
        }

        self.submit(Order {
            side: Side::Buy,
            quantity,
            requested_at: index,
            signal_date: bar.date,
            signal_price: bar.close,
        });
    }

    fn on_sell_signal(&mut self, index: usize, bar: &OhlcvBar) {
        self.events
            .push(TradeEvent::new(bar.date, EventKind::SellSignal { close: bar.close }));

        self.submit(Order {
            side: Side::Sell,
            quantity: self.account.quantity(),
            requested_at: index,
            signal_date: bar.date,
            signal_price: bar.close,
        });
    }

    fn submit(&mut self, order: Order) {
        match self.config.fill_timing {
            FillTiming::Close => {
                let (price, date) = (order.signal_price, order.signal_date);
                self.fill(order, price, date);
            }
            FillTiming::NextOpen => self.pending = Some(order),
        }
    }

    fn fill(&mut self, order: Order, price: f64, date: NaiveDate) {
        match order.side {
            Side::Buy => match enter_long(&mut self.account, order.quantity, price, date) {
                EntryResult::Entered {
                    quantity,
                    execution_price,
                    commission,
                    ..
                } => self.events.push(TradeEvent::new(
                    date,
                    EventKind::BuyExecuted {
                        price: execution_price,
                        quantity,
                        commission,
                    },
                )),
                EntryResult::InsufficientCapital {
                    required,
                    available,
                } => self.events.push(TradeEvent::new(
                    date,
                    EventKind::OrderRejected {
                        side: Side::Buy,
                        quantity: order.quantity,
                        required,
                        available,
                    },
                )),
            },
            Side::Sell => {
                if let Some(exit) = exit_position(&mut self.account, price, date) {
                    self.events.push(TradeEvent::new(
                        date,
                        EventKind::SellExecuted {
                            price: exit.exit_price,
                            quantity: exit.quantity,
                            commission: exit.exit_commission,
                        },
                    ));
                    self.events.push(TradeEvent::new(
                        date,
                        EventKind::TradeClosed {
                            gross_pnl: exit.trade.gross_pnl,
                            net_pnl: exit.trade.net_pnl,
                        },
                    ));
                }
            }
        }
    }
}

/// Everything that must hold before a [`Simulation`] starts: a valid
/// configuration and at least `long_period + 1` bars.
pub fn check_preconditions(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<(), MacrossError> {
    validate_config(config)?;
    series.require_bars(config.minimum_bars())
}

/// Check the preconditions, then run.
pub fn run_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, MacrossError> {
    check_preconditions(series, config)?;
    Ok(Simulation::new(series, config).run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const CLOSES: [f64; 15] = [
        10.0, 10.0, 10.0, 10.0, 10.0, 11.0, 12.0, 13.0, 12.0, 11.0, 10.0, 9.0, 10.0, 11.0, 12.0,
    ];

    fn make_series(closes: &[f64], open_offset: f64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close + open_offset,
                high: close + 1.0,
                low: close - 1.5,
                close,
                volume: 1000,
            })
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    fn small_config() -> BacktestConfig {
        BacktestConfig {
            short_period: 2,
            long_period: 4,
            initial_cash: 1_000.0,
            commission_rate: 0.0,
            printlog: false,
            ..Default::default()
        }
    }

    fn fills(result: &BacktestResult) -> Vec<&TradeEvent> {
        result.events.iter().filter(|e| e.is_fill()).collect()
    }

    #[test]
    fn default_config_values() {
        let c = BacktestConfig::default();
        assert_eq!(c.short_period, 10);
        assert_eq!(c.long_period, 30);
        assert_abs_diff_eq!(c.initial_cash, 100_000.0);
        assert_abs_diff_eq!(c.commission_rate, 0.001);
        assert_abs_diff_eq!(c.position_size, 0.95);
        assert!(c.printlog);
        assert_eq!(c.fill_timing, FillTiming::Close);
        assert_eq!(c.minimum_bars(), 31);
    }

    #[test]
    fn fill_timing_parse() {
        assert_eq!("close".parse::<FillTiming>(), Ok(FillTiming::Close));
        assert_eq!("NEXT_OPEN".parse::<FillTiming>(), Ok(FillTiming::NextOpen));
        assert_eq!("next-open".parse::<FillTiming>(), Ok(FillTiming::NextOpen));
        assert!("tomorrow".parse::<FillTiming>().is_err());
        assert_eq!(FillTiming::NextOpen.to_string(), "next_open");
    }

    #[test]
    fn close_fill_round_trip_and_reentry() {
        let series = make_series(&CLOSES, 0.0);
        let result = run_backtest(&series, &small_config()).unwrap();

        let fills = fills(&result);
        assert_eq!(fills.len(), 3);
        assert_eq!(
            fills[0].kind,
            EventKind::BuyExecuted {
                price: 11.0,
                quantity: 86,
                commission: 0.0
            }
        );
        assert_eq!(fills[0].date, series.get(5).unwrap().date);
        assert_eq!(fills[1].date, series.get(9).unwrap().date);
        assert_eq!(fills[2].date, series.get(13).unwrap().date);

        assert_eq!(result.account.closed_trades.len(), 1);
        let trade = &result.account.closed_trades[0];
        assert_abs_diff_eq!(trade.net_pnl, 0.0);

        let open = result.open_position().unwrap();
        assert_eq!(open.quantity, 86);
        assert_abs_diff_eq!(result.account.cash, 54.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.account.final_equity(), 1_086.0, epsilon = 1e-9);
    }

    #[test]
    fn next_open_fills_on_following_bar() {
        let series = make_series(&CLOSES, -1.0);
        let config = BacktestConfig {
            fill_timing: FillTiming::NextOpen,
            ..small_config()
        };
        let result = run_backtest(&series, &config).unwrap();

        let fills = fills(&result);
        assert_eq!(fills.len(), 3);
        // signal at 5, fill at 6's open (12 - 1)
        assert_eq!(fills[0].date, series.get(6).unwrap().date);
        assert_eq!(
            fills[0].kind,
            EventKind::BuyExecuted {
                price: 11.0,
                quantity: 86,
                commission: 0.0
            }
        );
        // signal at 9, fill at 10's open (10 - 1)
        assert_eq!(fills[1].date, series.get(10).unwrap().date);
        let trade = &result.account.closed_trades[0];
        assert_abs_diff_eq!(trade.exit_price, 9.0);
        assert_abs_diff_eq!(trade.gross_pnl, -172.0, epsilon = 1e-9);

        // cash 828 after the exit, re-entry sized from the close of 11
        assert_eq!(fills[2].date, series.get(14).unwrap().date);
        assert_eq!(result.open_position().unwrap().quantity, 71);
        assert_abs_diff_eq!(result.account.cash, 47.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.account.final_equity(), 899.0, epsilon = 1e-9);
    }

    #[test]
    fn next_open_gap_up_rejects_order() {
        let series = make_series(&CLOSES, 0.5);
        let config = BacktestConfig {
            fill_timing: FillTiming::NextOpen,
            ..small_config()
        };
        let result = run_backtest(&series, &config).unwrap();

        let rejected = result
            .events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::OrderRejected { .. }))
            .count();
        assert_eq!(rejected, 2);
        assert!(fills(&result).is_empty());
        assert!(result.account.is_flat());
        assert_abs_diff_eq!(result.account.final_equity(), 1_000.0);
    }

    #[test]
    fn next_open_order_on_last_bar_is_cancelled() {
        let series = make_series(&CLOSES[..14], -1.0);
        let config = BacktestConfig {
            fill_timing: FillTiming::NextOpen,
            ..small_config()
        };
        let result = run_backtest(&series, &config).unwrap();

        let last = result.events.last().unwrap();
        assert_eq!(
            last.kind,
            EventKind::OrderCancelled {
                side: Side::Buy,
                quantity: 71
            }
        );
        assert_eq!(Some(last.date), series.last_date());
        assert!(result.account.is_flat());
    }

    #[test]
    fn unaffordable_signal_is_skipped() {
        let series = make_series(&CLOSES, 0.0);
        let config = BacktestConfig {
            initial_cash: 5.0,
            ..small_config()
        };
        let result = run_backtest(&series, &config).unwrap();

        let skipped = result
            .events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::SizingSkipped { .. }))
            .count();
        assert_eq!(skipped, 2);
        assert!(result.account.closed_trades.is_empty());
        assert_abs_diff_eq!(result.account.final_equity(), 5.0);
    }

    #[test]
    fn downward_cross_while_flat_is_noop() {
        // falls first: the only cross is downward
        let closes = [12.0, 12.0, 12.0, 12.0, 12.0, 11.0, 10.0, 9.0];
        let series = make_series(&closes, 0.0);
        let result = run_backtest(&series, &small_config()).unwrap();

        assert!(result.bars.iter().any(|b| b.signal == Signal::Down));
        assert!(result.events.is_empty());
        assert!(result.account.is_flat());
    }

    #[test]
    fn equity_identity_holds_every_bar() {
        let series = make_series(&CLOSES, 0.0);
        let config = BacktestConfig {
            commission_rate: 0.001,
            ..small_config()
        };
        let result = run_backtest(&series, &config).unwrap();

        assert_eq!(result.bars.len(), series.len());
        for record in &result.bars {
            let expected = record.cash + record.quantity as f64 * record.close;
            assert_abs_diff_eq!(record.equity, expected, epsilon = 1e-9);
            assert!(record.quantity >= 0);
        }
    }

    #[test]
    fn step_exposes_progress() {
        let series = make_series(&CLOSES, 0.0);
        let config = small_config();
        let mut sim = Simulation::new(&series, &config);

        for _ in 0..5 {
            assert!(sim.step());
        }
        assert!(sim.events().is_empty());
        assert!(sim.step());
        assert_eq!(sim.events().len(), 2);
        assert_eq!(sim.account().quantity(), 86);
        assert!(sim.pending_order().is_none());

        while sim.step() {}
        assert!(!sim.step());
        let result = sim.finish();
        assert_eq!(result.bars.len(), CLOSES.len());
    }

    #[test]
    fn too_short_series_fails_before_running() {
        let series = make_series(&CLOSES[..4], 0.0);
        let err = run_backtest(&series, &small_config()).unwrap_err();
        assert!(matches!(
            err,
            MacrossError::InsufficientData { bars: 4, minimum: 5, .. }
        ));
    }

    #[test]
    fn preconditions_need_one_bar_past_the_long_window() {
        let config = small_config();
        assert!(check_preconditions(&make_series(&CLOSES[..5], 0.0), &config).is_ok());
        assert!(matches!(
            check_preconditions(&make_series(&CLOSES[..4], 0.0), &config),
            Err(MacrossError::InsufficientData { bars: 4, minimum: 5, .. })
        ));

        let invalid = BacktestConfig {
            initial_cash: 0.0,
            ..small_config()
        };
        assert!(matches!(
            check_preconditions(&make_series(&CLOSES[..2], 0.0), &invalid),
            Err(MacrossError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn invalid_config_fails_before_running() {
        let series = make_series(&CLOSES, 0.0);
        let config = BacktestConfig {
            short_period: 4,
            long_period: 4,
            ..small_config()
        };
        let err = run_backtest(&series, &config).unwrap_err();
        assert!(matches!(err, MacrossError::ConfigInvalid { .. }));
    }

    #[test]
    fn replay_is_identical() {
        let series = make_series(&CLOSES, 0.0);
        let config = BacktestConfig {
            commission_rate: 0.001,
            ..small_config()
        };
        let first = run_backtest(&series, &config).unwrap();
        let second = run_backtest(&series, &config).unwrap();
        assert_eq!(first, second);
    }
}
