//! Account state: cash, the single position, trade log and equity curve.

use chrono::NaiveDate;

use super::position::{ClosedTrade, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub initial_cash: f64,
    pub commission_rate: f64,
    pub position: Option<Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_cash: f64, commission_rate: f64) -> Self {
        Account {
            cash: initial_cash,
            initial_cash,
            commission_rate,
            position: None,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn quantity(&self) -> i64 {
        self.position.as_ref().map_or(0, |p| p.quantity)
    }

    /// cash + quantity * price
    pub fn equity(&self, price: f64) -> f64 {
        let position_value = self
            .position
            .as_ref()
            .map_or(0.0, |p| p.market_value(price));
        self.cash + position_value
    }

    pub fn record_equity(&mut self, date: NaiveDate, price: f64) -> f64 {
        let equity = self.equity(price);
        self.equity_curve.push(EquityPoint { date, equity });
        equity
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.closed_trades.push(trade);
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_cash)
    }
}
