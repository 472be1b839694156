//! Order sizing and fill simulation.
//!
//! Market orders only, no slippage. Commission is a fixed fraction of the
//! traded notional.

use chrono::NaiveDate;
use std::fmt;

use super::account::Account;
use super::position::{ClosedTrade, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A market order waiting for its fill price.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub side: Side,
    pub quantity: i64,
    pub requested_at: usize,
    pub signal_date: NaiveDate,
    pub signal_price: f64,
}

/// commission = trade_value * rate
pub fn calculate_commission(trade_value: f64, commission_rate: f64) -> f64 {
    trade_value * commission_rate
}

/// Whole shares purchasable with `position_size` of `cash` at `price`.
/// Returns 0 when nothing can be bought.
pub fn order_size(cash: f64, position_size: f64, price: f64) -> i64 {
    if price <= 0.0 || cash <= 0.0 {
        return 0;
    }
    let shares = (cash * position_size / price).floor();
    if shares.is_finite() && shares > 0.0 {
        shares as i64
    } else {
        0
    }
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: i64,
        execution_price: f64,
        cost: f64,
        commission: f64,
    },
    InsufficientCapital {
        required: f64,
        available: f64,
    },
}

/// Buy `quantity` shares at `price`.
///
/// 1. cost = quantity * price, commission on cost
/// 2. reject if cost + commission exceeds cash
/// 3. debit cash and open the position
pub fn enter_long(account: &mut Account, quantity: i64, price: f64, date: NaiveDate) -> EntryResult {
    let cost = quantity as f64 * price;
    let commission = calculate_commission(cost, account.commission_rate);
    let total_cost = cost + commission;

    if quantity <= 0 || total_cost > account.cash {
        return EntryResult::InsufficientCapital {
            required: total_cost,
            available: account.cash,
        };
    }

    account.cash -= total_cost;
    account.position = Some(Position {
        quantity,
        entry_price: price,
        entry_date: date,
        entry_commission: commission,
    });

    EntryResult::Entered {
        quantity,
        execution_price: price,
        cost,
        commission,
    }
}

/// Result of an exit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub quantity: i64,
    pub exit_price: f64,
    pub exit_value: f64,
    pub exit_commission: f64,
    pub trade: ClosedTrade,
}

/// Sell the whole position at `price`.
///
/// Credits exit value minus commission, records the closed trade and leaves
/// the account flat. Returns `None` when already flat.
pub fn exit_position(account: &mut Account, price: f64, date: NaiveDate) -> Option<ExitResult> {
    let position = account.position.take()?;

    let exit_value = position.market_value(price);
    let exit_commission = calculate_commission(exit_value, account.commission_rate);
    account.cash += exit_value - exit_commission;

    let trade = ClosedTrade::from_exit(&position, price, date, exit_commission);
    account.record_trade(trade.clone());

    Some(ExitResult {
        quantity: position.quantity,
        exit_price: price,
        exit_value,
        exit_commission,
        trade,
    })
}
