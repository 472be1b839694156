//! Append-only trade event log produced by the simulation.

use chrono::NaiveDate;
use std::fmt;

use super::execution::Side;

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    BuySignal {
        close: f64,
    },
    SellSignal {
        close: f64,
    },
    BuyExecuted {
        price: f64,
        quantity: i64,
        commission: f64,
    },
    SellExecuted {
        price: f64,
        quantity: i64,
        commission: f64,
    },
    TradeClosed {
        gross_pnl: f64,
        net_pnl: f64,
    },
    /// Buy signal ignored because not even one share is affordable.
    SizingSkipped {
        cash: f64,
        price: f64,
    },
    OrderRejected {
        side: Side,
        quantity: i64,
        required: f64,
        available: f64,
    },
    OrderCancelled {
        side: Side,
        quantity: i64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub date: NaiveDate,
    pub kind: EventKind,
}

impl TradeEvent {
    pub fn new(date: NaiveDate, kind: EventKind) -> Self {
        Self { date, kind }
    }

    pub fn is_fill(&self) -> bool {
        matches!(
            self.kind,
            EventKind::BuyExecuted { .. } | EventKind::SellExecuted { .. }
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::BuySignal { close } => write!(f, "BUY SIGNAL, Close: {:.2}", close),
            EventKind::SellSignal { close } => write!(f, "SELL SIGNAL, Close: {:.2}", close),
            EventKind::BuyExecuted {
                price,
                quantity,
                commission,
            } => write!(
                f,
                "BUY EXECUTED, Price: {:.2}, Size: {}, Commission: {:.2}",
                price, quantity, commission
            ),
            EventKind::SellExecuted {
                price,
                quantity,
                commission,
            } => write!(
                f,
                "SELL EXECUTED, Price: {:.2}, Size: {}, Commission: {:.2}",
                price, quantity, commission
            ),
            EventKind::TradeClosed { gross_pnl, net_pnl } => write!(
                f,
                "TRADE CLOSED, Gross PnL: {:.2}, Net PnL: {:.2}",
                gross_pnl, net_pnl
            ),
            EventKind::SizingSkipped { cash, price } => write!(
                f,
                "BUY SKIPPED, Cash {:.2} buys no shares at {:.2}",
                cash, price
            ),
            EventKind::OrderRejected {
                side,
                quantity,
                required,
                available,
            } => write!(
                f,
                "{} ORDER REJECTED, Size: {}, Required: {:.2}, Cash: {:.2}",
                side, quantity, required, available
            ),
            EventKind::OrderCancelled { side, quantity } => write!(
                f,
                "{} ORDER CANCELLED, Size: {}, no bar left to fill",
                side, quantity
            ),
        }
    }
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.date.format("%Y-%m-%d"), self.kind)
    }
}
