//! Open position and closed trade records.

use chrono::NaiveDate;

/// The open side of a trade. Long only: `quantity` is always positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub quantity: i64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub entry_commission: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub quantity: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub gross_pnl: f64,
    pub entry_commission: f64,
    pub exit_commission: f64,
    pub commission: f64,
    pub net_pnl: f64,
}

impl ClosedTrade {
    /// Close `position` at `exit_price`.
    ///
    /// gross = (exit - entry) * quantity
    /// net   = gross - entry_commission - exit_commission
    pub fn from_exit(
        position: &Position,
        exit_price: f64,
        exit_date: NaiveDate,
        exit_commission: f64,
    ) -> Self {
        let gross_pnl = position.unrealized_pnl(exit_price);
        let commission = position.entry_commission + exit_commission;
        ClosedTrade {
            entry_date: position.entry_date,
            exit_date,
            quantity: position.quantity,
            entry_price: position.entry_price,
            exit_price,
            gross_pnl,
            entry_commission: position.entry_commission,
            exit_commission,
            commission,
            net_pnl: gross_pnl - commission,
        }
    }

    /// Every logged trade has been exited; open trades live on as [`Position`].
    pub fn is_closed(&self) -> bool {
        true
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_position() -> Position {
        Position {
            quantity: 100,
            entry_price: 50.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            entry_commission: 5.0,
        }
    }

    #[test]
    fn market_value() {
        let pos = sample_position();
        assert_abs_diff_eq!(pos.market_value(55.0), 5500.0);
    }

    #[test]
    fn unrealized_pnl_profit_and_loss() {
        let pos = sample_position();
        assert_abs_diff_eq!(pos.unrealized_pnl(55.0), 500.0);
        assert_abs_diff_eq!(pos.unrealized_pnl(45.0), -500.0);
    }

    #[test]
    fn closed_trade_pnl_includes_both_commissions() {
        let pos = sample_position();
        let exit = NaiveDate::from_ymd_opt(2024, 1, 25).unwrap();
        let trade = ClosedTrade::from_exit(&pos, 55.0, exit, 5.5);

        assert_abs_diff_eq!(trade.gross_pnl, 500.0);
        assert_abs_diff_eq!(trade.commission, 10.5);
        assert_abs_diff_eq!(trade.net_pnl, 489.5);
        assert_eq!(trade.quantity, 100);
        assert_eq!(trade.holding_days(), 10);
        assert!(trade.is_closed());
    }

    #[test]
    fn closed_trade_loss() {
        let pos = sample_position();
        let exit = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let trade = ClosedTrade::from_exit(&pos, 49.0, exit, 4.9);
        assert_abs_diff_eq!(trade.gross_pnl, -100.0);
        assert_abs_diff_eq!(trade.net_pnl, -109.9, epsilon = 1e-9);
    }
}
