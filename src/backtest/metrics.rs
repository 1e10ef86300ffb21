use crate::models::Action;
use crate::strategy::CrossoverSignal;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Closed round trip: one buy followed by the sell that flattened it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    /// Cash spent on entry
    pub cost: Decimal,
    pub pnl: Decimal,
    pub pnl_pct: Decimal,
}

impl TradeRecord {
    pub fn close(
        entry_time: DateTime<Utc>,
        entry_price: Decimal,
        quantity: Decimal,
        cost: Decimal,
        exit_time: DateTime<Utc>,
        exit_price: Decimal,
    ) -> Self {
        let proceeds = quantity * exit_price;
        let pnl = proceeds - cost;
        let pnl_pct = if cost.is_zero() {
            Decimal::ZERO
        } else {
            pnl / cost * Decimal::ONE_HUNDRED
        };

        Self {
            entry_time,
            exit_time,
            entry_price,
            exit_price,
            quantity,
            cost,
            pnl,
            pnl_pct,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_time - self.entry_time).num_days()
    }
}

/// State of the simulated account after one bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestStep {
    pub signal: CrossoverSignal,
    pub action: Action,
    pub cash: Decimal,
    pub shares: Decimal,
    /// Cash plus shares marked at the bar close
    pub equity: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub initial_cash: Decimal,
    pub steps: Vec<BacktestStep>,
    pub trades: Vec<TradeRecord>,
    pub final_cash: Decimal,
    pub final_equity: Decimal,
    pub total_return_pct: Decimal,
}

impl BacktestReport {
    pub fn buy_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.action, Action::Buy { .. }))
            .count()
    }

    pub fn sell_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.action, Action::Sell { .. }))
            .count()
    }

    /// Percentage of closed trades with positive P&L
    pub fn win_rate(&self) -> Decimal {
        if self.trades.is_empty() {
            return Decimal::ZERO;
        }
        let wins = self.trades.iter().filter(|t| t.is_win()).count();
        Decimal::from(wins) / Decimal::from(self.trades.len()) * Decimal::ONE_HUNDRED
    }

    /// Largest peak-to-trough fall of the equity curve, in percent
    pub fn max_drawdown_pct(&self) -> Decimal {
        let mut peak = self.initial_cash;
        let mut max_drawdown = Decimal::ZERO;

        for step in &self.steps {
            if step.equity > peak {
                peak = step.equity;
            }
            if peak > Decimal::ZERO {
                let drawdown = (peak - step.equity) / peak * Decimal::ONE_HUNDRED;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }

        max_drawdown
    }

    /// Multi-line summary for terminal output
    pub fn summary(&self) -> String {
        format!(
            "{}: {} bars, {} buys, {} sells\n  Final equity: {:.2} (cash {:.2})\n  Return: {:.2}%  Win rate: {:.1}%  Max drawdown: {:.2}%",
            self.symbol,
            self.steps.len(),
            self.buy_count(),
            self.sell_count(),
            self.final_equity,
            self.final_cash,
            self.total_return_pct,
            self.win_rate(),
            self.max_drawdown_pct(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn report_with_equity(equity: &[Decimal]) -> BacktestReport {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        let steps = equity
            .iter()
            .enumerate()
            .map(|(i, &e)| BacktestStep {
                signal: CrossoverSignal::new(start + Duration::days(i as i64), e, None, None),
                action: Action::Hold,
                cash: e,
                shares: Decimal::ZERO,
                equity: e,
            })
            .collect();

        BacktestReport {
            symbol: "TEST".to_string(),
            initial_cash: dec!(100),
            steps,
            trades: Vec::new(),
            final_cash: dec!(100),
            final_equity: dec!(100),
            total_return_pct: Decimal::ZERO,
        }
    }

    #[test]
    fn test_trade_record_pnl() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        let trade = TradeRecord::close(t0, dec!(10), dec!(50), dec!(500), t0 + Duration::days(4), dec!(12));

        assert_eq!(trade.pnl, dec!(100));
        assert_eq!(trade.pnl_pct, dec!(20));
        assert_eq!(trade.holding_days(), 4);
        assert!(trade.is_win());
    }

    #[test]
    fn test_max_drawdown() {
        let report = report_with_equity(&[dec!(100), dec!(120), dec!(90), dec!(110), dec!(60)]);
        assert_eq!(report.max_drawdown_pct(), dec!(50));
    }

    #[test]
    fn test_no_trades_win_rate() {
        let report = report_with_equity(&[dec!(100)]);
        assert_eq!(report.win_rate(), Decimal::ZERO);
        assert_eq!(report.max_drawdown_pct(), Decimal::ZERO);
    }
}
