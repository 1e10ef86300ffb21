use super::metrics::{BacktestReport, BacktestStep, TradeRecord};
use crate::decision::{AllCash, DecisionEngine, SizingStrategy};
use crate::error::{SignalError, SignalResult};
use crate::models::{AccountState, Action, Bar};
use crate::strategy::{CrossoverSettings, CrossoverTracker};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

// Running totals for the position since it was opened
struct OpenEntry {
    time: DateTime<Utc>,
    quantity: Decimal,
    cost: Decimal,
}

impl OpenEntry {
    /// Quantity-weighted fill price across every buy into the position
    fn average_price(&self) -> Decimal {
        if self.quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.cost / self.quantity
        }
    }
}

/// Backtest runner that replays bars through the crossover and the decision rules
///
/// The simulated account starts all in cash. Every action fills in full at the close
/// of the bar that produced it.
pub struct BacktestRunner<S: SizingStrategy = AllCash> {
    settings: CrossoverSettings,
    engine: DecisionEngine<S>,
    initial_cash: Decimal,
}

impl BacktestRunner<AllCash> {
    pub fn new(settings: CrossoverSettings, initial_cash: Decimal) -> SignalResult<Self> {
        Self::with_engine(settings, initial_cash, DecisionEngine::default())
    }
}

impl<S: SizingStrategy> BacktestRunner<S> {
    pub fn with_engine(
        settings: CrossoverSettings,
        initial_cash: Decimal,
        engine: DecisionEngine<S>,
    ) -> SignalResult<Self> {
        settings.validate()?;
        if initial_cash <= Decimal::ZERO {
            return Err(SignalError::InvalidConfiguration(format!(
                "initial cash must be positive, got {}",
                initial_cash
            )));
        }

        Ok(Self {
            settings,
            engine,
            initial_cash,
        })
    }

    /// Run a backtest over an ordered bar sequence for `symbol`
    pub fn run(&self, symbol: &str, bars: &[Bar]) -> SignalResult<BacktestReport> {
        if bars.is_empty() {
            return Err(SignalError::EmptyBarSequence);
        }

        tracing::info!(
            "Starting backtest: {} bars, fast={} slow={}",
            bars.len(),
            self.settings.fast_window,
            self.settings.slow_window
        );

        let mut tracker = CrossoverTracker::new(self.settings)?;
        let mut cash = self.initial_cash;
        let mut shares = Decimal::ZERO;
        let mut entry: Option<OpenEntry> = None;
        let mut steps = Vec::with_capacity(bars.len());
        let mut trades = Vec::new();

        for bar in bars {
            let signal = tracker.push(bar)?;
            let price = bar.close();
            let account = AccountState::new(shares > Decimal::ZERO, cash)?;
            let action = self.engine.decide(symbol, signal.fast, signal.slow, &account);

            match &action {
                Action::Buy { notional, .. } => {
                    let notional = (*notional).min(cash);
                    let quantity = notional / price;
                    shares += quantity;
                    cash -= notional;

                    let open = entry.get_or_insert(OpenEntry {
                        time: bar.timestamp(),
                        quantity: Decimal::ZERO,
                        cost: Decimal::ZERO,
                    });
                    open.quantity += quantity;
                    open.cost += notional;
                    tracing::debug!("BUY {} @ {} for {}", symbol, price, notional);
                }
                Action::Sell { .. } => {
                    if let Some(open) = entry.take() {
                        trades.push(TradeRecord::close(
                            open.time,
                            open.average_price(),
                            shares,
                            open.cost,
                            bar.timestamp(),
                            price,
                        ));
                    }
                    cash += shares * price;
                    shares = Decimal::ZERO;
                    tracing::debug!("SELL {} @ {}", symbol, price);
                }
                Action::Hold => {}
            }

            steps.push(BacktestStep {
                signal,
                action,
                cash,
                shares,
                equity: cash + shares * price,
            });
        }

        let final_equity = steps
            .last()
            .map(|s| s.equity)
            .unwrap_or(self.initial_cash);
        let total_return_pct =
            (final_equity - self.initial_cash) / self.initial_cash * Decimal::ONE_HUNDRED;

        tracing::info!(
            "Backtest complete: {} trades, final equity {:.2} ({:.2}%)",
            trades.len(),
            final_equity,
            total_return_pct
        );

        Ok(BacktestReport {
            symbol: symbol.to_string(),
            initial_cash: self.initial_cash,
            steps,
            trades,
            final_cash: cash,
            final_equity,
            total_return_pct,
        })
    }
}
