use crate::broker::{Broker, CalendarDay, OrderRequest, OrderSide};
use crate::config::StrategyConfig;
use crate::decision::DecisionEngine;
use crate::models::{AccountState, Action};
use crate::strategy::{CrossoverSignal, SmaCrossoverStrategy, Strategy};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Result of one trading cycle
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    MarketClosed,
    Evaluated {
        action: Action,
        signal: CrossoverSignal,
    },
}

/// Bar request bounds for a lookback of `lookback_days` completed sessions
///
/// Finds the last session on or before `today` and returns the first and last date of the
/// `lookback_days` sessions strictly before it. `calendar` must be ascending.
pub fn lookback_window(
    calendar: &[CalendarDay],
    today: NaiveDate,
    lookback_days: usize,
) -> Result<(NaiveDate, NaiveDate)> {
    if lookback_days == 0 {
        anyhow::bail!("Lookback must cover at least one session");
    }

    let current = calendar
        .iter()
        .rposition(|day| day.date <= today)
        .with_context(|| format!("No trading session on or before {}", today))?;

    if current < lookback_days {
        anyhow::bail!(
            "Calendar too short: need {} sessions before {}, have {}",
            lookback_days,
            calendar[current].date,
            current
        );
    }

    let window = &calendar[current - lookback_days..current];
    Ok((window[0].date, window[lookback_days - 1].date))
}

/// Runs one evaluate-and-act cycle against a broker
pub struct Trader<B: Broker> {
    broker: B,
    strategy: SmaCrossoverStrategy,
    engine: DecisionEngine,
    symbol: String,
    lookback_days: usize,
    timeframe: String,
    dry_run: bool,
}

impl<B: Broker> Trader<B> {
    pub fn new(broker: B, config: &StrategyConfig) -> Result<Self> {
        config.validate()?;
        let strategy = SmaCrossoverStrategy::new(config.crossover_settings())?;

        Ok(Self {
            broker,
            strategy,
            engine: DecisionEngine::default(),
            symbol: config.symbol.clone(),
            lookback_days: config.lookback_days,
            timeframe: config.timeframe.clone(),
            dry_run: false,
        })
    }

    /// Evaluate and log without cancelling or placing orders
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub async fn run_once(&self) -> Result<RunOutcome> {
        let clock = self.broker.clock().await.context("Failed to read market clock")?;
        if !clock.is_open {
            tracing::info!("Market is closed at {}, nothing to do", clock.timestamp);
            return Ok(RunOutcome::MarketClosed);
        }

        let calendar = self
            .broker
            .calendar()
            .await
            .context("Failed to read market calendar")?;
        let (start, end) =
            lookback_window(&calendar, clock.timestamp.date_naive(), self.lookback_days)?;

        let bars = self
            .broker
            .bars(&self.symbol, start, end, &self.timeframe)
            .await
            .with_context(|| format!("Failed to fetch bars for {}", self.symbol))?;
        tracing::debug!("Fetched {} bars for {} ({} to {})", bars.len(), self.symbol, start, end);

        if bars.len() < self.strategy.min_bars_required() {
            tracing::warn!(
                "Only {} bars for {}, {} needs {}",
                bars.len(),
                self.symbol,
                self.strategy.name(),
                self.strategy.min_bars_required()
            );
        }

        let signal = self.strategy.evaluate(&bars)?;
        tracing::info!(
            "{} close={} fast={:?} slow={:?} state={}",
            self.symbol,
            signal.close,
            signal.fast,
            signal.slow,
            signal.state
        );

        let has_open_position = self
            .broker
            .positions()
            .await
            .context("Failed to read positions")?
            .iter()
            .any(|p| p.symbol == self.symbol && p.qty != Decimal::ZERO);
        let cash = self
            .broker
            .account()
            .await
            .context("Failed to read account")?
            .cash;
        let account = AccountState::new(has_open_position, cash)?;

        if !self.dry_run {
            self.broker
                .cancel_all_orders()
                .await
                .context("Failed to cancel open orders")?;
        }

        let action = self
            .engine
            .decide(&self.symbol, signal.fast, signal.slow, &account);
        tracing::info!(
            "Decision: {} (open_position={}, cash={})",
            action,
            has_open_position,
            cash
        );

        if self.dry_run {
            tracing::info!("Dry run, not executing {}", action);
        } else {
            self.execute(&action).await?;
        }

        Ok(RunOutcome::Evaluated { action, signal })
    }

    async fn execute(&self, action: &Action) -> Result<()> {
        match action {
            Action::Sell { symbol } => {
                self.broker
                    .close_position(symbol)
                    .await
                    .with_context(|| format!("Failed to close position in {}", symbol))?;
                tracing::info!("📉 Closed position in {}", symbol);
            }
            Action::Buy { symbol, notional } => {
                let order = OrderRequest::market_day(symbol, OrderSide::Buy, *notional);
                self.broker
                    .submit_order(&order)
                    .await
                    .with_context(|| format!("Failed to buy {}", symbol))?;
                tracing::info!("📈 Bought {} for {}", symbol, notional);
            }
            Action::Hold => {}
        }
        Ok(())
    }
}
