use super::{
    signals::{check_next_timestamp, CrossoverSignal},
    Strategy,
};
use crate::error::{SignalError, SignalResult};
use crate::indicators::MovingAverageTracker;
use crate::models::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Window lengths for the two moving averages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverSettings {
    pub fast_window: usize,
    pub slow_window: usize,
}

impl Default for CrossoverSettings {
    fn default() -> Self {
        Self {
            fast_window: 7,
            slow_window: 14,
        }
    }
}

impl CrossoverSettings {
    pub fn new(fast_window: usize, slow_window: usize) -> SignalResult<Self> {
        let settings = Self {
            fast_window,
            slow_window,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> SignalResult<()> {
        if self.fast_window == 0 || self.slow_window == 0 {
            return Err(SignalError::InvalidConfiguration(format!(
                "moving average windows must be at least 1 (fast={}, slow={})",
                self.fast_window, self.slow_window
            )));
        }
        Ok(())
    }
}

/// Fast/slow tracker pair fed one bar at a time
///
/// Rejects a bar that does not come strictly after the previous one, so the windows
/// can never be filled out of order.
#[derive(Debug, Clone)]
pub struct CrossoverTracker {
    fast: MovingAverageTracker,
    slow: MovingAverageTracker,
    last_timestamp: Option<DateTime<Utc>>,
}

impl CrossoverTracker {
    pub fn new(settings: CrossoverSettings) -> SignalResult<Self> {
        settings.validate()?;

        Ok(Self {
            fast: MovingAverageTracker::new(settings.fast_window)?,
            slow: MovingAverageTracker::new(settings.slow_window)?,
            last_timestamp: None,
        })
    }

    /// Apply the next bar to both averages and return the readings at that bar
    pub fn push(&mut self, bar: &Bar) -> SignalResult<CrossoverSignal> {
        if let Some(previous) = self.last_timestamp {
            check_next_timestamp(previous, bar.timestamp())?;
        }

        self.fast.update(bar.close())?;
        self.slow.update(bar.close())?;
        self.last_timestamp = Some(bar.timestamp());

        Ok(CrossoverSignal::new(
            bar.timestamp(),
            bar.close(),
            self.fast.current_value(),
            self.slow.current_value(),
        ))
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }
}

/// Simple moving average crossover
///
/// Each evaluation replays the whole bar sequence through fresh trackers, so nothing
/// leaks from one run into the next.
#[derive(Debug, Clone, Default)]
pub struct SmaCrossoverStrategy {
    settings: CrossoverSettings,
}

impl SmaCrossoverStrategy {
    pub fn new(settings: CrossoverSettings) -> SignalResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> CrossoverSettings {
        self.settings
    }
}

impl Strategy for SmaCrossoverStrategy {
    fn evaluate(&self, bars: &[Bar]) -> SignalResult<CrossoverSignal> {
        let mut tracker = CrossoverTracker::new(self.settings)?;
        let mut latest = None;

        for bar in bars {
            latest = Some(tracker.push(bar)?);
        }

        let signal = latest.ok_or(SignalError::EmptyBarSequence)?;

        tracing::debug!(
            "{} @ {}: fast={:?} slow={:?} ({})",
            self.name(),
            signal.as_of.format("%Y-%m-%d"),
            signal.fast,
            signal.slow,
            signal.state
        );

        Ok(signal)
    }

    fn name(&self) -> &str {
        "SmaCrossover"
    }

    fn min_bars_required(&self) -> usize {
        self.settings.fast_window.max(self.settings.slow_window)
    }
}
