use crate::error::{SignalError, SignalResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One trading period of price data
///
/// Only `timestamp` and `close` feed the signal. The other fields are kept when the
/// data source provides them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    timestamp: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

impl Bar {
    /// Build a close-only bar (open/high/low are set to the close)
    pub fn new(timestamp: DateTime<Utc>, close: Decimal) -> SignalResult<Self> {
        Self::ohlcv(timestamp, close, close, close, close, Decimal::ZERO)
    }

    pub fn ohlcv(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> SignalResult<Self> {
        if close <= Decimal::ZERO {
            return Err(SignalError::InvalidInput(format!(
                "close price must be positive, got {} at {}",
                close, timestamp
            )));
        }
        if volume < Decimal::ZERO {
            return Err(SignalError::InvalidInput(format!(
                "volume must not be negative, got {} at {}",
                volume, timestamp
            )));
        }

        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn open(&self) -> Decimal {
        self.open
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }
}

/// Relationship between the fast and slow averages at the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossoverState {
    FastAboveSlow,
    FastBelowSlow,
    /// Both averages are exactly equal. Never produces a trade.
    Tied,
    /// At least one average is not ready yet
    Undefined,
}

impl CrossoverState {
    pub fn from_values(fast: Option<Decimal>, slow: Option<Decimal>) -> Self {
        match (fast, slow) {
            (Some(fast), Some(slow)) if fast > slow => CrossoverState::FastAboveSlow,
            (Some(fast), Some(slow)) if fast < slow => CrossoverState::FastBelowSlow,
            (Some(_), Some(_)) => CrossoverState::Tied,
            _ => CrossoverState::Undefined,
        }
    }
}

impl fmt::Display for CrossoverState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrossoverState::FastAboveSlow => write!(f, "fast above slow"),
            CrossoverState::FastBelowSlow => write!(f, "fast below slow"),
            CrossoverState::Tied => write!(f, "tied"),
            CrossoverState::Undefined => write!(f, "undefined"),
        }
    }
}

/// Account snapshot supplied by the caller for a single decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountState {
    has_open_position: bool,
    available_cash: Decimal,
}

impl AccountState {
    pub fn new(has_open_position: bool, available_cash: Decimal) -> SignalResult<Self> {
        if available_cash < Decimal::ZERO {
            return Err(SignalError::InvalidInput(format!(
                "available cash must not be negative, got {}",
                available_cash
            )));
        }

        Ok(Self {
            has_open_position,
            available_cash,
        })
    }

    pub fn has_open_position(&self) -> bool {
        self.has_open_position
    }

    pub fn available_cash(&self) -> Decimal {
        self.available_cash
    }
}

/// What the caller should do this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Close the whole open position
    Sell { symbol: String },
    /// Market order for `notional` worth of the symbol, time-in-force day
    Buy { symbol: String, notional: Decimal },
    Hold,
}

impl Action {
    pub fn is_hold(&self) -> bool {
        matches!(self, Action::Hold)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Sell { symbol } => write!(f, "SELL {}", symbol),
            Action::Buy { symbol, notional } => write!(f, "BUY {} notional={}", symbol, notional),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}
