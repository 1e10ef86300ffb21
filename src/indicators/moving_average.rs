use crate::error::{SignalError, SignalResult};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Rolling simple moving average over a fixed number of closes
///
/// Holds at most `window` prices. The average is recomputed from the buffered prices on
/// every read, so no running sum is carried between updates.
#[derive(Debug, Clone)]
pub struct MovingAverageTracker {
    window: usize,
    prices: VecDeque<Decimal>,
}

impl MovingAverageTracker {
    pub fn new(window: usize) -> SignalResult<Self> {
        if window == 0 {
            return Err(SignalError::InvalidConfiguration(
                "moving average window must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            window,
            prices: VecDeque::with_capacity(window),
        })
    }

    /// Push the next close, evicting the oldest once the window is full
    ///
    /// Must be called once per bar in chronological order.
    pub fn update(&mut self, price: Decimal) -> SignalResult<()> {
        if price <= Decimal::ZERO {
            return Err(SignalError::InvalidInput(format!(
                "price must be positive, got {}",
                price
            )));
        }

        if self.prices.len() == self.window {
            self.prices.pop_front();
        }
        self.prices.push_back(price);

        Ok(())
    }

    /// Mean of the buffered prices, `None` until `window` updates have been seen
    pub fn current_value(&self) -> Option<Decimal> {
        if !self.is_ready() {
            return None;
        }

        let sum: Decimal = self.prices.iter().sum();
        Some(sum / Decimal::from(self.window))
    }

    pub fn is_ready(&self) -> bool {
        self.prices.len() == self.window
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of prices currently buffered (never more than `window`)
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
