// Trading strategy module
pub mod sma_crossover;
pub mod signals;

pub use signals::CrossoverSignal;
pub use sma_crossover::{CrossoverSettings, CrossoverTracker, SmaCrossoverStrategy};

use crate::error::SignalResult;
use crate::models::Bar;

/// Base trait for signal strategies
pub trait Strategy: Send + Sync {
    /// Derive the signal at the last bar of an ordered, non-empty bar sequence
    fn evaluate(&self, bars: &[Bar]) -> SignalResult<CrossoverSignal>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Bars needed before the signal can be anything other than undefined
    fn min_bars_required(&self) -> usize;
}
