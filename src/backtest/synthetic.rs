use crate::error::SignalResult;
use crate::models::Bar;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Price paths the generator can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Steady uptrend with noise (+0.4% daily drift)
    Uptrend,
    /// Steady downtrend with noise (-0.4% daily drift)
    Downtrend,
    /// Mean-reverting chop around the base price
    Sideways,
    /// Uptrend for the first half, downtrend for the second
    Reversal,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 4] = [
        MarketScenario::Uptrend,
        MarketScenario::Downtrend,
        MarketScenario::Sideways,
        MarketScenario::Reversal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MarketScenario::Uptrend => "Uptrend",
            MarketScenario::Downtrend => "Downtrend",
            MarketScenario::Sideways => "Sideways",
            MarketScenario::Reversal => "Reversal",
        }
    }
}

// Prices never drop below this
const PRICE_FLOOR: Decimal = Decimal::ONE;

/// Seeded generator of daily bars
pub struct SyntheticBarGenerator {
    rng: StdRng,
    base_price: Decimal,
    start: DateTime<Utc>,
}

impl SyntheticBarGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: dec!(150),
            start: Utc::now() - Duration::days(1000),
        }
    }

    pub fn with_base_price(mut self, base_price: Decimal) -> Self {
        self.base_price = base_price;
        self
    }

    /// Timestamp of the first bar; later bars follow one day apart
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    pub fn generate(&mut self, scenario: MarketScenario, num_bars: usize) -> SignalResult<Vec<Bar>> {
        let mut bars = Vec::with_capacity(num_bars);
        let mut price = self.base_price;

        for i in 0..num_bars {
            // Drift and noise in basis points
            let drift_bps = match scenario {
                MarketScenario::Uptrend => 40,
                MarketScenario::Downtrend => -40,
                MarketScenario::Sideways => 0,
                MarketScenario::Reversal if i < num_bars / 2 => 40,
                MarketScenario::Reversal => -40,
            };
            let noise_bps: i64 = self.rng.gen_range(-60..=60);
            price += price * Decimal::new(drift_bps + noise_bps, 4);

            if scenario == MarketScenario::Sideways {
                // 10% pull back to the base price
                price += (self.base_price - price) * dec!(0.1);
            }

            price = price.round_dp(2).max(PRICE_FLOOR);
            let timestamp = self.start + Duration::days(i as i64);
            bars.push(self.create_bar(price, timestamp)?);
        }

        Ok(bars)
    }

    /// Realistic OHLC around a close
    fn create_bar(&mut self, close: Decimal, timestamp: DateTime<Utc>) -> SignalResult<Bar> {
        let high = (close * (Decimal::ONE + Decimal::new(self.rng.gen_range(0..=30), 4))).round_dp(2);
        let low = (close * (Decimal::ONE - Decimal::new(self.rng.gen_range(0..=30), 4))).round_dp(2);
        let open = (close * (Decimal::ONE + Decimal::new(self.rng.gen_range(-30..=30), 4)))
            .round_dp(2)
            .clamp(low, high);
        let volume = Decimal::from(self.rng.gen_range(700_000..1_300_000_i64));

        Bar::ohlcv(timestamp, open, high, low, close, volume)
    }
}
