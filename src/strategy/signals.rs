use crate::error::{SignalError, SignalResult};
use crate::models::CrossoverState;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Moving average readings at a single bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossoverSignal {
    pub as_of: DateTime<Utc>,
    pub close: Decimal,
    pub fast: Option<Decimal>,
    pub slow: Option<Decimal>,
    pub state: CrossoverState,
}

impl CrossoverSignal {
    pub fn new(
        as_of: DateTime<Utc>,
        close: Decimal,
        fast: Option<Decimal>,
        slow: Option<Decimal>,
    ) -> Self {
        Self {
            as_of,
            close,
            fast,
            slow,
            state: CrossoverState::from_values(fast, slow),
        }
    }
}

/// Fails with `OutOfOrderBar` unless `current` is strictly later than `previous`
pub(crate) fn check_next_timestamp(
    previous: DateTime<Utc>,
    current: DateTime<Utc>,
) -> SignalResult<()> {
    if current <= previous {
        return Err(SignalError::OutOfOrderBar { previous, current });
    }
    Ok(())
}
