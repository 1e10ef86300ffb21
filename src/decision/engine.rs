use super::sizing::{AllCash, SizingStrategy};
use crate::error::SignalResult;
use crate::models::{AccountState, Action};
use rust_decimal::Decimal;

/// Cash must be strictly above this to open a position
pub const MIN_ORDER_CASH: Decimal = Decimal::ONE;

/// Maps moving average readings and an account snapshot to an action
///
/// Holds no state between calls. Rules, first match wins:
/// 1. Either average unready: hold
/// 2. Position open and fast < slow: sell
/// 3. Cash > 1.00 and fast > slow: buy, sized by the sizing policy
/// 4. Otherwise hold (this includes fast == slow)
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine<S: SizingStrategy = AllCash> {
    sizing: S,
}

impl<S: SizingStrategy> DecisionEngine<S> {
    pub fn new(sizing: S) -> Self {
        Self { sizing }
    }

    pub fn sizing(&self) -> &S {
        &self.sizing
    }

    pub fn decide(
        &self,
        symbol: &str,
        fast: Option<Decimal>,
        slow: Option<Decimal>,
        account: &AccountState,
    ) -> Action {
        let (fast, slow) = match (fast, slow) {
            (Some(fast), Some(slow)) => (fast, slow),
            _ => return Action::Hold,
        };

        if account.has_open_position() && fast < slow {
            return Action::Sell {
                symbol: symbol.to_string(),
            };
        }

        if account.available_cash() > MIN_ORDER_CASH && fast > slow {
            return Action::Buy {
                symbol: symbol.to_string(),
                notional: self.sizing.notional(account.available_cash()),
            };
        }

        Action::Hold
    }
}

/// Decide with the default all-cash sizing, validating the raw account inputs
pub fn decide(
    symbol: &str,
    fast: Option<Decimal>,
    slow: Option<Decimal>,
    has_open_position: bool,
    available_cash: Decimal,
) -> SignalResult<Action> {
    let account = AccountState::new(has_open_position, available_cash)?;
    Ok(DecisionEngine::<AllCash>::default().decide(symbol, fast, slow, &account))
}
