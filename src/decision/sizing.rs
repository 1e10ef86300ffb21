use rust_decimal::Decimal;

/// Position sizing policy for entries
///
/// Given the cash the account can spend, returns the notional to commit.
pub trait SizingStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn notional(&self, available_cash: Decimal) -> Decimal;
}

/// Commit the entire available cash balance to a single order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllCash;

impl SizingStrategy for AllCash {
    fn name(&self) -> &str {
        "AllCash"
    }

    fn notional(&self, available_cash: Decimal) -> Decimal {
        available_cash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_all_cash_commits_everything() {
        assert_eq!(AllCash.notional(dec!(12345.67)), dec!(12345.67));
        assert_eq!(AllCash.notional(dec!(1.01)), dec!(1.01));
        assert_eq!(AllCash.name(), "AllCash");
    }
}
