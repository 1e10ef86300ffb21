use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the signal core (trackers, bar ingestion, decision inputs)
///
/// Every variant is a caller contract violation. Nothing here is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No bars supplied, cannot derive a signal")]
    EmptyBarSequence,

    #[error("Out of order bar: {current} does not follow {previous}")]
    OutOfOrderBar {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type SignalResult<T> = std::result::Result<T, SignalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_out_of_order_message_names_both_timestamps() {
        let previous = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let current = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();

        let msg = SignalError::OutOfOrderBar { previous, current }.to_string();
        assert!(msg.contains("2024-03-05"));
        assert!(msg.contains("2024-03-04"));
    }

    #[test]
    fn test_converts_into_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(SignalError::EmptyBarSequence)?;
            Ok(())
        }

        let err = fails().unwrap_err();
        assert!(err.to_string().contains("No bars"));
    }
}
