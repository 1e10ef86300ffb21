use crate::error::SignalError;
use crate::strategy::CrossoverSettings;
use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";
const PAPER_API_HOST: &str = "paper-api.alpaca.markets";

/// What to trade and how to read the bars (env prefix `CROSSBOT_`)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StrategyConfig {
    pub symbol: String,
    pub fast_window: usize,
    pub slow_window: usize,
    /// Trading sessions of history to request
    pub lookback_days: usize,
    pub timeframe: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbol: "MSFT".to_string(),
            fast_window: 7,
            slow_window: 14,
            lookback_days: 365,
            timeframe: "1Day".to_string(),
        }
    }
}

impl StrategyConfig {
    /// Load from `CROSSBOT_*` environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        Self::from_environment(Environment::with_prefix("CROSSBOT"))
    }

    fn from_environment(env: Environment) -> Result<Self> {
        let defaults = Self::default();
        let config: Self = Config::builder()
            .set_default("symbol", defaults.symbol)?
            .set_default("fast_window", defaults.fast_window as i64)?
            .set_default("slow_window", defaults.slow_window as i64)?
            .set_default("lookback_days", defaults.lookback_days as i64)?
            .set_default("timeframe", defaults.timeframe)?
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to build strategy configuration")?
            .try_deserialize()
            .context("Failed to parse strategy configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        if self.symbol.trim().is_empty() {
            return Err(SignalError::InvalidConfiguration(
                "symbol must not be empty".to_string(),
            ));
        }
        if self.lookback_days == 0 {
            return Err(SignalError::InvalidConfiguration(
                "lookback_days must be at least 1".to_string(),
            ));
        }
        self.crossover_settings().validate()
    }

    pub fn crossover_settings(&self) -> CrossoverSettings {
        CrossoverSettings {
            fast_window: self.fast_window,
            slow_window: self.slow_window,
        }
    }
}

/// Broker credentials and endpoints (env prefix `ALPACA_`)
#[derive(Clone, Deserialize, PartialEq)]
pub struct AlpacaConfig {
    pub key: String,
    pub secret: String,
    /// Trading API base URL
    pub url: String,
    pub data_url: String,
}

// Keep the secret out of logs
impl std::fmt::Debug for AlpacaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaConfig")
            .field("key", &self.key)
            .field("secret", &"***")
            .field("url", &self.url)
            .field("data_url", &self.data_url)
            .finish()
    }
}

impl AlpacaConfig {
    /// Load `ALPACA_KEY`, `ALPACA_SECRET`, `ALPACA_URL` and optional `ALPACA_DATA_URL`
    pub fn from_env() -> Result<Self> {
        Self::from_environment(Environment::with_prefix("ALPACA"))
    }

    fn from_environment(env: Environment) -> Result<Self> {
        Config::builder()
            .set_default("data_url", DEFAULT_DATA_URL)?
            .add_source(env)
            .build()
            .context("Failed to build Alpaca configuration")?
            .try_deserialize()
            .context("ALPACA_KEY, ALPACA_SECRET and ALPACA_URL must be set")
    }

    pub fn is_paper(&self) -> bool {
        self.url.contains(PAPER_API_HOST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)], prefix: &str) -> Environment {
        let source: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(prefix).source(Some(source))
    }

    #[test]
    fn test_strategy_defaults() {
        let config = StrategyConfig::from_environment(env_from(&[], "CROSSBOT")).unwrap();
        assert_eq!(config, StrategyConfig::default());
        assert_eq!(config.crossover_settings(), CrossoverSettings::default());
    }

    #[test]
    fn test_strategy_env_overrides() {
        let env = env_from(
            &[
                ("CROSSBOT_SYMBOL", "AAPL"),
                ("CROSSBOT_FAST_WINDOW", "5"),
                ("CROSSBOT_SLOW_WINDOW", "20"),
            ],
            "CROSSBOT",
        );

        let config = StrategyConfig::from_environment(env).unwrap();
        assert_eq!(config.symbol, "AAPL");
        assert_eq!(config.fast_window, 5);
        assert_eq!(config.slow_window, 20);
        assert_eq!(config.lookback_days, 365);
    }

    #[test]
    fn test_zero_window_rejected() {
        let env = env_from(&[("CROSSBOT_FAST_WINDOW", "0")], "CROSSBOT");
        let err = StrategyConfig::from_environment(env).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_zero_lookback_rejected() {
        let config = StrategyConfig {
            lookback_days: 0,
            ..StrategyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SignalError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_alpaca_config() {
        let env = env_from(
            &[
                ("ALPACA_KEY", "key-id"),
                ("ALPACA_SECRET", "shh"),
                ("ALPACA_URL", "https://paper-api.alpaca.markets"),
            ],
            "ALPACA",
        );

        let config = AlpacaConfig::from_environment(env).unwrap();
        assert_eq!(config.key, "key-id");
        assert_eq!(config.data_url, DEFAULT_DATA_URL);
        assert!(config.is_paper());
        assert!(!format!("{:?}", config).contains("shh"));
    }

    #[test]
    fn test_alpaca_config_requires_credentials() {
        let env = env_from(&[("ALPACA_URL", "https://api.alpaca.markets")], "ALPACA");
        assert!(AlpacaConfig::from_environment(env).is_err());
    }
}
