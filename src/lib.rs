// Core modules
pub mod backtest;
pub mod broker;
pub mod config;
pub mod decision;
pub mod error;
pub mod indicators;
pub mod models;
pub mod strategy;
pub mod trader;

// Re-export commonly used types
pub use decision::{decide, DecisionEngine, SizingStrategy};
pub use error::{SignalError, SignalResult};
pub use indicators::MovingAverageTracker;
pub use models::*;
pub use strategy::Strategy;
pub use trader::{RunOutcome, Trader};
