// Broker collaborators: market clock, calendar, bars, account and orders
pub mod alpaca;
pub mod paper;

pub use alpaca::AlpacaClient;
pub use paper::PaperBroker;

use crate::models::Bar;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market clock snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    pub timestamp: DateTime<Utc>,
    pub is_open: bool,
}

/// One trading session from the market calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarDay {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerPosition {
    pub symbol: String,
    pub qty: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notional market order, time-in-force day
///
/// Market/day is the only order shape this bot ever sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub notional: Decimal,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub time_in_force: &'static str,
    pub client_order_id: String,
}

impl OrderRequest {
    pub fn market_day(symbol: &str, side: OrderSide, notional: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            notional,
            side,
            order_type: "market",
            time_in_force: "day",
            client_order_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Everything one trading cycle needs from the outside world
#[async_trait]
pub trait Broker: Send + Sync {
    async fn clock(&self) -> Result<Clock>;

    /// Trading sessions in ascending date order
    async fn calendar(&self) -> Result<Vec<CalendarDay>>;

    /// Bars for `symbol` between `start` and `end` inclusive, ascending
    async fn bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: &str,
    ) -> Result<Vec<Bar>>;

    async fn positions(&self) -> Result<Vec<BrokerPosition>>;

    async fn account(&self) -> Result<Account>;

    async fn cancel_all_orders(&self) -> Result<()>;

    async fn close_position(&self, symbol: &str) -> Result<()>;

    async fn submit_order(&self, order: &OrderRequest) -> Result<()>;
}
