use super::{Account, Broker, BrokerPosition, CalendarDay, Clock, OrderRequest, OrderSide};
use crate::models::Bar;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct PaperState {
    clock: Clock,
    calendar: Vec<CalendarDay>,
    bars: Vec<Bar>,
    cash: Decimal,
    positions: HashMap<String, Decimal>,
    open_orders: usize,
    canceled_orders: usize,
    submitted: Vec<OrderRequest>,
    closed: Vec<String>,
}

/// In-memory broker
///
/// Serves a fixed clock, calendar and bar history for a single symbol and fills
/// orders immediately at the close of the last bar.
#[derive(Clone)]
pub struct PaperBroker {
    state: Arc<Mutex<PaperState>>,
}

impl PaperBroker {
    pub fn new(now: DateTime<Utc>, is_open: bool, cash: Decimal) -> Self {
        Self {
            state: Arc::new(Mutex::new(PaperState {
                clock: Clock {
                    timestamp: now,
                    is_open,
                },
                calendar: Vec::new(),
                bars: Vec::new(),
                cash,
                positions: HashMap::new(),
                open_orders: 0,
                canceled_orders: 0,
                submitted: Vec::new(),
                closed: Vec::new(),
            })),
        }
    }

    /// Use the bar dates as the calendar, plus `now` as the current session
    pub fn with_bars(self, bars: Vec<Bar>) -> Result<Self> {
        {
            let mut state = self.lock()?;
            let mut calendar: Vec<CalendarDay> = bars
                .iter()
                .map(|b| CalendarDay {
                    date: b.timestamp().date_naive(),
                })
                .collect();
            calendar.push(CalendarDay {
                date: state.clock.timestamp.date_naive(),
            });
            calendar.sort();
            calendar.dedup();

            state.calendar = calendar;
            state.bars = bars;
        }
        Ok(self)
    }

    pub fn with_calendar(self, calendar: Vec<CalendarDay>) -> Result<Self> {
        self.lock()?.calendar = calendar;
        Ok(self)
    }

    pub fn with_position(self, symbol: &str, qty: Decimal) -> Result<Self> {
        self.lock()?.positions.insert(symbol.to_string(), qty);
        Ok(self)
    }

    /// Pretend there are resting orders that a cancel-all should clear
    pub fn with_open_orders(self, count: usize) -> Result<Self> {
        self.lock()?.open_orders = count;
        Ok(self)
    }

    pub fn submitted_orders(&self) -> Result<Vec<OrderRequest>> {
        Ok(self.lock()?.submitted.clone())
    }

    pub fn closed_positions(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.closed.clone())
    }

    pub fn open_orders(&self) -> Result<usize> {
        Ok(self.lock()?.open_orders)
    }

    pub fn canceled_orders(&self) -> Result<usize> {
        Ok(self.lock()?.canceled_orders)
    }

    pub fn cash(&self) -> Result<Decimal> {
        Ok(self.lock()?.cash)
    }

    pub fn position(&self, symbol: &str) -> Result<Option<Decimal>> {
        Ok(self.lock()?.positions.get(symbol).copied())
    }

    fn lock(&self) -> Result<MutexGuard<'_, PaperState>> {
        self.state.lock().map_err(|e| anyhow!(e.to_string()))
    }
}

impl PaperState {
    fn last_price(&self) -> Result<Decimal> {
        self.bars
            .last()
            .map(|b| b.close())
            .context("Paper broker has no bars to price a fill")
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn clock(&self) -> Result<Clock> {
        Ok(self.lock()?.clock.clone())
    }

    async fn calendar(&self) -> Result<Vec<CalendarDay>> {
        Ok(self.lock()?.calendar.clone())
    }

    async fn bars(
        &self,
        _symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        _timeframe: &str,
    ) -> Result<Vec<Bar>> {
        let state = self.lock()?;
        Ok(state
            .bars
            .iter()
            .filter(|b| {
                let date = b.timestamp().date_naive();
                date >= start && date <= end
            })
            .cloned()
            .collect())
    }

    async fn positions(&self) -> Result<Vec<BrokerPosition>> {
        let state = self.lock()?;
        Ok(state
            .positions
            .iter()
            .map(|(symbol, qty)| BrokerPosition {
                symbol: symbol.clone(),
                qty: *qty,
            })
            .collect())
    }

    async fn account(&self) -> Result<Account> {
        Ok(Account {
            cash: self.lock()?.cash,
        })
    }

    async fn cancel_all_orders(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.canceled_orders += state.open_orders;
        state.open_orders = 0;
        Ok(())
    }

    async fn close_position(&self, symbol: &str) -> Result<()> {
        let mut state = self.lock()?;
        let price = state.last_price()?;
        let qty = state
            .positions
            .remove(symbol)
            .with_context(|| format!("No open position for {}", symbol))?;

        state.cash += qty * price;
        state.closed.push(symbol.to_string());
        Ok(())
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<()> {
        let mut state = self.lock()?;
        if order.side != OrderSide::Buy {
            anyhow::bail!("Paper broker only accepts notional buys, got {}", order.side);
        }
        if order.notional > state.cash {
            anyhow::bail!(
                "Insufficient cash: order notional {} exceeds {}",
                order.notional,
                state.cash
            );
        }

        let price = state.last_price()?;
        state.cash -= order.notional;
        *state
            .positions
            .entry(order.symbol.clone())
            .or_insert(Decimal::ZERO) += order.notional / price;
        state.submitted.push(order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn sample_bars() -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap();
        [dec!(10), dec!(20), dec!(40)]
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(start + Duration::days(i as i64), c).unwrap())
            .collect()
    }

    fn broker() -> PaperBroker {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap();
        PaperBroker::new(now, true, dec!(1000))
            .with_bars(sample_bars())
            .unwrap()
    }

    #[test]
    fn test_calendar_from_bars() {
        let calendar = tokio_test::block_on(broker().calendar()).unwrap();
        let dates: Vec<String> = calendar.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-04"]);
    }

    #[tokio::test]
    async fn test_bars_filtered_by_date() {
        let broker = broker();
        let start = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();

        let bars = broker.bars("MSFT", start, end, "1Day").await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close(), dec!(20));
    }

    #[tokio::test]
    async fn test_buy_fills_at_last_close() {
        let broker = broker();
        let order = OrderRequest::market_day("MSFT", OrderSide::Buy, dec!(400));

        broker.submit_order(&order).await.unwrap();

        assert_eq!(broker.cash().unwrap(), dec!(600));
        assert_eq!(broker.position("MSFT").unwrap(), Some(dec!(10)));
        assert_eq!(broker.submitted_orders().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_buy_rejects_excess_notional() {
        let broker = broker();
        let order = OrderRequest::market_day("MSFT", OrderSide::Buy, dec!(1000.01));

        assert!(broker.submit_order(&order).await.is_err());
        assert_eq!(broker.cash().unwrap(), dec!(1000));
    }

    #[tokio::test]
    async fn test_close_position_credits_cash() {
        let broker = broker().with_position("MSFT", dec!(5)).unwrap();

        broker.close_position("MSFT").await.unwrap();

        assert_eq!(broker.cash().unwrap(), dec!(1200));
        assert_eq!(broker.position("MSFT").unwrap(), None);
        assert_eq!(broker.closed_positions().unwrap(), vec!["MSFT".to_string()]);
        assert!(broker.close_position("MSFT").await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_all_orders() {
        let broker = broker().with_open_orders(3).unwrap();

        broker.cancel_all_orders().await.unwrap();

        assert_eq!(broker.open_orders().unwrap(), 0);
        assert_eq!(broker.canceled_orders().unwrap(), 3);
    }
}
