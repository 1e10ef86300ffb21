use super::{Account, Broker, BrokerPosition, CalendarDay, Clock, OrderRequest};
use crate::config::AlpacaConfig;
use crate::models::Bar;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::{sleep, Duration};

const BARS_PAGE_LIMIT: u32 = 10_000;
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// Client for the Alpaca trading (v2) and market data (v2 stocks) REST APIs
#[derive(Clone)]
pub struct AlpacaClient {
    client: Client,
    trading_url: String,
    data_url: String,
}

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct ClockResponse {
    timestamp: DateTime<Utc>,
    is_open: bool,
}

#[derive(Debug, Deserialize)]
struct CalendarEntry {
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<RawBar>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBar {
    t: DateTime<Utc>,
    o: Decimal,
    h: Decimal,
    l: Decimal,
    c: Decimal,
    v: Decimal,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    symbol: String,
    qty: Decimal,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    cash: Decimal,
}

impl RawBar {
    fn into_bar(self) -> Result<Bar> {
        Bar::ohlcv(self.t, self.o, self.h, self.l, self.c, self.v)
            .with_context(|| format!("Rejected bar at {}", self.t))
    }
}

// ============== Implementation ==============

impl AlpacaClient {
    pub fn new(config: &AlpacaConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            HeaderValue::from_str(&config.key).context("ALPACA_KEY is not a valid header")?,
        );
        let mut secret =
            HeaderValue::from_str(&config.secret).context("ALPACA_SECRET is not a valid header")?;
        secret.set_sensitive(true);
        headers.insert("APCA-API-SECRET-KEY", secret);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            trading_url: config.url.trim_end_matches('/').to_string(),
            data_url: config.data_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET with retry on transport errors, 429 and 5xx
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut attempt = 1;

        loop {
            let outcome = self.client.get(url).query(query).send().await;
            let retryable = match &outcome {
                Ok(response) => {
                    response.status().is_server_error() || response.status().as_u16() == 429
                }
                Err(_) => true,
            };

            if !retryable || attempt >= MAX_RETRIES {
                let response = outcome.with_context(|| format!("GET {} failed", url))?;
                let response = check_status(response).await?;
                return response
                    .json()
                    .await
                    .with_context(|| format!("Failed to decode response from {}", url));
            }

            let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
            tracing::warn!(
                "Attempt {}/{} for {} failed. Retrying in {}ms...",
                attempt,
                MAX_RETRIES,
                url,
                backoff_ms
            );
            sleep(Duration::from_millis(backoff_ms)).await;
            attempt += 1;
        }
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("Alpaca API error ({}) from {}: {}", status, url, body)
}

#[async_trait]
impl Broker for AlpacaClient {
    async fn clock(&self) -> Result<Clock> {
        let url = format!("{}/v2/clock", self.trading_url);
        let clock: ClockResponse = self.get_json(&url, &[]).await?;

        Ok(Clock {
            timestamp: clock.timestamp,
            is_open: clock.is_open,
        })
    }

    async fn calendar(&self) -> Result<Vec<CalendarDay>> {
        let url = format!("{}/v2/calendar", self.trading_url);
        let entries: Vec<CalendarEntry> = self.get_json(&url, &[]).await?;

        let mut days: Vec<CalendarDay> = entries
            .into_iter()
            .map(|entry| CalendarDay { date: entry.date })
            .collect();
        days.sort();

        tracing::debug!("Loaded {} calendar sessions", days.len());
        Ok(days)
    }

    async fn bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: &str,
    ) -> Result<Vec<Bar>> {
        let url = format!("{}/v2/stocks/{}/bars", self.data_url, symbol);
        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("start", start.to_string()),
                ("end", end.to_string()),
                ("timeframe", timeframe.to_string()),
                ("limit", BARS_PAGE_LIMIT.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let page: BarsResponse = self.get_json(&url, &query).await?;
            for raw in page.bars.unwrap_or_default() {
                bars.push(raw.into_bar()?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(
            "Fetched {} {} bars for {} ({} to {})",
            bars.len(),
            timeframe,
            symbol,
            start,
            end
        );
        Ok(bars)
    }

    async fn positions(&self) -> Result<Vec<BrokerPosition>> {
        let url = format!("{}/v2/positions", self.trading_url);
        let positions: Vec<PositionResponse> = self.get_json(&url, &[]).await?;

        Ok(positions
            .into_iter()
            .map(|p| BrokerPosition {
                symbol: p.symbol,
                qty: p.qty,
            })
            .collect())
    }

    async fn account(&self) -> Result<Account> {
        let url = format!("{}/v2/account", self.trading_url);
        let account: AccountResponse = self.get_json(&url, &[]).await?;

        Ok(Account { cash: account.cash })
    }

    async fn cancel_all_orders(&self) -> Result<()> {
        self.delete(&format!("{}/v2/orders", self.trading_url)).await
    }

    async fn close_position(&self, symbol: &str) -> Result<()> {
        self.delete(&format!("{}/v2/positions/{}", self.trading_url, symbol))
            .await
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<()> {
        let url = format!("{}/v2/orders", self.trading_url);
        let response = self
            .client
            .post(&url)
            .json(order)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        check_status(response).await?;

        tracing::info!(
            "Submitted {} order for {} notional={} ({})",
            order.side,
            order.symbol,
            order.notional,
            order.client_order_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::OrderSide;
    use mockito::{Matcher, Server};
    use rust_decimal_macros::dec;

    fn client_for(server: &Server) -> AlpacaClient {
        AlpacaClient::new(&AlpacaConfig {
            key: "test-key".to_string(),
            secret: "test-secret".to_string(),
            url: server.url(),
            data_url: server.url(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_clock_sends_credentials() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/clock")
            .match_header("APCA-API-KEY-ID", "test-key")
            .match_header("APCA-API-SECRET-KEY", "test-secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"timestamp":"2024-03-05T10:15:00-05:00","is_open":true,
                    "next_open":"2024-03-06T09:30:00-05:00","next_close":"2024-03-05T16:00:00-05:00"}"#,
            )
            .create_async()
            .await;

        let clock = client_for(&server).clock().await.unwrap();
        assert!(clock.is_open);
        assert_eq!(clock.timestamp.to_rfc3339(), "2024-03-05T15:15:00+00:00");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_calendar_is_sorted() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/calendar")
            .with_status(200)
            .with_body(
                r#"[{"date":"2024-03-05","open":"09:30","close":"16:00"},
                    {"date":"2024-03-04","open":"09:30","close":"16:00"}]"#,
            )
            .create_async()
            .await;

        let days = client_for(&server).calendar().await.unwrap();
        assert_eq!(days.len(), 2);
        assert!(days[0].date < days[1].date);
    }

    #[tokio::test]
    async fn test_bars_follow_pagination() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/v2/stocks/MSFT/bars")
            .match_query(Matcher::Exact(
                "start=2024-03-01&end=2024-03-05&timeframe=1Day&limit=10000".to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"bars":[{"t":"2024-03-01T05:00:00Z","o":410.1,"h":415.0,"l":409.0,"c":414.5,"v":1000,"n":10,"vw":412.0}],
                    "symbol":"MSFT","next_page_token":"abc"}"#,
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v2/stocks/MSFT/bars")
            .match_query(Matcher::UrlEncoded("page_token".into(), "abc".into()))
            .with_status(200)
            .with_body(
                r#"{"bars":[{"t":"2024-03-04T05:00:00Z","o":414.0,"h":416.0,"l":411.0,"c":415.25,"v":900,"n":9,"vw":414.0}],
                    "symbol":"MSFT","next_page_token":null}"#,
            )
            .create_async()
            .await;

        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let bars = client_for(&server)
            .bars("MSFT", start, end, "1Day")
            .await
            .unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close(), dec!(414.5));
        assert_eq!(bars[1].close(), dec!(415.25));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_bars_page() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/stocks/MSFT/bars")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"bars":null,"symbol":"MSFT","next_page_token":null}"#)
            .create_async()
            .await;

        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bars = client_for(&server)
            .bars("MSFT", day, day, "1Day")
            .await
            .unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_positions_and_account() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/positions")
            .with_status(200)
            .with_body(r#"[{"symbol":"MSFT","qty":"12","side":"long"}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v2/account")
            .with_status(200)
            .with_body(r#"{"id":"abc","cash":"2500.75","buying_power":"5001.50"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let positions = client.positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].symbol, "MSFT");
        assert_eq!(positions[0].qty, dec!(12));

        let account = client.account().await.unwrap();
        assert_eq!(account.cash, dec!(2500.75));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/account")
            .with_status(403)
            .with_body(r#"{"message":"forbidden"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client_for(&server).account().await.unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("forbidden"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_order_endpoints() {
        let mut server = Server::new_async().await;
        let cancel = server
            .mock("DELETE", "/v2/orders")
            .with_status(207)
            .with_body("[]")
            .create_async()
            .await;
        let close = server
            .mock("DELETE", "/v2/positions/MSFT")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let submit = server
            .mock("POST", "/v2/orders")
            .match_body(Matcher::PartialJsonString(
                r#"{"symbol":"MSFT","notional":"1500.5","side":"buy","type":"market","time_in_force":"day"}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"id":"order-1","status":"accepted"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client.cancel_all_orders().await.unwrap();
        client.close_position("MSFT").await.unwrap();
        client
            .submit_order(&OrderRequest::market_day("MSFT", OrderSide::Buy, dec!(1500.5)))
            .await
            .unwrap();

        cancel.assert_async().await;
        close.assert_async().await;
        submit.assert_async().await;
    }
}
