//! Kraken spot REST client

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::BotResult;
use crate::types::{OrderBookDepth, PriceLevel, Quote};

use super::venues::{build_http_client, get_json, parse_decimal, split_instrument};
use super::{ExchangeClient, ExchangeError};

pub const KRAKEN_API_URL: &str = "https://api.kraken.com";

/// Every public Kraken response wraps its payload with an error list.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error: Vec<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TickerInfo {
    /// ask `[price, whole lot volume, lot volume]`
    a: Vec<String>,
    b: Vec<String>,
    /// volume `[today, last 24 hours]`
    v: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BookInfo {
    /// `[price, volume, timestamp]`, timestamp is numeric
    asks: Vec<Vec<serde_json::Value>>,
    bids: Vec<Vec<serde_json::Value>>,
}

pub struct KrakenClient {
    http: reqwest::Client,
    base_url: String,
}

impl KrakenClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> BotResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url
                .unwrap_or_else(|| KRAKEN_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// `BTC/USDT` -> `XBTUSDT`
    pub fn symbol(instrument: &str) -> Result<String, ExchangeError> {
        let (base, quote) = split_instrument(instrument)?;
        let asset = |a: &str| match a.to_ascii_uppercase().as_str() {
            "BTC" => "XBT".to_string(),
            other => other.to_string(),
        };
        Ok(format!("{}{}", asset(base), asset(quote)))
    }

    async fn public<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let url = format!("{}/0/public/{}", self.base_url, method);
        let envelope: Envelope<T> = get_json(&self.http, &url, query).await?;

        if let Some(first) = envelope.error.first() {
            return Err(Self::map_api_error(first));
        }
        envelope
            .result
            .ok_or_else(|| ExchangeError::Parse(format!("{} response has no result", method)))
    }

    fn map_api_error(message: &str) -> ExchangeError {
        if message.contains("Rate limit") || message.contains("Too many requests") {
            ExchangeError::RateLimited { retry_after: None }
        } else if message.starts_with("EQuery") {
            ExchangeError::InvalidSymbol(message.to_string())
        } else if message.starts_with("EService") {
            ExchangeError::Unavailable(message.to_string())
        } else if message.contains("Invalid key") || message.contains("Permission denied") {
            ExchangeError::Auth(message.to_string())
        } else {
            ExchangeError::Http(message.to_string())
        }
    }

    /// Kraken keys results by its own pair name, which may differ from the
    /// requested one, so take the single entry.
    fn single<T>(result: HashMap<String, T>, symbol: &str) -> Result<T, ExchangeError> {
        result
            .into_values()
            .next()
            .ok_or_else(|| ExchangeError::InvalidSymbol(symbol.to_string()))
    }

    fn field<'a>(values: &'a [String], index: usize, name: &str) -> Result<&'a str, ExchangeError> {
        values
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| ExchangeError::Parse(format!("missing ticker field {}[{}]", name, index)))
    }

    fn levels(raw: &[Vec<serde_json::Value>]) -> Result<Vec<PriceLevel>, ExchangeError> {
        raw.iter()
            .map(|entry| {
                let text = |i: usize| {
                    entry
                        .get(i)
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| ExchangeError::Parse("malformed book level".to_string()))
                };
                Ok(PriceLevel::new(
                    parse_decimal(text(0)?, "book price")?,
                    parse_decimal(text(1)?, "book volume")?,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl ExchangeClient for KrakenClient {
    fn venue(&self) -> &str {
        "kraken"
    }

    async fn get_quote(&self, instrument: &str) -> Result<Quote, ExchangeError> {
        let symbol = Self::symbol(instrument)?;
        let result: HashMap<String, TickerInfo> =
            self.public("Ticker", &[("pair", symbol.clone())]).await?;
        let ticker = Self::single(result, &symbol)?;

        Ok(Quote {
            venue: self.venue().to_string(),
            instrument: instrument.to_string(),
            bid: parse_decimal(Self::field(&ticker.b, 0, "b")?, "bid")?,
            ask: parse_decimal(Self::field(&ticker.a, 0, "a")?, "ask")?,
            bid_size: parse_decimal(Self::field(&ticker.b, 2, "b")?, "bid volume")?,
            ask_size: parse_decimal(Self::field(&ticker.a, 2, "a")?, "ask volume")?,
            volume_24h: Some(parse_decimal(Self::field(&ticker.v, 1, "v")?, "volume")?),
            timestamp: Utc::now(),
            latency_ms: 0,
        })
    }

    async fn get_depth(&self, instrument: &str, limit: u32) -> Result<OrderBookDepth, ExchangeError> {
        let symbol = Self::symbol(instrument)?;
        let result: HashMap<String, BookInfo> = self
            .public("Depth", &[("pair", symbol.clone()), ("count", limit.to_string())])
            .await?;
        let book = Self::single(result, &symbol)?;

        Ok(OrderBookDepth {
            venue: self.venue().to_string(),
            instrument: instrument.to_string(),
            bids: Self::levels(&book.bids)?,
            asks: Self::levels(&book.asks)?,
            timestamp: Utc::now(),
        })
    }

    async fn ping(&self) -> Result<(), ExchangeError> {
        let _: serde_json::Value = self.public("Time", &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    fn client(url: String) -> KrakenClient {
        KrakenClient::new(Some(url), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn maps_bitcoin_to_xbt() {
        assert_eq!(KrakenClient::symbol("BTC/USDT").unwrap(), "XBTUSDT");
        assert_eq!(KrakenClient::symbol("eth/usdt").unwrap(), "ETHUSDT");
    }

    #[tokio::test]
    async fn parses_ticker_under_venue_pair_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/0/public/Ticker")
            .match_query(Matcher::UrlEncoded("pair".into(), "XBTUSDT".into()))
            .with_status(200)
            .with_body(
                r#"{"error":[],"result":{"XBTUSDT":{"a":["67010.5","1","1.250"],"b":["67010.1","2","2.000"],"c":["67010.3","0.1"],"v":["100.0","2500.75"]}}}"#,
            )
            .create_async()
            .await;

        let quote = client(server.url()).get_quote("BTC/USDT").await.unwrap();
        assert_eq!(quote.venue, "kraken");
        assert_eq!(quote.ask, dec!(67010.5));
        assert_eq!(quote.bid_size, dec!(2.000));
        assert_eq!(quote.volume_24h, Some(dec!(2500.75)));
    }

    #[tokio::test]
    async fn parses_depth_with_numeric_timestamps() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/0/public/Depth")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"error":[],"result":{"XETHZUSD":{"asks":[["3000.5","0.500",1700000000]],"bids":[["3000.0","1.200",1700000000]]}}}"#,
            )
            .create_async()
            .await;

        let depth = client(server.url()).get_depth("ETH/USDT", 10).await.unwrap();
        assert_eq!(depth.asks, vec![PriceLevel::new(dec!(3000.5), dec!(0.500))]);
        assert_eq!(depth.bids[0].size, dec!(1.200));
    }

    #[tokio::test]
    async fn api_errors_are_classified() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/0/public/Ticker")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error":["EQuery:Unknown asset pair"]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/0/public/Time")
            .with_status(200)
            .with_body(r#"{"error":["EService:Unavailable"]}"#)
            .create_async()
            .await;

        let client = client(server.url());
        assert!(matches!(
            client.get_quote("FOO/USDT").await,
            Err(ExchangeError::InvalidSymbol(_))
        ));
        let err = client.ping().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Unavailable(_)));
        assert!(err.is_retryable());
    }
}
