//! Binance spot REST client

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::BotResult;
use crate::types::{OrderBookDepth, PriceLevel, Quote};

use super::venues::{build_http_client, get_json, parse_decimal, split_instrument};
use super::{ExchangeClient, ExchangeError};

pub const BINANCE_API_URL: &str = "https://api.binance.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    bid_price: String,
    bid_qty: String,
    ask_price: String,
    ask_qty: String,
    volume: String,
}

#[derive(Debug, Deserialize)]
struct DepthResponse {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

pub struct BinanceClient {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> BotResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url
                .unwrap_or_else(|| BINANCE_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// `BTC/USDT` -> `BTCUSDT`
    pub fn symbol(instrument: &str) -> Result<String, ExchangeError> {
        let (base, quote) = split_instrument(instrument)?;
        Ok(format!("{}{}", base, quote).to_ascii_uppercase())
    }

    fn levels(raw: &[[String; 2]]) -> Result<Vec<PriceLevel>, ExchangeError> {
        raw.iter()
            .map(|[price, size]| {
                Ok(PriceLevel::new(
                    parse_decimal(price, "depth price")?,
                    parse_decimal(size, "depth size")?,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    fn venue(&self) -> &str {
        "binance"
    }

    async fn get_quote(&self, instrument: &str) -> Result<Quote, ExchangeError> {
        let symbol = Self::symbol(instrument)?;
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let ticker: Ticker24h = get_json(&self.http, &url, &[("symbol", symbol)]).await?;

        Ok(Quote {
            venue: self.venue().to_string(),
            instrument: instrument.to_string(),
            bid: parse_decimal(&ticker.bid_price, "bidPrice")?,
            ask: parse_decimal(&ticker.ask_price, "askPrice")?,
            bid_size: parse_decimal(&ticker.bid_qty, "bidQty")?,
            ask_size: parse_decimal(&ticker.ask_qty, "askQty")?,
            volume_24h: Some(parse_decimal(&ticker.volume, "volume")?),
            timestamp: Utc::now(),
            latency_ms: 0,
        })
    }

    async fn get_depth(&self, instrument: &str, limit: u32) -> Result<OrderBookDepth, ExchangeError> {
        let symbol = Self::symbol(instrument)?;
        let url = format!("{}/api/v3/depth", self.base_url);
        let depth: DepthResponse = get_json(
            &self.http,
            &url,
            &[("symbol", symbol), ("limit", limit.to_string())],
        )
        .await?;

        Ok(OrderBookDepth {
            venue: self.venue().to_string(),
            instrument: instrument.to_string(),
            bids: Self::levels(&depth.bids)?,
            asks: Self::levels(&depth.asks)?,
            timestamp: Utc::now(),
        })
    }

    async fn ping(&self) -> Result<(), ExchangeError> {
        let url = format!("{}/api/v3/ping", self.base_url);
        let _: serde_json::Value = get_json(&self.http, &url, &[]).await?;
        Ok(())
    }
}
