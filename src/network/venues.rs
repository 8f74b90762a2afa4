//! Exchange client abstraction and venue registry

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::CollectorSettings;
use crate::errors::{BotError, BotResult};
use crate::types::{OrderBookDepth, Quote};

use super::binance::BinanceClient;
use super::kraken::KrakenClient;

pub const SUPPORTED_VENUES: &[&str] = &["binance", "kraken"];

#[derive(Error, Debug, Clone)]
pub enum ExchangeError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("http error: {0}")]
    Http(String),

    #[error("venue unavailable: {0}")]
    Unavailable(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("malformed response: {0}")]
    Parse(String),
}

impl ExchangeError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Timeout(_)
                | ExchangeError::RateLimited { .. }
                | ExchangeError::Http(_)
                | ExchangeError::Unavailable(_)
        )
    }

    /// Credential or account problems that no amount of retrying will fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExchangeError::Auth(_))
    }
}

/// Read-only market data access for one venue.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    fn venue(&self) -> &str;

    async fn get_quote(&self, instrument: &str) -> Result<Quote, ExchangeError>;

    async fn get_depth(&self, instrument: &str, limit: u32) -> Result<OrderBookDepth, ExchangeError>;

    async fn ping(&self) -> Result<(), ExchangeError>;
}

pub struct VenueRegistry;

impl VenueRegistry {
    pub fn is_supported(venue: &str) -> bool {
        SUPPORTED_VENUES.contains(&venue)
    }

    pub fn create(venue: &str, settings: &CollectorSettings) -> BotResult<Arc<dyn ExchangeClient>> {
        let base_url = settings.base_urls.get(venue).cloned();
        let client: Arc<dyn ExchangeClient> = match venue {
            "binance" => Arc::new(BinanceClient::new(base_url, settings.request_timeout)?),
            "kraken" => Arc::new(KrakenClient::new(base_url, settings.request_timeout)?),
            other => {
                return Err(BotError::UnknownVenue {
                    venue: other.to_string(),
                });
            }
        };
        Ok(client)
    }

    pub fn create_all(
        venues: &[String],
        settings: &CollectorSettings,
    ) -> BotResult<HashMap<String, Arc<dyn ExchangeClient>>> {
        venues
            .iter()
            .map(|venue| Ok((venue.clone(), Self::create(venue, settings)?)))
            .collect()
    }
}

/// Shared reqwest client construction for venue clients.
pub(crate) fn build_http_client(timeout: Duration) -> BotResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cex-arb-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BotError::fatal("Failed to build HTTP client", e))
}

/// Maps transport failures and non-success statuses onto [`ExchangeError`].
pub(crate) async fn get_json<T>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, ExchangeError>
where
    T: serde::de::DeserializeOwned,
{
    let response = client.get(url).query(query).send().await.map_err(|e| {
        if e.is_timeout() {
            ExchangeError::Timeout(Duration::ZERO)
        } else {
            ExchangeError::Http(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        return Err(match status.as_u16() {
            429 | 418 => ExchangeError::RateLimited { retry_after },
            401 | 403 => ExchangeError::Auth(format!("{} {}", status, body)),
            400 | 404 => ExchangeError::InvalidSymbol(format!("{} {}", status, body)),
            s if s >= 500 => ExchangeError::Unavailable(format!("{} {}", status, body)),
            _ => ExchangeError::Http(format!("{} {}", status, body)),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ExchangeError::Parse(e.to_string()))
}

pub(crate) fn parse_decimal(raw: &str, field: &str) -> Result<Decimal, ExchangeError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| ExchangeError::Parse(format!("{} '{}': {}", field, raw, e)))
}

/// Splits `BASE/QUOTE` into its two assets.
pub(crate) fn split_instrument(instrument: &str) -> Result<(&str, &str), ExchangeError> {
    match instrument.split_once('/') {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() => Ok((base, quote)),
        _ => Err(ExchangeError::InvalidSymbol(instrument.to_string())),
    }
}
