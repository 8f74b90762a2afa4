//! Concurrent quote and depth collection across venues

use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::CollectorSettings;
use crate::errors::{BotError, BotResult};
use crate::network::{ExchangeClient, ExchangeError, RetryConfig, RetryFailure, retry_with_backoff};
use crate::types::{OrderBookDepth, PairKey, Quote};
use crate::validation::validate_quote;

/// Partial result of one collection round: every requested pair lands in
/// exactly one of `quotes` or `failures`.
#[derive(Debug, Default)]
pub struct CollectionResult {
    pub quotes: HashMap<PairKey, Quote>,
    pub depths: HashMap<PairKey, OrderBookDepth>,
    pub failures: HashMap<PairKey, String>,
}

impl CollectionResult {
    pub fn depth(&self, venue: &str, instrument: &str) -> Option<&OrderBookDepth> {
        self.depths.get(&PairKey::new(venue, instrument))
    }
}

enum PairOutcome {
    Collected(Quote, Option<OrderBookDepth>),
    Failed(String),
    Fatal(ExchangeError),
}

pub struct MarketDataCollector {
    clients: HashMap<String, Arc<dyn ExchangeClient>>,
    settings: CollectorSettings,
    retry: RetryConfig,
}

impl MarketDataCollector {
    pub fn new(clients: HashMap<String, Arc<dyn ExchangeClient>>, settings: CollectorSettings) -> Self {
        let retry = RetryConfig::from(&settings);
        Self {
            clients,
            settings,
            retry,
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fetches every pair concurrently, bounded by the configured worker
    /// limit. Only authentication failures abort the round.
    pub async fn collect(&self, pairs: &[PairKey]) -> BotResult<CollectionResult> {
        let mut jobs = Vec::with_capacity(pairs.len());
        for key in pairs {
            let client = self
                .clients
                .get(&key.venue)
                .cloned()
                .ok_or_else(|| BotError::UnknownVenue {
                    venue: key.venue.clone(),
                })?;
            jobs.push((key.clone(), client));
        }

        let outcomes: Vec<(PairKey, PairOutcome)> = stream::iter(jobs)
            .map(|(key, client)| async move {
                let outcome = self.fetch_pair(client.as_ref(), &key).await;
                (key, outcome)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut result = CollectionResult::default();
        for (key, outcome) in outcomes {
            match outcome {
                PairOutcome::Collected(quote, depth) => {
                    if let Some(depth) = depth {
                        result.depths.insert(key.clone(), depth);
                    }
                    result.quotes.insert(key, quote);
                }
                PairOutcome::Failed(reason) => {
                    warn!(pair = %key, "Market data unavailable: {}", reason);
                    result.failures.insert(key, reason);
                }
                PairOutcome::Fatal(error) => {
                    return Err(BotError::fatal(
                        format!("{} rejected market data request", key),
                        error,
                    ));
                }
            }
        }

        debug!(
            "Collected {} quotes, {} depths, {} failures",
            result.quotes.len(),
            result.depths.len(),
            result.failures.len()
        );
        Ok(result)
    }

    async fn fetch_pair(&self, client: &dyn ExchangeClient, key: &PairKey) -> PairOutcome {
        let timeout = self.settings.request_timeout;
        let quote_context = format!("{} quote", key);
        let depth_context = format!("{} depth", key);

        let quote_fut = async {
            let started = Instant::now();
            let result = retry_with_backoff(
                || client.get_quote(&key.instrument),
                &self.retry,
                timeout,
                &quote_context,
            )
            .await;
            (result, started.elapsed().as_millis() as u64)
        };
        let depth_fut = async {
            if !self.settings.fetch_depth {
                return None;
            }
            Some(
                retry_with_backoff(
                    || client.get_depth(&key.instrument, self.settings.depth_limit),
                    &self.retry,
                    timeout,
                    &depth_context,
                )
                .await,
            )
        };

        let ((quote, latency_ms), depth) = tokio::join!(quote_fut, depth_fut);

        let mut quote = match quote {
            Ok(quote) => quote,
            Err(failure) => return Self::failure(failure),
        };
        quote.latency_ms = latency_ms;

        if let Err(e) = validate_quote(&quote) {
            return PairOutcome::Failed(e.to_string());
        }

        let depth = match depth {
            Some(Ok(depth)) => Some(depth),
            Some(Err(failure)) => return Self::failure(failure),
            None => None,
        };

        PairOutcome::Collected(quote, depth)
    }

    fn failure(failure: RetryFailure) -> PairOutcome {
        if failure.error.is_fatal() {
            PairOutcome::Fatal(failure.error)
        } else if failure.error.is_retryable() {
            PairOutcome::Failed(format!(
                "{} (gave up after {} attempts)",
                failure.error, failure.attempts
            ))
        } else {
            PairOutcome::Failed(failure.error.to_string())
        }
    }
}
