//! Venue connectivity checks

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::network::{ExchangeClient, RetryConfig, retry_with_backoff};
use crate::types::VenueHealth;

/// Pings every venue concurrently with the collector's retry policy.
pub async fn check_venue_health(
    clients: &HashMap<String, Arc<dyn ExchangeClient>>,
    retry: &RetryConfig,
    timeout: Duration,
) -> Vec<VenueHealth> {
    let checks = clients.iter().map(|(venue, client)| async move {
        let started = Instant::now();
        let context = format!("{} ping", venue);
        match retry_with_backoff(|| client.ping(), retry, timeout, &context).await {
            Ok(()) => VenueHealth {
                venue: venue.clone(),
                reachable: true,
                latency_ms: Some(started.elapsed().as_millis() as u64),
                error: None,
            },
            Err(failure) => VenueHealth {
                venue: venue.clone(),
                reachable: false,
                latency_ms: None,
                error: Some(failure.error.to_string()),
            },
        }
    });

    let mut report = join_all(checks).await;
    report.sort_by(|a, b| a.venue.cmp(&b.venue));
    report
}

pub fn print_health_report(report: &[VenueHealth]) {
    info!("🩺 Venue connectivity:");
    for health in report {
        match (health.reachable, health.latency_ms) {
            (true, Some(ms)) => info!("   ✅ {:<10} reachable ({} ms)", health.venue, ms),
            _ => error!(
                "   ❌ {:<10} unreachable: {}",
                health.venue,
                health.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
