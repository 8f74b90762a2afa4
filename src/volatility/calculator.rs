//! Rolling price-variance windows used for stability scoring

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use std::collections::{HashMap, VecDeque};
use tracing::warn;

use crate::types::{PairKey, Quote};

pub const MIN_STABILITY_SAMPLES: usize = 5;

pub struct VolatilityCalculator {
    window: VecDeque<(DateTime<Utc>, f64)>,
    max_duration: Duration,
    min_samples: usize,
}

impl VolatilityCalculator {
    pub fn new(max_duration_secs: u64, min_samples: usize) -> Self {
        VolatilityCalculator {
            window: VecDeque::new(),
            max_duration: Duration::seconds(max_duration_secs as i64),
            min_samples: min_samples.max(2),
        }
    }

    pub fn add_value(&mut self, at: DateTime<Utc>, price: f64) {
        if let Some((last, _)) = self.window.back() {
            if at < *last {
                warn!("Dropping out-of-order price sample at {} (latest {})", at, last);
                return;
            }
        }
        self.window.push_back((at, price));

        while let Some((timestamp, _)) = self.window.front() {
            if at - *timestamp > self.max_duration {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn calculate_volatility(&self) -> Option<f64> {
        if self.window.len() < self.min_samples {
            return None;
        }

        let prices: Vec<f64> = self.window.iter().map(|(_, price)| *price).collect();
        let mean: f64 = prices.iter().sum::<f64>() / prices.len() as f64;
        let variance: f64 = prices.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / prices.len() as f64;

        Some(variance.sqrt())
    }

    /// Coefficient of variation in percent.
    pub fn calculate_volatility_percentage(&self) -> Option<f64> {
        let volatility = self.calculate_volatility()?;
        let mean: f64 = self.window.iter().map(|(_, price)| *price).sum::<f64>() / self.window.len() as f64;

        if mean > 0.0 {
            Some((volatility / mean) * 100.0)
        } else {
            None
        }
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }
}

/// One mid-price window per (venue, instrument).
pub struct PriceStabilityTracker {
    windows: HashMap<PairKey, VolatilityCalculator>,
    window_secs: u64,
    min_samples: usize,
}

impl PriceStabilityTracker {
    pub fn new(window_secs: u64) -> Self {
        Self {
            windows: HashMap::new(),
            window_secs,
            min_samples: MIN_STABILITY_SAMPLES,
        }
    }

    pub fn record(&mut self, quote: &Quote) {
        let Some(mid) = quote.mid().to_f64() else {
            return;
        };
        let (window_secs, min_samples) = (self.window_secs, self.min_samples);
        self.windows
            .entry(quote.key())
            .or_insert_with(|| VolatilityCalculator::new(window_secs, min_samples))
            .add_value(quote.timestamp, mid);
    }

    pub fn volatility_pct(&self, key: &PairKey) -> Option<f64> {
        self.windows.get(key)?.calculate_volatility_percentage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn needs_minimum_samples() {
        let mut calc = VolatilityCalculator::new(300, 5);
        for i in 0..4 {
            calc.add_value(at(i), 100.0);
        }
        assert_eq!(calc.calculate_volatility(), None);
        calc.add_value(at(4), 100.0);
        assert_eq!(calc.calculate_volatility(), Some(0.0));
    }

    #[test]
    fn evicts_samples_outside_window() {
        let mut calc = VolatilityCalculator::new(60, 2);
        calc.add_value(at(0), 100.0);
        calc.add_value(at(30), 101.0);
        calc.add_value(at(100), 102.0);
        assert_eq!(calc.sample_count(), 1);
    }

    #[test]
    fn percentage_is_relative_to_mean() {
        let mut calc = VolatilityCalculator::new(300, 2);
        calc.add_value(at(0), 99.0);
        calc.add_value(at(1), 101.0);
        let pct = calc.calculate_volatility_percentage().unwrap();
        assert!((pct - 1.0).abs() < 1e-9);
    }
}
