//! Arbitrage opportunity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageOpportunity {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub buy_venue: String,
    pub sell_venue: String,
    /// Best ask on the buy venue.
    pub buy_price: Decimal,
    /// Best bid on the sell venue.
    pub sell_price: Decimal,
    pub size: Decimal,
    /// `(sell_price - buy_price) * size`.
    pub gross_spread: Decimal,
    pub buy_fee: Decimal,
    pub sell_fee: Decimal,
    pub total_fees: Decimal,
    /// Always `gross_spread - total_fees`.
    pub net_profit: Decimal,
    pub combined_latency_ms: u64,
    /// Largest size both books support inside the slippage bound, once validated.
    pub validated_liquidity: Option<Decimal>,
    pub score: f64,
    pub score_breakdown: Option<ScoreBreakdown>,
}

impl ArbitrageOpportunity {
    pub fn notional(&self) -> Decimal {
        self.buy_price * self.size
    }

    pub fn spread_per_unit(&self) -> Decimal {
        self.sell_price - self.buy_price
    }

    pub fn spread_pct(&self) -> Decimal {
        if self.buy_price.is_zero() {
            return Decimal::ZERO;
        }
        self.spread_per_unit() / self.buy_price * Decimal::ONE_HUNDRED
    }

    pub fn net_profit_pct(&self) -> Decimal {
        let notional = self.notional();
        if notional.is_zero() {
            return Decimal::ZERO;
        }
        self.net_profit / notional * Decimal::ONE_HUNDRED
    }

    pub fn route(&self) -> String {
        format!("{} {} -> {}", self.instrument, self.buy_venue, self.sell_venue)
    }
}

/// Normalized `[0, 1]` components behind a composite score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub profit: f64,
    pub liquidity: f64,
    pub spread_volume: f64,
    pub stability: f64,
    pub latency: f64,
    pub grade: char,
}
