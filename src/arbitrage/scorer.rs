//! Multi-criteria opportunity scoring and ranking

use rust_decimal::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::ScoringWeights;
use crate::types::{ArbitrageOpportunity, PairKey, Quote, ScoreBreakdown};
use crate::volatility::PriceStabilityTracker;

/// Component value used when the underlying data is not available yet.
const NEUTRAL: f64 = 0.5;

/// Market context the scorer reads but never mutates.
pub struct ScoringContext<'a> {
    pub quotes: &'a HashMap<PairKey, Quote>,
    pub stability: &'a PriceStabilityTracker,
}

#[derive(Debug, Clone)]
pub struct OpportunityScorer {
    weights: ScoringWeights,
    min_score: f64,
}

impl OpportunityScorer {
    pub fn new(weights: ScoringWeights, min_score: f64) -> Self {
        Self { weights, min_score }
    }

    pub fn breakdown(&self, opportunity: &ArbitrageOpportunity, ctx: &ScoringContext<'_>) -> ScoreBreakdown {
        let w = &self.weights;

        let profit_pct = opportunity.net_profit_pct().to_f64().unwrap_or(0.0);
        let profit = (profit_pct / w.profit_norm_pct).clamp(0.0, 1.0);

        let liquidity = match opportunity.validated_liquidity {
            Some(available) if !opportunity.size.is_zero() => {
                let ratio = (available / opportunity.size).to_f64().unwrap_or(0.0);
                ratio.clamp(0.0, w.liquidity_norm_ratio) / w.liquidity_norm_ratio
            }
            _ => 0.0,
        };

        let buy_key = PairKey::new(opportunity.buy_venue.clone(), opportunity.instrument.clone());
        let sell_key = PairKey::new(opportunity.sell_venue.clone(), opportunity.instrument.clone());

        let min_volume = [&buy_key, &sell_key]
            .iter()
            .map(|key| ctx.quotes.get(*key).and_then(|q| q.volume_24h))
            .collect::<Option<Vec<_>>>()
            .and_then(|volumes| volumes.into_iter().min());
        let spread_volume = match min_volume {
            Some(volume) if volume > Decimal::ZERO => {
                let spread_pct = opportunity.spread_pct().to_f64().unwrap_or(0.0);
                let participation = (opportunity.size / volume).to_f64().unwrap_or(1.0);
                1.0 / (1.0 + spread_pct * participation)
            }
            _ => NEUTRAL,
        };

        let stability = match (
            ctx.stability.volatility_pct(&buy_key),
            ctx.stability.volatility_pct(&sell_key),
        ) {
            (Some(a), Some(b)) => 1.0 / (1.0 + a.max(b)),
            _ => NEUTRAL,
        };

        let latency = 1.0 / (1.0 + opportunity.combined_latency_ms as f64 / w.latency_norm_ms);

        let mut breakdown = ScoreBreakdown {
            profit,
            liquidity,
            spread_volume,
            stability,
            latency,
            grade: 'F',
        };
        breakdown.grade = grade(self.composite(&breakdown));
        breakdown
    }

    /// Weighted mean of the components, scaled to `[0, 100]`.
    pub fn composite(&self, b: &ScoreBreakdown) -> f64 {
        let w = &self.weights;
        let total = w.total();
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = w.profit * b.profit
            + w.liquidity * b.liquidity
            + w.spread_volume * b.spread_volume
            + w.stability * b.stability
            + w.latency * b.latency;
        weighted / total * 100.0
    }

    /// Scores every candidate, drops those under `min_score`, and sorts best
    /// first.
    pub fn rank(
        &self,
        opportunities: Vec<ArbitrageOpportunity>,
        ctx: &ScoringContext<'_>,
    ) -> Vec<ArbitrageOpportunity> {
        let mut ranked: Vec<_> = opportunities
            .into_iter()
            .map(|mut opportunity| {
                let breakdown = self.breakdown(&opportunity, ctx);
                opportunity.score = self.composite(&breakdown);
                opportunity.score_breakdown = Some(breakdown);
                opportunity
            })
            .filter(|opportunity| opportunity.score >= self.min_score)
            .collect();

        ranked.sort_by(compare_ranked);
        ranked
    }
}

/// Higher score, then higher net profit, then lower latency.
fn compare_ranked(a: &ArbitrageOpportunity, b: &ArbitrageOpportunity) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.net_profit.cmp(&a.net_profit))
        .then_with(|| a.combined_latency_ms.cmp(&b.combined_latency_ms))
}

pub fn grade(score: f64) -> char {
    match score {
        s if s >= 90.0 => 'S',
        s if s >= 80.0 => 'A',
        s if s >= 70.0 => 'B',
        s if s >= 60.0 => 'C',
        s if s >= 50.0 => 'D',
        _ => 'F',
    }
}
