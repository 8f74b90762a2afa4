//! Cross-venue spread detection

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::fees::FeeModel;
use crate::errors::BotResult;
use crate::types::{ArbitrageOpportunity, PairKey, Quote};

#[derive(Debug, Clone)]
pub struct OpportunityDetector {
    fee_model: FeeModel,
    /// Quote notional each candidate is sized at.
    trade_amount: Decimal,
    min_profit: Decimal,
}

impl OpportunityDetector {
    pub fn new(fee_model: FeeModel, trade_amount: Decimal, min_profit: Decimal) -> Self {
        Self {
            fee_model,
            trade_amount,
            min_profit,
        }
    }

    /// Base size that spends `trade_amount` at the buy venue's ask.
    pub fn proposed_size(&self, buy: &Quote) -> Decimal {
        if buy.ask <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.trade_amount / buy.ask).round_dp_with_strategy(8, RoundingStrategy::ToZero)
    }

    /// Scans every instrument across every ordered venue pair present in
    /// `quotes`. Pairs with a missing quote never appear here.
    pub fn detect(
        &self,
        quotes: &HashMap<PairKey, Quote>,
        now: DateTime<Utc>,
    ) -> BotResult<Vec<ArbitrageOpportunity>> {
        let mut by_instrument: BTreeMap<&str, Vec<&Quote>> = BTreeMap::new();
        for quote in quotes.values() {
            by_instrument.entry(quote.instrument.as_str()).or_default().push(quote);
        }

        let mut opportunities = Vec::new();
        for (instrument, mut venue_quotes) in by_instrument {
            venue_quotes.sort_by(|a, b| a.venue.cmp(&b.venue));

            for buy in &venue_quotes {
                for sell in &venue_quotes {
                    if buy.venue == sell.venue {
                        continue;
                    }
                    let size = self.proposed_size(buy);
                    if let Some(opportunity) = self.evaluate_pair(buy, sell, size, now)? {
                        debug!(
                            "Candidate {} net {} on {}",
                            opportunity.route(),
                            opportunity.net_profit.round_dp(4),
                            instrument
                        );
                        opportunities.push(opportunity);
                    }
                }
            }
        }

        Ok(opportunities)
    }

    /// Buy at `buy.ask`, sell at `sell.bid`, both as taker. Returns a
    /// candidate only when net profit beats the configured minimum.
    pub fn evaluate_pair(
        &self,
        buy: &Quote,
        sell: &Quote,
        size: Decimal,
        now: DateTime<Utc>,
    ) -> BotResult<Option<ArbitrageOpportunity>> {
        if buy.venue == sell.venue || buy.instrument != sell.instrument || size <= Decimal::ZERO {
            return Ok(None);
        }
        if sell.bid <= buy.ask {
            return Ok(None);
        }

        let gross_spread = (sell.bid - buy.ask) * size;
        let buy_fee = self.fee_model.taker_fee(&buy.venue, buy.ask * size)?;
        let sell_fee = self.fee_model.taker_fee(&sell.venue, sell.bid * size)?;
        let total_fees = buy_fee + sell_fee;
        let net_profit = gross_spread - total_fees;

        if net_profit <= self.min_profit {
            return Ok(None);
        }

        Ok(Some(ArbitrageOpportunity {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now,
            instrument: buy.instrument.clone(),
            buy_venue: buy.venue.clone(),
            sell_venue: sell.venue.clone(),
            buy_price: buy.ask,
            sell_price: sell.bid,
            size,
            gross_spread,
            buy_fee,
            sell_fee,
            total_fees,
            net_profit,
            combined_latency_ms: buy.latency_ms + sell.latency_ms,
            validated_liquidity: None,
            score: 0.0,
            score_breakdown: None,
        }))
    }
}
