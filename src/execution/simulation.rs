//! Dry-run trade simulation against the latest depth snapshot

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use tracing::info;

use super::slippage::{FillEstimate, SlippageModel};
use crate::arbitrage::fees::FeeModel;
use crate::errors::{BotError, BotResult};
use crate::types::{ArbitrageOpportunity, LegFill, OrderBookDepth, Side, SimulatedTrade};

pub struct DryRunExecutor {
    fee_model: FeeModel,
    slippage: SlippageModel,
    balance: Decimal,
}

impl DryRunExecutor {
    pub fn new(fee_model: FeeModel, initial_balance: Decimal) -> Self {
        Self {
            fee_model,
            slippage: SlippageModel::new(),
            balance: initial_balance,
        }
    }

    /// Virtual quote-currency balance after all simulated trades so far.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Fills both legs at the smaller of their fillable sizes and books the
    /// realized net profit against the virtual balance.
    pub fn execute(
        &mut self,
        opportunity: &ArbitrageOpportunity,
        buy_depth: &OrderBookDepth,
        sell_depth: &OrderBookDepth,
        now: DateTime<Utc>,
    ) -> BotResult<SimulatedTrade> {
        let buy_probe = self.slippage.estimate_fill(buy_depth, Side::Buy, opportunity.size);
        let sell_probe = self.slippage.estimate_fill(sell_depth, Side::Sell, opportunity.size);
        let traded_size = buy_probe.filled_size.min(sell_probe.filled_size);

        if traded_size.is_zero() {
            return Err(BotError::LiquidityShortfall {
                route: opportunity.route(),
                details: "no fillable size on at least one leg".to_string(),
            });
        }

        let buy_fill = self.slippage.estimate_fill(buy_depth, Side::Buy, traded_size);
        let sell_fill = self.slippage.estimate_fill(sell_depth, Side::Sell, traded_size);

        let buy = self.leg(&opportunity.buy_venue, opportunity.size, &buy_fill)?;
        let sell = self.leg(&opportunity.sell_venue, opportunity.size, &sell_fill)?;

        let proceeds = sell.vwap_price * traded_size - sell.fee;
        let cost = buy.vwap_price * traded_size + buy.fee;
        let net_profit = proceeds - cost;

        self.balance += net_profit;

        let trade = SimulatedTrade {
            id: uuid::Uuid::new_v4().to_string(),
            opportunity_id: opportunity.id.clone(),
            timestamp: now,
            instrument: opportunity.instrument.clone(),
            buy,
            sell,
            traded_size,
            expected_profit: opportunity.net_profit,
            net_profit,
            balance_after: self.balance,
        };

        info!(
            "🎭 Simulated {} size {}: expected {}, realized {} (slippage buy {} / sell {})",
            opportunity.route(),
            traded_size.normalize(),
            opportunity.net_profit.round_dp(4),
            net_profit.round_dp(4),
            trade.buy.slippage.round_dp(4),
            trade.sell.slippage.round_dp(4),
        );

        Ok(trade)
    }

    fn leg(&self, venue: &str, requested_size: Decimal, fill: &FillEstimate) -> BotResult<LegFill> {
        Ok(LegFill {
            venue: venue.to_string(),
            side: fill.side,
            requested_size,
            filled_size: fill.filled_size,
            vwap_price: fill.vwap_price,
            top_of_book: fill.top_of_book,
            slippage: fill.slippage,
            fee: self.fee_model.taker_fee(venue, fill.notional())?,
        })
    }
}
