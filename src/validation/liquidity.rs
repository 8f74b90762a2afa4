//! Order-book depth validation for detected opportunities

use rust_decimal::prelude::*;
use tracing::debug;

use crate::arbitrage::fees::FeeModel;
use crate::errors::{BotError, BotResult};
use crate::execution::SlippageModel;
use crate::types::{ArbitrageOpportunity, OrderBookDepth, Side};

#[derive(Debug, Clone)]
pub struct LiquidityValidator {
    fee_model: FeeModel,
    slippage: SlippageModel,
    max_slippage_pct: Decimal,
    min_trade_amount: Decimal,
}

impl LiquidityValidator {
    pub fn new(fee_model: FeeModel, max_slippage_pct: Decimal, min_trade_amount: Decimal) -> Self {
        Self {
            fee_model,
            slippage: SlippageModel::new(),
            max_slippage_pct,
            min_trade_amount,
        }
    }

    /// Largest size both legs support within the slippage bound.
    pub fn max_supported_size(&self, buy_depth: &OrderBookDepth, sell_depth: &OrderBookDepth) -> Decimal {
        let buy = self
            .slippage
            .max_size_within_slippage(buy_depth, Side::Buy, self.max_slippage_pct);
        let sell = self
            .slippage
            .max_size_within_slippage(sell_depth, Side::Sell, self.max_slippage_pct);
        buy.min(sell)
    }

    /// Caps the opportunity to what both books absorb within the slippage
    /// bound and recomputes its economics at that size.
    pub fn validate(
        &self,
        opportunity: &ArbitrageOpportunity,
        buy_depth: Option<&OrderBookDepth>,
        sell_depth: Option<&OrderBookDepth>,
    ) -> BotResult<ArbitrageOpportunity> {
        let missing = |venue: &str| BotError::DataUnavailable {
            pair: format!("{}:{}", venue, opportunity.instrument),
            reason: "no order book depth in snapshot".to_string(),
        };
        let buy_depth = buy_depth.ok_or_else(|| missing(&opportunity.buy_venue))?;
        let sell_depth = sell_depth.ok_or_else(|| missing(&opportunity.sell_venue))?;

        let max_supported = self.max_supported_size(buy_depth, sell_depth);
        let supported_notional = max_supported * opportunity.buy_price;

        if max_supported.is_zero() || supported_notional < self.min_trade_amount {
            return Err(BotError::LiquidityShortfall {
                route: opportunity.route(),
                details: format!(
                    "books support {} ({} notional) within {}% slippage, minimum trade is {}",
                    max_supported.normalize(),
                    supported_notional.round_dp(2),
                    self.max_slippage_pct,
                    self.min_trade_amount
                ),
            });
        }

        let size = opportunity.size.min(max_supported);
        let mut validated = opportunity.clone();
        if size != opportunity.size {
            debug!(
                "Resizing {} from {} to {} to fit depth",
                opportunity.route(),
                opportunity.size.normalize(),
                size.normalize()
            );
            validated.size = size;
            validated.gross_spread = (validated.sell_price - validated.buy_price) * size;
            validated.buy_fee = self
                .fee_model
                .taker_fee(&validated.buy_venue, validated.buy_price * size)?;
            validated.sell_fee = self
                .fee_model
                .taker_fee(&validated.sell_venue, validated.sell_price * size)?;
            validated.total_fees = validated.buy_fee + validated.sell_fee;
            validated.net_profit = validated.gross_spread - validated.total_fees;
        }
        validated.validated_liquidity = Some(max_supported);

        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceLevel;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn depth(venue: &str, bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> OrderBookDepth {
        OrderBookDepth {
            venue: venue.into(),
            instrument: "BTC/USDT".into(),
            bids,
            asks,
            timestamp: Utc::now(),
        }
    }

    fn opportunity(size: Decimal) -> ArbitrageOpportunity {
        let gross = dec!(2) * size;
        let buy_fee = dec!(100) * size * dec!(0.001);
        let sell_fee = dec!(102) * size * dec!(0.001);
        ArbitrageOpportunity {
            id: "opp-1".into(),
            timestamp: Utc::now(),
            instrument: "BTC/USDT".into(),
            buy_venue: "binance".into(),
            sell_venue: "bybit".into(),
            buy_price: dec!(100),
            sell_price: dec!(102),
            size,
            gross_spread: gross,
            buy_fee,
            sell_fee,
            total_fees: buy_fee + sell_fee,
            net_profit: gross - buy_fee - sell_fee,
            combined_latency_ms: 40,
            validated_liquidity: None,
            score: 0.0,
            score_breakdown: None,
        }
    }

    fn validator() -> LiquidityValidator {
        LiquidityValidator::new(FeeModel::new(), dec!(0.5), dec!(10))
    }

    fn deep_books() -> (OrderBookDepth, OrderBookDepth) {
        (
            depth("binance", vec![], vec![PriceLevel::new(dec!(100), dec!(5))]),
            depth("bybit", vec![PriceLevel::new(dec!(102), dec!(5))], vec![]),
        )
    }

    #[test]
    fn passes_through_when_depth_suffices() {
        let (buy, sell) = deep_books();
        let validated = validator().validate(&opportunity(dec!(1)), Some(&buy), Some(&sell)).unwrap();
        assert_eq!(validated.size, dec!(1));
        assert_eq!(validated.net_profit, dec!(1.798));
        assert_eq!(validated.validated_liquidity, Some(dec!(5)));
    }

    #[test]
    fn caps_size_and_recomputes_profit() {
        let buy = depth("binance", vec![], vec![PriceLevel::new(dec!(100), dec!(0.4))]);
        let (_, sell) = deep_books();
        let validated = validator().validate(&opportunity(dec!(1)), Some(&buy), Some(&sell)).unwrap();

        assert_eq!(validated.size, dec!(0.4));
        assert_eq!(validated.gross_spread, dec!(0.8));
        assert_eq!(validated.total_fees, dec!(0.0808));
        assert_eq!(validated.net_profit, validated.gross_spread - validated.total_fees);
    }

    #[test]
    fn rejects_books_too_thin_for_minimum_trade() {
        let buy = depth("binance", vec![], vec![PriceLevel::new(dec!(100), dec!(0.05))]);
        let (_, sell) = deep_books();
        let err = validator().validate(&opportunity(dec!(1)), Some(&buy), Some(&sell)).unwrap_err();
        assert!(matches!(err, BotError::LiquidityShortfall { .. }));
    }

    #[test]
    fn missing_depth_is_data_unavailable() {
        let (buy, _) = deep_books();
        let err = validator().validate(&opportunity(dec!(1)), Some(&buy), None).unwrap_err();
        assert!(matches!(err, BotError::DataUnavailable { pair, .. } if pair == "bybit:BTC/USDT"));
    }

    proptest! {
        #[test]
        fn validated_size_never_exceeds_supported(ask_size in 1u32..500, bid_size in 1u32..500, size in 1u32..500) {
            let buy = depth("binance", vec![], vec![PriceLevel::new(dec!(100), Decimal::new(ask_size as i64, 2))]);
            let sell = depth("bybit", vec![PriceLevel::new(dec!(102), Decimal::new(bid_size as i64, 2))], vec![]);
            let proposed = Decimal::new(size as i64, 2);

            if let Ok(validated) = validator().validate(&opportunity(proposed), Some(&buy), Some(&sell)) {
                let supported = validated.validated_liquidity.unwrap();
                prop_assert!(validated.size <= supported);
                prop_assert!(validated.size <= proposed);
                prop_assert_eq!(validated.net_profit, validated.gross_spread - validated.total_fees);
            }
        }
    }
}
