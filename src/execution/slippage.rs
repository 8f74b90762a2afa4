//! Order book walking and slippage estimation

use rust_decimal::prelude::*;
use serde::Serialize;

use crate::types::{OrderBookDepth, PriceLevel, Side};

/// Result of walking one side of a book for a market order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillEstimate {
    pub side: Side,
    pub requested_size: Decimal,
    pub filled_size: Decimal,
    /// Zero when nothing fills.
    pub vwap_price: Decimal,
    pub top_of_book: Decimal,
    /// Adverse price distance from top of book, never negative.
    pub slippage: Decimal,
    pub slippage_pct: Decimal,
    pub levels_consumed: usize,
}

impl FillEstimate {
    pub fn is_complete(&self) -> bool {
        self.filled_size >= self.requested_size
    }

    pub fn notional(&self) -> Decimal {
        self.vwap_price * self.filled_size
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlippageModel;

impl SlippageModel {
    pub fn new() -> Self {
        Self
    }

    /// Walks the levels `side` consumes, top first, until `size` is filled
    /// or the book runs out.
    pub fn estimate_fill(&self, depth: &OrderBookDepth, side: Side, size: Decimal) -> FillEstimate {
        let levels = usable_levels(depth.levels(side));
        let top_of_book = levels.first().map(|l| l.price).unwrap_or(Decimal::ZERO);

        let mut remaining = size.max(Decimal::ZERO);
        let mut filled = Decimal::ZERO;
        let mut cost = Decimal::ZERO;
        let mut levels_consumed = 0;

        for level in &levels {
            if remaining.is_zero() {
                break;
            }
            let take = remaining.min(level.size);
            cost += take * level.price;
            filled += take;
            remaining -= take;
            levels_consumed += 1;
        }

        let vwap_price = if filled.is_zero() { Decimal::ZERO } else { cost / filled };
        let slippage = if filled.is_zero() {
            Decimal::ZERO
        } else {
            match side {
                Side::Buy => vwap_price - top_of_book,
                Side::Sell => top_of_book - vwap_price,
            }
            .max(Decimal::ZERO)
        };
        let slippage_pct = if top_of_book.is_zero() {
            Decimal::ZERO
        } else {
            slippage / top_of_book * Decimal::ONE_HUNDRED
        };

        FillEstimate {
            side,
            requested_size: size,
            filled_size: filled,
            vwap_price,
            top_of_book,
            slippage,
            slippage_pct,
            levels_consumed,
        }
    }

    /// Largest size whose VWAP stays within `max_slippage_pct` of top of book.
    ///
    /// Whole levels are taken while their price is inside the limit; the
    /// first level outside it contributes only the quantity that brings the
    /// VWAP exactly to the limit.
    pub fn max_size_within_slippage(
        &self,
        depth: &OrderBookDepth,
        side: Side,
        max_slippage_pct: Decimal,
    ) -> Decimal {
        let levels = usable_levels(depth.levels(side));
        let Some(top) = levels.first().map(|l| l.price) else {
            return Decimal::ZERO;
        };

        let bound = max_slippage_pct.max(Decimal::ZERO) / Decimal::ONE_HUNDRED;
        let limit = match side {
            Side::Buy => top * (Decimal::ONE + bound),
            Side::Sell => top * (Decimal::ONE - bound),
        };

        let mut quantity = Decimal::ZERO;
        let mut cost = Decimal::ZERO;

        for level in &levels {
            let inside = match side {
                Side::Buy => level.price <= limit,
                Side::Sell => level.price >= limit,
            };
            if inside {
                quantity += level.size;
                cost += level.size * level.price;
                continue;
            }

            let partial = match side {
                Side::Buy => (limit * quantity - cost) / (level.price - limit),
                Side::Sell => (cost - limit * quantity) / (limit - level.price),
            };
            let partial = partial
                .max(Decimal::ZERO)
                .min(level.size)
                .round_dp_with_strategy(8, RoundingStrategy::ToZero);
            quantity += partial;
            break;
        }

        quantity
    }
}

/// Drops empty or non-positive levels some venues leave in snapshots.
fn usable_levels(levels: &[PriceLevel]) -> Vec<PriceLevel> {
    levels
        .iter()
        .filter(|l| l.price > Decimal::ZERO && l.size > Decimal::ZERO)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn book(bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> OrderBookDepth {
        let levels = |raw: &[(Decimal, Decimal)]| {
            raw.iter().map(|(p, s)| PriceLevel::new(*p, *s)).collect()
        };
        OrderBookDepth {
            venue: "binance".into(),
            instrument: "BTC/USDT".into(),
            bids: levels(bids),
            asks: levels(asks),
            timestamp: Utc::now(),
        }
    }

    fn ladder() -> OrderBookDepth {
        book(
            &[(dec!(99.5), dec!(0.4)), (dec!(99), dec!(0.6)), (dec!(98), dec!(2))],
            &[(dec!(100), dec!(0.3)), (dec!(100.5), dec!(0.5)), (dec!(101), dec!(1.0))],
        )
    }

    #[test]
    fn walks_ask_levels_for_buys() {
        let fill = SlippageModel::new().estimate_fill(&ladder(), Side::Buy, dec!(1));
        assert_eq!(fill.vwap_price, dec!(100.45));
        assert_eq!(fill.slippage, dec!(0.45));
        assert_eq!(fill.slippage_pct, dec!(0.45));
        assert_eq!(fill.levels_consumed, 3);
        assert!(fill.is_complete());
    }

    #[test]
    fn partial_fill_when_book_runs_out() {
        let fill = SlippageModel::new().estimate_fill(&ladder(), Side::Buy, dec!(2.5));
        assert_eq!(fill.filled_size, dec!(1.8));
        assert!(!fill.is_complete());
    }

    #[test]
    fn sells_walk_bids_downward() {
        let fill = SlippageModel::new().estimate_fill(&ladder(), Side::Sell, dec!(1));
        // 0.4 * 99.5 + 0.6 * 99
        assert_eq!(fill.vwap_price, dec!(99.2));
        assert_eq!(fill.slippage, dec!(0.3));
    }

    #[test]
    fn empty_book_fills_nothing() {
        let fill = SlippageModel::new().estimate_fill(&book(&[], &[]), Side::Buy, dec!(1));
        assert_eq!(fill.filled_size, Decimal::ZERO);
        assert_eq!(fill.vwap_price, Decimal::ZERO);
        assert_eq!(fill.slippage, Decimal::ZERO);
    }

    #[test]
    fn max_size_solves_partial_level_exactly() {
        let model = SlippageModel::new();
        // limit 100.2: all of 0.3 @ 100, then x of 100.5 with
        // (30 + 100.5x) / (0.3 + x) = 100.2  ->  x = 0.2
        let size = model.max_size_within_slippage(&ladder(), Side::Buy, dec!(0.2));
        assert_eq!(size, dec!(0.2) + dec!(0.3));

        let fill = model.estimate_fill(&ladder(), Side::Buy, size);
        assert!(fill.slippage_pct <= dec!(0.2));
    }

    #[test]
    fn max_size_takes_whole_levels_inside_limit() {
        let model = SlippageModel::new();
        assert_eq!(model.max_size_within_slippage(&ladder(), Side::Buy, dec!(5)), dec!(1.8));
        assert_eq!(model.max_size_within_slippage(&ladder(), Side::Buy, Decimal::ZERO), dec!(0.3));
        assert_eq!(model.max_size_within_slippage(&book(&[], &[]), Side::Sell, dec!(1)), Decimal::ZERO);
    }

    fn arb_book() -> impl Strategy<Value = OrderBookDepth> {
        prop::collection::vec((1u32..500, 1u32..1000), 1..12).prop_map(|raw| {
            let mut price = dec!(100);
            let asks = raw
                .iter()
                .map(|(step, size)| {
                    price += Decimal::new(*step as i64, 3);
                    (price, Decimal::new(*size as i64, 2))
                })
                .collect::<Vec<_>>();
            book(&[], &asks)
        })
    }

    proptest! {
        #[test]
        fn vwap_never_improves_with_size(depth in arb_book(), a in 1u32..2000, b in 1u32..2000) {
            let model = SlippageModel::new();
            let (small, large) = (a.min(b), a.max(b));
            let small = model.estimate_fill(&depth, Side::Buy, Decimal::new(small as i64, 2));
            let large = model.estimate_fill(&depth, Side::Buy, Decimal::new(large as i64, 2));
            prop_assert!(small.vwap_price <= large.vwap_price);
            prop_assert!(small.slippage >= Decimal::ZERO);
            prop_assert!(large.filled_size <= large.requested_size);
        }

        #[test]
        fn max_size_respects_bound(depth in arb_book(), bps in 0u32..300) {
            let model = SlippageModel::new();
            let bound = Decimal::new(bps as i64, 2);
            let size = model.max_size_within_slippage(&depth, Side::Buy, bound);
            prop_assert!(size <= depth.total_size(Side::Buy));
            let fill = model.estimate_fill(&depth, Side::Buy, size);
            prop_assert!(fill.slippage_pct <= bound + dec!(0.0000000001));
        }
    }
}
