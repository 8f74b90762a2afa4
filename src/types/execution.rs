//! Simulated trade types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::Side;

#[derive(Debug, Clone, Serialize)]
pub struct LegFill {
    pub venue: String,
    pub side: Side,
    pub requested_size: Decimal,
    pub filled_size: Decimal,
    pub vwap_price: Decimal,
    pub top_of_book: Decimal,
    /// Adverse distance between VWAP and top of book, always `>= 0`.
    pub slippage: Decimal,
    pub fee: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulatedTrade {
    pub id: String,
    pub opportunity_id: String,
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub buy: LegFill,
    pub sell: LegFill,
    /// Smaller of the two legs' fillable sizes.
    pub traded_size: Decimal,
    pub expected_profit: Decimal,
    pub net_profit: Decimal,
    pub balance_after: Decimal,
}

impl SimulatedTrade {
    pub fn is_win(&self) -> bool {
        self.net_profit > Decimal::ZERO
    }

    pub fn total_fees(&self) -> Decimal {
        self.buy.fee + self.sell.fee
    }
}
