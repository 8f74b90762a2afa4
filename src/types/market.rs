//! Market data snapshots produced by the collector

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// (venue, instrument) key used throughout a collection cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PairKey {
    pub venue: String,
    pub instrument: String,
}

impl PairKey {
    pub fn new(venue: impl Into<String>, instrument: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            instrument: instrument.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.venue, self.instrument)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub venue: String,
    pub instrument: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub bid_size: Decimal,
    pub ask_size: Decimal,
    /// Rolling 24h base volume when the venue reports it.
    pub volume_24h: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
    pub latency_ms: u64,
}

impl Quote {
    pub fn key(&self) -> PairKey {
        PairKey::new(self.venue.clone(), self.instrument.clone())
    }

    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Both sides of a book, each ordered from the top level outward.
#[derive(Debug, Clone, Serialize)]
pub struct OrderBookDepth {
    pub venue: String,
    pub instrument: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub timestamp: DateTime<Utc>,
}

impl OrderBookDepth {
    /// Levels a taker consumes for `side`: asks for buys, bids for sells.
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    pub fn top_of_book(&self, side: Side) -> Option<Decimal> {
        self.levels(side).first().map(|level| level.price)
    }

    pub fn total_size(&self, side: Side) -> Decimal {
        self.levels(side).iter().map(|level| level.size).sum()
    }
}
