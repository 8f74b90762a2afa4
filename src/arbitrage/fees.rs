//! Trading fee schedules per venue

use lazy_static::lazy_static;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::errors::{BotError, BotResult};

/// Maker and taker rates in percent of notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRates {
    pub maker_pct: Decimal,
    pub taker_pct: Decimal,
}

impl FeeRates {
    pub const fn new(maker_pct: Decimal, taker_pct: Decimal) -> Self {
        Self { maker_pct, taker_pct }
    }
}

lazy_static! {
    /// Standard retail tier schedules.
    static ref DEFAULT_FEES: HashMap<&'static str, FeeRates> = {
        let mut m = HashMap::new();
        m.insert("binance", FeeRates::new(dec!(0.10), dec!(0.10)));
        m.insert("kraken", FeeRates::new(dec!(0.16), dec!(0.26)));
        m.insert("coinbase", FeeRates::new(dec!(0.40), dec!(0.60)));
        m.insert("bitfinex", FeeRates::new(dec!(0.10), dec!(0.20)));
        m.insert("bitstamp", FeeRates::new(dec!(0.30), dec!(0.40)));
        m.insert("okx", FeeRates::new(dec!(0.08), dec!(0.10)));
        m.insert("bybit", FeeRates::new(dec!(0.10), dec!(0.10)));
        m.insert("huobi", FeeRates::new(dec!(0.20), dec!(0.20)));
        m.insert("kucoin", FeeRates::new(dec!(0.10), dec!(0.10)));
        m.insert("gate", FeeRates::new(dec!(0.15), dec!(0.15)));
        m
    };
}

#[derive(Debug, Clone, Default)]
pub struct FeeModel {
    overrides: HashMap<String, FeeRates>,
}

impl FeeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: HashMap<String, FeeRates>) -> Self {
        Self { overrides }
    }

    pub fn supports(&self, venue: &str) -> bool {
        self.rates(venue).is_ok()
    }

    pub fn rates(&self, venue: &str) -> BotResult<FeeRates> {
        let key = venue.to_ascii_lowercase();
        self.overrides
            .get(&key)
            .or_else(|| DEFAULT_FEES.get(key.as_str()))
            .copied()
            .ok_or_else(|| BotError::UnknownVenue {
                venue: venue.to_string(),
            })
    }

    pub fn rate(&self, venue: &str, is_maker: bool) -> BotResult<Decimal> {
        let rates = self.rates(venue)?;
        Ok(if is_maker { rates.maker_pct } else { rates.taker_pct })
    }

    /// Fee in quote currency for filling `notional` on `venue`.
    pub fn fee(&self, venue: &str, notional: Decimal, is_maker: bool) -> BotResult<Decimal> {
        Ok(notional.abs() * self.rate(venue, is_maker)? / Decimal::ONE_HUNDRED)
    }

    /// Taker fee for a market order, the only order type the engine simulates.
    pub fn taker_fee(&self, venue: &str, notional: Decimal) -> BotResult<Decimal> {
        self.fee(venue, notional, false)
    }
}
