//! Quote sanity checks applied before a quote enters a snapshot

use anyhow::Result;
use rust_decimal::prelude::*;

use crate::types::Quote;

pub fn validate_price(price: Decimal, source: &str) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(anyhow::anyhow!("{} price is zero or negative: {}", source, price));
    }

    Ok(())
}

/// Rejects crossed or non-positive books and negative sizes.
pub fn validate_quote(quote: &Quote) -> Result<()> {
    let source = quote.key().to_string();
    validate_price(quote.bid, &format!("{} bid", source))?;
    validate_price(quote.ask, &format!("{} ask", source))?;

    if quote.ask < quote.bid {
        return Err(anyhow::anyhow!(
            "{} book is crossed: bid {} > ask {}",
            source,
            quote.bid,
            quote.ask
        ));
    }

    if quote.bid_size < Decimal::ZERO || quote.ask_size < Decimal::ZERO {
        return Err(anyhow::anyhow!("{} reports negative top-of-book size", source));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn quote(bid: Decimal, ask: Decimal) -> Quote {
        Quote {
            venue: "kraken".into(),
            instrument: "ETH/USDT".into(),
            bid,
            ask,
            bid_size: dec!(1),
            ask_size: dec!(1),
            volume_24h: None,
            timestamp: Utc::now(),
            latency_ms: 0,
        }
    }

    #[test]
    fn accepts_normal_quote() {
        assert!(validate_quote(&quote(dec!(3000), dec!(3000.5))).is_ok());
        assert!(validate_quote(&quote(dec!(3000), dec!(3000))).is_ok());
    }

    #[test]
    fn rejects_crossed_and_zero_prices() {
        let crossed = validate_quote(&quote(dec!(3001), dec!(3000))).unwrap_err();
        assert!(crossed.to_string().contains("crossed"));
        assert!(validate_quote(&quote(Decimal::ZERO, dec!(3000))).is_err());
    }
}
