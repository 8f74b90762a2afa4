//! Exchange connectivity: venue clients, HTTP plumbing and retries

pub mod binance;
pub mod kraken;
pub mod retry;
pub mod venues;

pub use binance::BinanceClient;
pub use kraken::KrakenClient;
pub use retry::*;
pub use venues::*;
