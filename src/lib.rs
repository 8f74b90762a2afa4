//! Cross-exchange arbitrage engine
//!
//! Collects quotes and order books from several centralized exchanges,
//! detects fee-inclusive price discrepancies, validates them against book
//! depth, ranks them, gates the best one through pre-trade risk checks and a
//! circuit breaker, and simulates the resulting trade pair in dry-run mode.

pub mod arbitrage;
pub mod collector;
pub mod config;
pub mod errors;
pub mod execution;
pub mod network;
pub mod orchestrator;
pub mod risk;
pub mod storage;
pub mod types;
pub mod utils;
pub mod validation;
pub mod volatility;

// Re-export commonly used items
pub use config::Config;
pub use errors::{BotError, BotResult};
pub use orchestrator::{RunStatistics, StopReason, TradingOrchestrator};
pub use types::*;
