//! Risk gating: admission control, circuit breaker and daily tally

pub mod circuit_breaker;
pub mod daily_tracker;
pub mod manager;

pub use circuit_breaker::*;
pub use daily_tracker::*;
pub use manager::*;
