//! Configuration management for the arbitrage engine
//!
//! Configuration is loaded once at startup into an immutable [`Config`]
//! value and passed by reference to the components that need it.

pub mod settings;

pub use settings::*;
