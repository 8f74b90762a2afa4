//! Validation for quotes and opportunity liquidity

pub mod liquidity;
pub mod price;

pub use liquidity::*;
pub use price::*;
