//! Opportunity detection, fee modelling and scoring

pub mod detector;
pub mod fees;
pub mod scorer;

pub use detector::*;
pub use fees::*;
pub use scorer::*;
