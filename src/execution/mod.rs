//! Slippage modelling and dry-run execution

pub mod simulation;
pub mod slippage;

pub use simulation::*;
pub use slippage::*;
