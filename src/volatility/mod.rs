//! Short-window price stability tracking

pub mod calculator;

pub use calculator::*;
