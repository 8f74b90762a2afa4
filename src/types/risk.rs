//! Daily tally and admission-control types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTally {
    pub day: NaiveDate,
    pub trade_count: u32,
    pub realized_pnl: Decimal,
    pub consecutive_losses: u32,
    pub wins: u32,
    pub losses: u32,
    pub best_trade: Decimal,
    pub worst_trade: Decimal,
    pub max_win_streak: u32,
    pub max_loss_streak: u32,
    pub current_win_streak: u32,
}

impl DailyTally {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day,
            trade_count: 0,
            realized_pnl: Decimal::ZERO,
            consecutive_losses: 0,
            wins: 0,
            losses: 0,
            best_trade: Decimal::ZERO,
            worst_trade: Decimal::ZERO,
            max_win_streak: 0,
            max_loss_streak: 0,
            current_win_streak: 0,
        }
    }

    /// Realized loss so far today, zero while the day is in profit.
    pub fn realized_loss(&self) -> Decimal {
        if self.realized_pnl < Decimal::ZERO {
            -self.realized_pnl
        } else {
            Decimal::ZERO
        }
    }

    pub fn win_rate_pct(&self) -> Decimal {
        if self.trade_count == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.wins) / Decimal::from(self.trade_count) * Decimal::ONE_HUNDRED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DenialReason {
    CircuitOpen,
    TradeAmountBelowMinimum,
    TradeAmountAboveMaximum,
    DailyTradeLimitExceeded,
    DailyLossLimitExceeded,
    ConsecutiveLossLimitExceeded,
    InsufficientBalanceReserve,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenialReason::CircuitOpen => "CircuitOpen",
            DenialReason::TradeAmountBelowMinimum => "TradeAmountBelowMinimum",
            DenialReason::TradeAmountAboveMaximum => "TradeAmountAboveMaximum",
            DenialReason::DailyTradeLimitExceeded => "DailyTradeLimitExceeded",
            DenialReason::DailyLossLimitExceeded => "DailyLossLimitExceeded",
            DenialReason::ConsecutiveLossLimitExceeded => "ConsecutiveLossLimitExceeded",
            DenialReason::InsufficientBalanceReserve => "InsufficientBalanceReserve",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedCheck {
    pub reason: DenialReason,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskDecision {
    /// Every failed check in evaluation order; empty when admitted.
    pub failed_checks: Vec<FailedCheck>,
}

impl RiskDecision {
    pub fn is_allowed(&self) -> bool {
        self.failed_checks.is_empty()
    }

    pub fn denial(&self) -> Option<&FailedCheck> {
        self.failed_checks.first()
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        self.denial().map(|check| check.reason)
    }
}
