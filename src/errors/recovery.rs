//! Error recovery strategies

use std::collections::HashMap;
use std::time::Duration;
use tracing::Level;
use super::{BotError, ErrorClass};

pub struct ErrorRecovery {
    pub error_counts: HashMap<ErrorClass, u32>,
    pub recovery_strategies: HashMap<ErrorClass, RecoveryStrategy>,
    consecutive_transient: u32,
}

#[derive(Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay_ms: u64 },
    Skip { log_level: Level },
    Shutdown,
}

#[derive(Debug, PartialEq)]
pub enum RecoveryAction {
    Retry { delay: Duration },
    Skip { log_level: Level },
    Escalate,
    Shutdown { reason: String },
}

impl ErrorRecovery {
    pub fn new() -> Self {
        let mut strategies = HashMap::new();

        strategies.insert(
            ErrorClass::Transient,
            RecoveryStrategy::Retry {
                max_attempts: 5,
                delay_ms: 1000,
            },
        );
        strategies.insert(
            ErrorClass::DataUnavailable,
            RecoveryStrategy::Skip { log_level: Level::DEBUG },
        );
        strategies.insert(
            ErrorClass::LiquidityShortfall,
            RecoveryStrategy::Skip { log_level: Level::DEBUG },
        );
        strategies.insert(
            ErrorClass::RiskDenied,
            RecoveryStrategy::Skip { log_level: Level::INFO },
        );
        strategies.insert(
            ErrorClass::CircuitOpen,
            RecoveryStrategy::Skip { log_level: Level::WARN },
        );
        strategies.insert(ErrorClass::Config, RecoveryStrategy::Shutdown);
        strategies.insert(ErrorClass::Fatal, RecoveryStrategy::Shutdown);

        Self {
            error_counts: HashMap::new(),
            recovery_strategies: strategies,
            consecutive_transient: 0,
        }
    }

    pub fn handle_error(&mut self, error: &BotError) -> RecoveryAction {
        let class = error.class();
        *self.error_counts.entry(class).or_insert(0) += 1;

        match self.recovery_strategies.get(&class) {
            Some(RecoveryStrategy::Retry { max_attempts, delay_ms }) => {
                self.consecutive_transient += 1;
                if self.consecutive_transient <= *max_attempts {
                    RecoveryAction::Retry {
                        delay: Duration::from_millis(*delay_ms),
                    }
                } else {
                    RecoveryAction::Escalate
                }
            }
            Some(RecoveryStrategy::Skip { log_level }) => RecoveryAction::Skip {
                log_level: *log_level,
            },
            Some(RecoveryStrategy::Shutdown) => RecoveryAction::Shutdown {
                reason: error.to_string(),
            },
            None => RecoveryAction::Escalate,
        }
    }

    /// A clean cycle ends any transient streak.
    pub fn record_success(&mut self) {
        self.consecutive_transient = 0;
    }

    pub fn total_errors(&self) -> u32 {
        self.error_counts.values().sum()
    }
}

impl Default for ErrorRecovery {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn transient() -> BotError {
        BotError::Transient {
            context: "collect".into(),
            message: "timed out".into(),
            attempts: 3,
        }
    }

    #[test]
    fn transient_errors_retry_then_escalate() {
        let mut recovery = ErrorRecovery::new();
        for _ in 0..5 {
            assert!(matches!(recovery.handle_error(&transient()), RecoveryAction::Retry { .. }));
        }
        assert_eq!(recovery.handle_error(&transient()), RecoveryAction::Escalate);

        recovery.record_success();
        assert!(matches!(recovery.handle_error(&transient()), RecoveryAction::Retry { .. }));
        assert_eq!(recovery.error_counts[&ErrorClass::Transient], 7);
    }

    #[test]
    fn fatal_errors_shut_down() {
        let mut recovery = ErrorRecovery::new();
        let action = recovery.handle_error(&BotError::fatal("auth", anyhow!("invalid key")));
        assert!(matches!(action, RecoveryAction::Shutdown { .. }));
        let action = recovery.handle_error(&BotError::config("min >= max"));
        assert!(matches!(action, RecoveryAction::Shutdown { .. }));
    }

    #[test]
    fn single_data_point_errors_skip() {
        let mut recovery = ErrorRecovery::new();
        let action = recovery.handle_error(&BotError::DataUnavailable {
            pair: "binance:ETH/USDT".into(),
            reason: "timeout".into(),
        });
        assert_eq!(action, RecoveryAction::Skip { log_level: Level::DEBUG });
        assert_eq!(recovery.total_errors(), 1);
    }
}
