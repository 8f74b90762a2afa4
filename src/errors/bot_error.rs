//! Custom error types for the bot

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::types::DenialReason;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Transient failure: {context} - {message} (after {attempts} attempts)")]
    Transient {
        context: String,
        message: String,
        attempts: u32,
    },

    #[error("Data unavailable for {pair}: {reason}")]
    DataUnavailable {
        pair: String,
        reason: String,
    },

    #[error("Insufficient liquidity: {route} - {details}")]
    LiquidityShortfall {
        route: String,
        details: String,
    },

    #[error("Risk check denied trade: {reason} - {detail}")]
    RiskDenied {
        reason: DenialReason,
        detail: String,
    },

    #[error("Circuit breaker active: {reason}")]
    CircuitOpen {
        reason: String,
        cooldown_remaining: Duration,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    #[error("Unknown venue: {venue}")]
    UnknownVenue {
        venue: String,
    },

    #[error("Fatal runtime error: {context}")]
    Fatal {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Circuit breaker not recovered for {unrecovered_for:?} since tripping, human intervention required")]
    BreakerAbandoned {
        unrecovered_for: Duration,
    },
}

pub type BotResult<T> = Result<T, BotError>;

impl BotError {
    pub fn config(message: impl Into<String>) -> Self {
        BotError::Config {
            message: message.into(),
        }
    }

    pub fn fatal(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        BotError::Fatal {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            BotError::Transient { .. } => ErrorClass::Transient,
            BotError::DataUnavailable { .. } => ErrorClass::DataUnavailable,
            BotError::LiquidityShortfall { .. } => ErrorClass::LiquidityShortfall,
            BotError::RiskDenied { .. } => ErrorClass::RiskDenied,
            BotError::CircuitOpen { .. } => ErrorClass::CircuitOpen,
            BotError::Config { .. } | BotError::UnknownVenue { .. } => ErrorClass::Config,
            BotError::Fatal { .. } | BotError::BreakerAbandoned { .. } => ErrorClass::Fatal,
        }
    }

    /// Systemic conditions that must stop the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::Config | ErrorClass::Fatal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorClass {
    Transient,
    DataUnavailable,
    LiquidityShortfall,
    RiskDenied,
    CircuitOpen,
    Config,
    Fatal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::DataUnavailable => "data_unavailable",
            ErrorClass::LiquidityShortfall => "liquidity_shortfall",
            ErrorClass::RiskDenied => "risk_denied",
            ErrorClass::CircuitOpen => "circuit_open",
            ErrorClass::Config => "config",
            ErrorClass::Fatal => "fatal",
        }
    }
}
