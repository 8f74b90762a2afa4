//! Bot configuration settings and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::arbitrage::fees::{FeeModel, FeeRates};
use crate::errors::{BotError, BotResult};
use crate::network::VenueRegistry;

// Configuration constants
pub const MAX_COLLECTOR_CONCURRENCY: usize = 64;
pub const MAX_DEPTH_LEVELS: u32 = 500;
pub const DEFAULT_VENUES: &str = "binance,kraken";
pub const DEFAULT_INSTRUMENTS: &str = "BTC/USDT,ETH/USDT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    DryRun,
    Live,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dry_run" | "dry-run" | "dryrun" => Ok(ExecutionMode::DryRun),
            "live" => Ok(ExecutionMode::Live),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakerSettings {
    /// Consecutive losing trades that trip the breaker.
    pub loss_threshold: u32,
    pub cooldown: Duration,
    /// Not recovered to Closed within this long after tripping stops the run.
    pub abandon_after: Duration,
    /// Realized losses inside `loss_window` that trip the breaker.
    pub max_window_loss: Decimal,
    pub loss_window: Duration,
    /// Consecutive failed cycles that trip the breaker.
    pub max_consecutive_errors: u32,
    pub max_errors_per_hour: u32,
    /// Balance below this percentage of the starting balance trips the breaker.
    pub min_balance_pct: Decimal,
}

#[derive(Debug, Clone)]
pub struct RiskLimits {
    pub min_trade_amount: Decimal,
    pub max_trade_amount: Decimal,
    pub max_daily_trades: u32,
    pub max_daily_loss: Decimal,
    pub max_loss_per_trade: Decimal,
    pub max_consecutive_losses: u32,
    pub min_balance_reserve: Decimal,
    pub max_slippage_pct: Decimal,
    pub breaker: BreakerSettings,
}

#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub profit: f64,
    pub liquidity: f64,
    pub spread_volume: f64,
    pub stability: f64,
    pub latency: f64,
    /// Net profit percentage that earns a full profit component.
    pub profit_norm_pct: f64,
    /// Available-to-requested size ratio that earns a full liquidity component.
    pub liquidity_norm_ratio: f64,
    /// Combined latency at which the latency component halves.
    pub latency_norm_ms: f64,
    pub stability_window_secs: u64,
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.profit + self.liquidity + self.spread_volume + self.stability + self.latency
    }
}

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub fetch_depth: bool,
    pub depth_limit: u32,
    /// REST base URL per venue, overriding the client default.
    pub base_urls: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct StopConditions {
    pub max_duration: Option<Duration>,
    pub max_cycles: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub venues: Vec<String>,
    pub instruments: Vec<String>,
    /// Quote-currency notional the detector sizes each opportunity at.
    pub trade_amount: Decimal,
    /// Minimum absolute net profit (quote currency) for a candidate.
    pub min_profit: Decimal,
    pub min_score: f64,
    pub poll_interval: Duration,
    pub initial_balance: Decimal,
    pub output_dir: PathBuf,
    pub execution_mode: ExecutionMode,
    pub reset_loss_streak_on_new_day: bool,
    pub fee_overrides: HashMap<String, FeeRates>,
    pub risk: RiskLimits,
    pub scoring: ScoringWeights,
    pub collector: CollectorSettings,
    pub stop: StopConditions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            venues: split_list(DEFAULT_VENUES),
            instruments: split_list(DEFAULT_INSTRUMENTS),
            trade_amount: dec!(100),
            min_profit: dec!(0.50),
            min_score: 0.0,
            poll_interval: Duration::from_secs(5),
            initial_balance: dec!(10000),
            output_dir: PathBuf::from("output"),
            execution_mode: ExecutionMode::DryRun,
            reset_loss_streak_on_new_day: false,
            fee_overrides: HashMap::new(),
            risk: RiskLimits {
                min_trade_amount: dec!(10),
                max_trade_amount: dec!(100),
                max_daily_trades: 50,
                max_daily_loss: dec!(500),
                max_loss_per_trade: dec!(50),
                max_consecutive_losses: 5,
                min_balance_reserve: dec!(1000),
                max_slippage_pct: dec!(0.5),
                breaker: BreakerSettings {
                    loss_threshold: 3,
                    cooldown: Duration::from_secs(900),
                    abandon_after: Duration::from_secs(7200),
                    max_window_loss: dec!(100),
                    loss_window: Duration::from_secs(15 * 60),
                    max_consecutive_errors: 5,
                    max_errors_per_hour: 20,
                    min_balance_pct: dec!(50),
                },
            },
            scoring: ScoringWeights {
                profit: 0.40,
                liquidity: 0.25,
                spread_volume: 0.10,
                stability: 0.15,
                latency: 0.10,
                profit_norm_pct: 2.0,
                liquidity_norm_ratio: 10.0,
                latency_norm_ms: 500.0,
                stability_window_secs: 300,
            },
            collector: CollectorSettings {
                concurrency: 8,
                request_timeout: Duration::from_secs(10),
                max_retries: 3,
                initial_backoff_ms: 200,
                max_backoff_ms: 5000,
                fetch_depth: true,
                depth_limit: 20,
                base_urls: HashMap::new(),
            },
            stop: StopConditions::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> BotResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key/value source. Absent keys take the
    /// default; present but malformed keys are a configuration error.
    pub fn from_lookup<F>(lookup: F) -> BotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let venues = get("ARB_VENUES")
            .map(|v| split_list(&v.to_ascii_lowercase()))
            .unwrap_or(d.venues);
        let instruments = get("ARB_INSTRUMENTS")
            .map(|v| split_list(&v.to_ascii_uppercase()))
            .unwrap_or(d.instruments);

        let mut base_urls = HashMap::new();
        for venue in &venues {
            let key = format!("{}_BASE_URL", venue.to_ascii_uppercase());
            if let Some(url) = get(&key) {
                base_urls.insert(venue.clone(), url);
            }
        }

        let fee_overrides = match get("FEE_OVERRIDES") {
            Some(raw) => parse_fee_overrides(&raw)?,
            None => HashMap::new(),
        };

        let config = Self {
            venues,
            instruments,
            trade_amount: parse_or(&get, "TRADE_AMOUNT", d.trade_amount)?,
            min_profit: parse_or(&get, "MIN_PROFIT", d.min_profit)?,
            min_score: parse_or(&get, "MIN_SCORE", d.min_score)?,
            poll_interval: Duration::from_secs(parse_or(&get, "POLL_INTERVAL_SECS", d.poll_interval.as_secs())?),
            initial_balance: parse_or(&get, "INITIAL_BALANCE", d.initial_balance)?,
            output_dir: get("OUTPUT_DIR").map(PathBuf::from).unwrap_or(d.output_dir),
            execution_mode: parse_or(&get, "EXECUTION_MODE", d.execution_mode)?,
            reset_loss_streak_on_new_day: parse_or(
                &get,
                "RESET_LOSS_STREAK_ON_NEW_DAY",
                d.reset_loss_streak_on_new_day,
            )?,
            fee_overrides,
            risk: RiskLimits {
                min_trade_amount: parse_or(&get, "MIN_TRADE_AMOUNT", d.risk.min_trade_amount)?,
                max_trade_amount: parse_or(&get, "MAX_TRADE_AMOUNT", d.risk.max_trade_amount)?,
                max_daily_trades: parse_or(&get, "MAX_DAILY_TRADES", d.risk.max_daily_trades)?,
                max_daily_loss: parse_or(&get, "MAX_DAILY_LOSS", d.risk.max_daily_loss)?,
                max_loss_per_trade: parse_or(&get, "MAX_LOSS_PER_TRADE", d.risk.max_loss_per_trade)?,
                max_consecutive_losses: parse_or(
                    &get,
                    "MAX_CONSECUTIVE_LOSSES",
                    d.risk.max_consecutive_losses,
                )?,
                min_balance_reserve: parse_or(&get, "MIN_BALANCE_RESERVE", d.risk.min_balance_reserve)?,
                max_slippage_pct: parse_or(&get, "MAX_SLIPPAGE_PCT", d.risk.max_slippage_pct)?,
                breaker: BreakerSettings {
                    loss_threshold: parse_or(
                        &get,
                        "BREAKER_LOSS_THRESHOLD",
                        d.risk.breaker.loss_threshold,
                    )?,
                    cooldown: Duration::from_secs(parse_or(
                        &get,
                        "BREAKER_COOLDOWN_SECS",
                        d.risk.breaker.cooldown.as_secs(),
                    )?),
                    abandon_after: Duration::from_secs(parse_or(
                        &get,
                        "BREAKER_ABANDON_SECS",
                        d.risk.breaker.abandon_after.as_secs(),
                    )?),
                    max_window_loss: parse_or(
                        &get,
                        "BREAKER_MAX_WINDOW_LOSS",
                        d.risk.breaker.max_window_loss,
                    )?,
                    loss_window: Duration::from_secs(parse_or(
                        &get,
                        "BREAKER_LOSS_WINDOW_SECS",
                        d.risk.breaker.loss_window.as_secs(),
                    )?),
                    max_consecutive_errors: parse_or(
                        &get,
                        "BREAKER_MAX_CONSECUTIVE_ERRORS",
                        d.risk.breaker.max_consecutive_errors,
                    )?,
                    max_errors_per_hour: parse_or(
                        &get,
                        "BREAKER_MAX_ERRORS_PER_HOUR",
                        d.risk.breaker.max_errors_per_hour,
                    )?,
                    min_balance_pct: parse_or(
                        &get,
                        "BREAKER_MIN_BALANCE_PCT",
                        d.risk.breaker.min_balance_pct,
                    )?,
                },
            },
            scoring: ScoringWeights {
                profit: parse_or(&get, "WEIGHT_PROFIT", d.scoring.profit)?,
                liquidity: parse_or(&get, "WEIGHT_LIQUIDITY", d.scoring.liquidity)?,
                spread_volume: parse_or(&get, "WEIGHT_SPREAD_VOLUME", d.scoring.spread_volume)?,
                stability: parse_or(&get, "WEIGHT_STABILITY", d.scoring.stability)?,
                latency: parse_or(&get, "WEIGHT_LATENCY", d.scoring.latency)?,
                profit_norm_pct: parse_or(&get, "SCORE_PROFIT_NORM_PCT", d.scoring.profit_norm_pct)?,
                liquidity_norm_ratio: parse_or(
                    &get,
                    "SCORE_LIQUIDITY_NORM_RATIO",
                    d.scoring.liquidity_norm_ratio,
                )?,
                latency_norm_ms: parse_or(&get, "SCORE_LATENCY_NORM_MS", d.scoring.latency_norm_ms)?,
                stability_window_secs: parse_or(
                    &get,
                    "STABILITY_WINDOW_SECS",
                    d.scoring.stability_window_secs,
                )?,
            },
            collector: CollectorSettings {
                concurrency: parse_or(&get, "COLLECTOR_CONCURRENCY", d.collector.concurrency)?,
                request_timeout: Duration::from_millis(parse_or(
                    &get,
                    "API_TIMEOUT_MS",
                    d.collector.request_timeout.as_millis() as u64,
                )?),
                max_retries: parse_or(&get, "MAX_RETRIES", d.collector.max_retries)?,
                initial_backoff_ms: parse_or(&get, "RETRY_BACKOFF_MS", d.collector.initial_backoff_ms)?,
                max_backoff_ms: parse_or(&get, "RETRY_MAX_BACKOFF_MS", d.collector.max_backoff_ms)?,
                fetch_depth: parse_or(&get, "FETCH_DEPTH", d.collector.fetch_depth)?,
                depth_limit: parse_or(&get, "DEPTH_LIMIT", d.collector.depth_limit)?,
                base_urls,
            },
            stop: StopConditions {
                max_duration: parse_opt::<u64, _>(&get, "MAX_RUN_SECS")?.map(Duration::from_secs),
                max_cycles: parse_opt(&get, "MAX_CYCLES")?,
            },
        };

        Ok(config)
    }

    /// Rejects incoherent settings before any cycle runs.
    pub fn validate(&self) -> BotResult<()> {
        let mut errors = Vec::new();
        let risk = &self.risk;

        if self.venues.len() < 2 {
            errors.push(format!("at least two venues are required, got {}", self.venues.len()));
        }
        if self.instruments.is_empty() {
            errors.push("at least one instrument must be configured".to_string());
        }
        for instrument in &self.instruments {
            if instrument.split('/').filter(|part| !part.is_empty()).count() != 2 {
                errors.push(format!("instrument '{}' is not BASE/QUOTE", instrument));
            }
        }

        let fee_model = FeeModel::with_overrides(self.fee_overrides.clone());
        for venue in &self.venues {
            if !fee_model.supports(venue) {
                errors.push(format!("venue '{}' has no fee schedule", venue));
            }
            if !VenueRegistry::is_supported(venue) {
                errors.push(format!("venue '{}' has no exchange client", venue));
            }
        }

        if risk.min_trade_amount <= Decimal::ZERO {
            errors.push("MIN_TRADE_AMOUNT must be > 0".to_string());
        }
        if risk.min_trade_amount >= risk.max_trade_amount {
            errors.push("MIN_TRADE_AMOUNT must be < MAX_TRADE_AMOUNT".to_string());
        }
        if self.trade_amount <= Decimal::ZERO {
            errors.push("TRADE_AMOUNT must be > 0".to_string());
        }
        if self.trade_amount < risk.min_trade_amount || self.trade_amount > risk.max_trade_amount {
            errors.push(format!(
                "TRADE_AMOUNT {} must be within [MIN_TRADE_AMOUNT {}, MAX_TRADE_AMOUNT {}]",
                self.trade_amount, risk.min_trade_amount, risk.max_trade_amount
            ));
        }
        if self.min_profit < Decimal::ZERO {
            errors.push("MIN_PROFIT must be >= 0".to_string());
        }
        if risk.max_daily_trades == 0 {
            errors.push("MAX_DAILY_TRADES must be > 0".to_string());
        }
        if risk.max_daily_loss <= Decimal::ZERO {
            errors.push("MAX_DAILY_LOSS must be > 0".to_string());
        }
        if risk.max_loss_per_trade >= risk.max_daily_loss {
            errors.push("MAX_LOSS_PER_TRADE must be < MAX_DAILY_LOSS".to_string());
        }
        if risk.max_consecutive_losses == 0 || risk.breaker.loss_threshold == 0 {
            errors.push("loss streak limits must be > 0".to_string());
        }
        // A streak that hits the risk cap before the breaker trips is never
        // traded again, so the breaker could neither trip nor recover.
        if risk.breaker.loss_threshold > risk.max_consecutive_losses {
            errors.push(format!(
                "BREAKER_LOSS_THRESHOLD {} must be <= MAX_CONSECUTIVE_LOSSES {}",
                risk.breaker.loss_threshold, risk.max_consecutive_losses
            ));
        }
        if risk.min_balance_reserve < Decimal::ZERO {
            errors.push("MIN_BALANCE_RESERVE must be >= 0".to_string());
        }
        if risk.max_slippage_pct < Decimal::ZERO || risk.max_slippage_pct > dec!(100) {
            errors.push("MAX_SLIPPAGE_PCT must be within [0, 100]".to_string());
        }
        if risk.breaker.abandon_after < risk.breaker.cooldown {
            errors.push("BREAKER_ABANDON_SECS must be >= BREAKER_COOLDOWN_SECS".to_string());
        }
        let breaker = &risk.breaker;
        if breaker.max_window_loss <= Decimal::ZERO || breaker.loss_window.is_zero() {
            errors.push("BREAKER_MAX_WINDOW_LOSS and BREAKER_LOSS_WINDOW_SECS must be > 0".to_string());
        }
        if breaker.max_consecutive_errors == 0 || breaker.max_errors_per_hour == 0 {
            errors.push("breaker error limits must be > 0".to_string());
        }
        if breaker.min_balance_pct < Decimal::ZERO || breaker.min_balance_pct > dec!(100) {
            errors.push("BREAKER_MIN_BALANCE_PCT must be within [0, 100]".to_string());
        }

        let weights = [
            self.scoring.profit,
            self.scoring.liquidity,
            self.scoring.spread_volume,
            self.scoring.stability,
            self.scoring.latency,
        ];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) || self.scoring.total() <= 0.0 {
            errors.push("scoring weights must be non-negative with a positive sum".to_string());
        }
        if self.scoring.profit_norm_pct <= 0.0
            || self.scoring.liquidity_norm_ratio <= 0.0
            || self.scoring.latency_norm_ms <= 0.0
        {
            errors.push("scoring normalizers must be > 0".to_string());
        }

        if self.collector.concurrency == 0 || self.collector.concurrency > MAX_COLLECTOR_CONCURRENCY {
            errors.push(format!(
                "COLLECTOR_CONCURRENCY must be within [1, {}]",
                MAX_COLLECTOR_CONCURRENCY
            ));
        }
        if self.collector.request_timeout.is_zero() {
            errors.push("API_TIMEOUT_MS must be > 0".to_string());
        }
        if self.collector.depth_limit == 0 || self.collector.depth_limit > MAX_DEPTH_LEVELS {
            errors.push(format!("DEPTH_LIMIT must be within [1, {}]", MAX_DEPTH_LEVELS));
        }
        if !self.collector.fetch_depth {
            errors.push("FETCH_DEPTH must be enabled: liquidity validation needs order books".to_string());
        }

        if self.execution_mode == ExecutionMode::Live {
            errors.push("live execution is not supported, use dry-run".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BotError::config(errors.join("; ")))
        }
    }

    /// Every (venue, instrument) pair the collector polls.
    pub fn tracked_pairs(&self) -> Vec<crate::types::PairKey> {
        self.venues
            .iter()
            .flat_map(|venue| {
                self.instruments
                    .iter()
                    .map(move |instrument| crate::types::PairKey::new(venue.clone(), instrument.clone()))
            })
            .collect()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> BotResult<T>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

fn parse_opt<T, G>(get: &G, key: &str) -> BotResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| BotError::config(format!("{}='{}' is invalid: {}", key, raw, e))),
        None => Ok(None),
    }
}

/// `venue:maker_pct:taker_pct[,venue:maker_pct:taker_pct...]`
fn parse_fee_overrides(raw: &str) -> BotResult<HashMap<String, FeeRates>> {
    let mut overrides = HashMap::new();
    for entry in split_list(raw) {
        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        let [venue, maker, taker] = parts.as_slice() else {
            return Err(BotError::config(format!(
                "FEE_OVERRIDES entry '{}' must be venue:maker:taker",
                entry
            )));
        };
        let maker_pct = Decimal::from_str(maker)
            .map_err(|e| BotError::config(format!("FEE_OVERRIDES maker '{}': {}", maker, e)))?;
        let taker_pct = Decimal::from_str(taker)
            .map_err(|e| BotError::config(format!("FEE_OVERRIDES taker '{}': {}", taker, e)))?;
        overrides.insert(venue.to_ascii_lowercase(), FeeRates { maker_pct, taker_pct });
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.venues, vec!["binance", "kraken"]);
        assert_eq!(config.instruments, vec!["BTC/USDT", "ETH/USDT"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.tracked_pairs().len(), 4);
    }

    #[test]
    fn reads_overrides_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("ARB_VENUES", "Binance, KRAKEN"),
            ("MAX_DAILY_TRADES", "10"),
            ("MAX_SLIPPAGE_PCT", "0.25"),
            ("WEIGHT_LATENCY", "0"),
            ("MAX_CYCLES", "12"),
            ("FEE_OVERRIDES", "binance:0.075:0.075"),
            ("BINANCE_BASE_URL", "http://127.0.0.1:9000"),
        ]))
        .unwrap();

        assert_eq!(config.venues, vec!["binance", "kraken"]);
        assert_eq!(config.risk.max_daily_trades, 10);
        assert_eq!(config.risk.max_slippage_pct, dec!(0.25));
        assert_eq!(config.scoring.latency, 0.0);
        assert_eq!(config.stop.max_cycles, Some(12));
        assert_eq!(config.fee_overrides["binance"].taker_pct, dec!(0.075));
        assert_eq!(config.collector.base_urls["binance"], "http://127.0.0.1:9000");
    }

    #[test]
    fn malformed_value_is_config_error() {
        let err = Config::from_lookup(lookup(&[("MAX_DAILY_TRADES", "ten")])).unwrap_err();
        assert!(matches!(err, BotError::Config { .. }));
        assert!(err.to_string().contains("MAX_DAILY_TRADES"));
    }

    #[test]
    fn rejects_inverted_trade_bounds_and_unknown_venue() {
        let mut config = Config::default();
        config.risk.min_trade_amount = dec!(200);
        config.venues.push("mtgox".to_string());

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("MIN_TRADE_AMOUNT must be < MAX_TRADE_AMOUNT"));
        assert!(message.contains("mtgox"));
    }

    #[test]
    fn rejects_live_mode_and_zero_weights() {
        let mut config = Config::default();
        config.execution_mode = ExecutionMode::Live;
        config.scoring.profit = 0.0;
        config.scoring.liquidity = 0.0;
        config.scoring.spread_volume = 0.0;
        config.scoring.stability = 0.0;
        config.scoring.latency = 0.0;

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("live execution"));
        assert!(message.contains("scoring weights"));
    }

    #[test]
    fn rejects_breaker_threshold_above_loss_streak_cap() {
        let mut config = Config::default();
        config.risk.max_consecutive_losses = 3;
        config.risk.breaker.loss_threshold = 5;

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("BREAKER_LOSS_THRESHOLD 5 must be <= MAX_CONSECUTIVE_LOSSES 3"));

        config.risk.breaker.loss_threshold = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_trade_amount_outside_bounds() {
        let mut config = Config::default();
        config.trade_amount = dec!(500);
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("TRADE_AMOUNT 500 must be within"));

        config.trade_amount = dec!(5);
        assert!(config.validate().is_err());

        config.trade_amount = config.risk.max_trade_amount;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reads_breaker_trip_settings() {
        let config = Config::from_lookup(lookup(&[
            ("BREAKER_MAX_WINDOW_LOSS", "250"),
            ("BREAKER_LOSS_WINDOW_SECS", "600"),
            ("BREAKER_MAX_ERRORS_PER_HOUR", "8"),
            ("BREAKER_MIN_BALANCE_PCT", "120"),
        ]))
        .unwrap();

        assert_eq!(config.risk.breaker.max_window_loss, dec!(250));
        assert_eq!(config.risk.breaker.loss_window, Duration::from_secs(600));
        assert_eq!(config.risk.breaker.max_errors_per_hour, 8);
        assert!(config.validate().unwrap_err().to_string().contains("BREAKER_MIN_BALANCE_PCT"));
    }

    #[test]
    fn rejects_malformed_fee_override() {
        let err = Config::from_lookup(lookup(&[("FEE_OVERRIDES", "binance:0.1")])).unwrap_err();
        assert!(err.to_string().contains("venue:maker:taker"));
    }
}
