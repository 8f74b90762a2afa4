//! Cycle driver: collect, detect, validate, score, gate, execute, record

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};

use crate::arbitrage::{FeeModel, OpportunityDetector, OpportunityScorer, ScoringContext};
use crate::collector::{CollectionResult, MarketDataCollector};
use crate::config::Config;
use crate::errors::{BotError, BotResult, ErrorClass, ErrorRecovery, RecoveryAction};
use crate::execution::DryRunExecutor;
use crate::network::ExchangeClient;
use crate::risk::{BreakerEvent, BreakerPhase, CircuitBreaker, DailyTracker, RiskManager};
use crate::storage::Persistence;
use crate::types::{ArbitrageOpportunity, DenialReason, PairKey, SimulatedTrade};
use crate::utils::{CycleObserver, CycleSummary, print_session_stats};
use crate::validation::LiquidityValidator;
use crate::volatility::PriceStabilityTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    MaxDuration,
    MaxCycles,
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::MaxDuration => "maximum run duration reached",
            StopReason::MaxCycles => "maximum cycle count reached",
            StopReason::Interrupted => "interrupted",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub started_at: DateTime<Utc>,
    pub cycles: u64,
    pub quotes_collected: u64,
    pub quote_failures: u64,
    pub opportunities_detected: u64,
    /// Candidates that passed liquidity validation.
    pub opportunities_validated: u64,
    /// Validated candidates that also cleared the minimum score.
    pub opportunities_ranked: u64,
    pub trades_executed: u64,
    pub wins: u64,
    pub losses: u64,
    pub denials: BTreeMap<DenialReason, u64>,
    pub errors: BTreeMap<ErrorClass, u64>,
    pub persistence_failures: u64,
    pub realized_pnl: Decimal,
    pub final_balance: Decimal,
    pub breaker_phase: BreakerPhase,
    pub stop_reason: Option<StopReason>,
}

impl RunStatistics {
    fn new(started_at: DateTime<Utc>, balance: Decimal) -> Self {
        Self {
            started_at,
            cycles: 0,
            quotes_collected: 0,
            quote_failures: 0,
            opportunities_detected: 0,
            opportunities_validated: 0,
            opportunities_ranked: 0,
            trades_executed: 0,
            wins: 0,
            losses: 0,
            denials: BTreeMap::new(),
            errors: BTreeMap::new(),
            persistence_failures: 0,
            realized_pnl: Decimal::ZERO,
            final_balance: balance,
            breaker_phase: BreakerPhase::Closed,
            stop_reason: None,
        }
    }
}

pub struct TradingOrchestrator {
    config: Config,
    pairs: Vec<PairKey>,
    collector: MarketDataCollector,
    detector: OpportunityDetector,
    validator: LiquidityValidator,
    scorer: OpportunityScorer,
    risk: RiskManager,
    breaker: CircuitBreaker,
    tracker: DailyTracker,
    executor: DryRunExecutor,
    stability: PriceStabilityTracker,
    recovery: ErrorRecovery,
    persistence: Arc<dyn Persistence>,
    observer: Arc<dyn CycleObserver>,
    stats: RunStatistics,
}

impl TradingOrchestrator {
    /// Validates `config` and wires every component from it.
    pub fn new(
        config: Config,
        clients: HashMap<String, Arc<dyn ExchangeClient>>,
        persistence: Arc<dyn Persistence>,
        observer: Arc<dyn CycleObserver>,
        now: DateTime<Utc>,
    ) -> BotResult<Self> {
        config.validate()?;

        let fee_model = FeeModel::with_overrides(config.fee_overrides.clone());
        let pairs = config.tracked_pairs();

        let today = now.date_naive();
        let tracker = match persistence.load_daily_tally(today) {
            Ok(Some(tally)) => {
                info!(
                    "📅 Resuming {} with {} trades, P&L {}, loss streak {}",
                    tally.day, tally.trade_count, tally.realized_pnl, tally.consecutive_losses
                );
                DailyTracker::from_tally(tally, config.reset_loss_streak_on_new_day)
            }
            Ok(None) => DailyTracker::new(today, config.reset_loss_streak_on_new_day),
            Err(e) => {
                warn!("Could not restore today's tally, starting fresh: {:#}", e);
                DailyTracker::new(today, config.reset_loss_streak_on_new_day)
            }
        };

        Ok(Self {
            collector: MarketDataCollector::new(clients, config.collector.clone()),
            detector: OpportunityDetector::new(fee_model.clone(), config.trade_amount, config.min_profit),
            validator: LiquidityValidator::new(
                fee_model.clone(),
                config.risk.max_slippage_pct,
                config.risk.min_trade_amount,
            ),
            scorer: OpportunityScorer::new(config.scoring.clone(), config.min_score),
            risk: RiskManager::new(config.risk.clone()),
            breaker: CircuitBreaker::new(&config.risk.breaker, config.initial_balance, now),
            tracker,
            executor: DryRunExecutor::new(fee_model, config.initial_balance),
            stability: PriceStabilityTracker::new(config.scoring.stability_window_secs),
            recovery: ErrorRecovery::new(),
            stats: RunStatistics::new(now, config.initial_balance),
            persistence,
            observer,
            pairs,
            config,
        })
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn breaker_mut(&mut self) -> &mut CircuitBreaker {
        &mut self.breaker
    }

    pub fn tracker(&self) -> &DailyTracker {
        &self.tracker
    }

    pub fn balance(&self) -> Decimal {
        self.executor.balance()
    }

    /// Stop conditions checked before each cycle. Breaker abandonment is an
    /// error rather than a stop reason.
    pub fn check_stop(&self, now: DateTime<Utc>) -> BotResult<Option<StopReason>> {
        let unrecovered_for = self.breaker.unrecovered_for(now);
        if unrecovered_for > self.config.risk.breaker.abandon_after {
            return Err(BotError::BreakerAbandoned { unrecovered_for });
        }

        if let Some(max_duration) = self.config.stop.max_duration {
            let elapsed = (now - self.stats.started_at).to_std().unwrap_or_default();
            if elapsed >= max_duration {
                return Ok(Some(StopReason::MaxDuration));
            }
        }

        if let Some(max_cycles) = self.config.stop.max_cycles {
            if self.stats.cycles >= max_cycles {
                return Ok(Some(StopReason::MaxCycles));
            }
        }

        Ok(None)
    }

    /// One full pass. Recoverable per-opportunity problems are folded into
    /// the summary; only cycle-level failures come back as errors, and the
    /// non-fatal ones count towards the breaker's error limits.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> BotResult<CycleSummary> {
        let result = self.cycle(now).await;
        match &result {
            Ok(_) => self.breaker.record_cycle_success(),
            Err(e) if !e.is_fatal() => {
                self.breaker.record_cycle_failure(now);
            }
            Err(_) => {}
        }
        result
    }

    async fn cycle(&mut self, now: DateTime<Utc>) -> BotResult<CycleSummary> {
        self.stats.cycles += 1;
        let cycle = self.stats.cycles;
        self.breaker.tick(now);

        let market = self.collector.collect(&self.pairs).await?;
        self.stats.quotes_collected += market.quotes.len() as u64;
        self.stats.quote_failures += market.failures.len() as u64;

        if market.quotes.is_empty() && !self.pairs.is_empty() {
            return Err(BotError::Transient {
                context: "market data collection".to_string(),
                message: format!("all {} pairs failed", self.pairs.len()),
                attempts: self.collector.retry_config().max_attempts,
            });
        }

        for quote in market.quotes.values() {
            self.stability.record(quote);
        }

        let candidates = self.detector.detect(&market.quotes, now)?;
        let detected = candidates.len();
        self.stats.opportunities_detected += detected as u64;

        let (validated, skipped) = self.validate_candidates(candidates, &market);
        let opportunities_validated = validated.len();
        self.stats.opportunities_validated += opportunities_validated as u64;

        let ctx = ScoringContext {
            quotes: &market.quotes,
            stability: &self.stability,
        };
        let ranked = self.scorer.rank(validated, &ctx);
        let opportunities_ranked = ranked.len();
        self.stats.opportunities_ranked += opportunities_ranked as u64;

        for opportunity in &ranked {
            if let Err(e) = self.persistence.save_opportunity(opportunity) {
                self.persistence_failed("opportunity", &e);
            }
        }

        let mut denial_reasons = Vec::new();
        let mut trade = None;
        let chosen = ranked.into_iter().next();

        if let Some(opportunity) = &chosen {
            let tally = self.tracker.effective_snapshot(now);
            let decision = self
                .risk
                .evaluate(opportunity, &tally, &self.breaker, self.executor.balance());

            if let Some(denial) = decision.denial() {
                *self.stats.denials.entry(denial.reason).or_insert(0) += 1;
                denial_reasons = decision
                    .failed_checks
                    .iter()
                    .map(|c| format!("{}: {}", c.reason, c.detail))
                    .collect();

                let denied = if denial.reason == DenialReason::CircuitOpen {
                    BotError::CircuitOpen {
                        reason: denial.detail.clone(),
                        cooldown_remaining: self.breaker.cooldown_remaining(now),
                    }
                } else {
                    BotError::RiskDenied {
                        reason: denial.reason,
                        detail: denial.detail.clone(),
                    }
                };
                self.handle_local(&denied);
            } else {
                trade = self.execute(opportunity, &market, now);
            }
        }

        self.recovery.record_success();
        self.stats.breaker_phase = self.breaker.phase();
        self.stats.final_balance = self.executor.balance();

        let summary = CycleSummary {
            cycle,
            started_at: now,
            quotes_collected: market.quotes.len(),
            quotes_failed: market.failures.len(),
            opportunities_detected: detected,
            opportunities_validated,
            opportunities_ranked,
            skipped,
            chosen,
            denial_reasons,
            breaker_phase: self.breaker.phase(),
            daily: self.tracker.snapshot().clone(),
            trade,
        };
        self.observer.on_cycle(&summary);

        Ok(summary)
    }

    /// Runs cycles until a stop condition, Ctrl-C, or a fatal error.
    pub async fn run(&mut self) -> BotResult<RunStatistics> {
        info!(
            "🚀 Starting dry-run arbitrage loop: {} venues, {} instruments, interval {:?}",
            self.config.venues.len(),
            self.config.instruments.len(),
            self.config.poll_interval
        );

        let outcome = self.run_loop().await;

        let now = Utc::now();
        self.stats.breaker_phase = self.breaker.phase();
        self.stats.final_balance = self.executor.balance();
        print_session_stats(&self.stats, now);

        match outcome {
            Ok(()) => Ok(self.stats.clone()),
            Err(e) => {
                error!("💥 Stopping on fatal condition: {}", e);
                Err(e)
            }
        }
    }

    async fn run_loop(&mut self) -> BotResult<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            let now = Utc::now();
            if let Some(reason) = self.check_stop(now)? {
                info!("🏁 Stopping: {}", reason);
                self.stats.stop_reason = Some(reason);
                return Ok(());
            }

            let mut pause = self.config.poll_interval;
            if let Err(e) = self.run_cycle(now).await {
                *self.stats.errors.entry(e.class()).or_insert(0) += 1;
                match self.recovery.handle_error(&e) {
                    RecoveryAction::Retry { delay } => {
                        warn!("Cycle {} failed: {}. Backing off {:?}", self.stats.cycles, e, delay);
                        pause += delay;
                    }
                    RecoveryAction::Skip { log_level } => log_at(log_level, &e.to_string()),
                    RecoveryAction::Escalate => return Err(escalate(e)),
                    RecoveryAction::Shutdown { reason } => {
                        error!("Shutdown requested: {}", reason);
                        return Err(e);
                    }
                }
            }

            if matches!(self.check_stop(Utc::now()), Ok(Some(StopReason::MaxCycles))) {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = &mut ctrl_c => {
                    info!("🛑 Ctrl-C received, finishing run");
                    self.stats.stop_reason = Some(StopReason::Interrupted);
                    return Ok(());
                }
            }
        }
    }

    fn validate_candidates(
        &mut self,
        candidates: Vec<ArbitrageOpportunity>,
        market: &CollectionResult,
    ) -> (Vec<ArbitrageOpportunity>, Vec<String>) {
        let mut validated = Vec::new();
        let mut skipped = Vec::new();

        for candidate in candidates {
            let result = self.validator.validate(
                &candidate,
                market.depth(&candidate.buy_venue, &candidate.instrument),
                market.depth(&candidate.sell_venue, &candidate.instrument),
            );
            match result {
                Ok(resized) if resized.net_profit > self.config.min_profit => validated.push(resized),
                Ok(resized) => {
                    skipped.push(format!(
                        "{}: net {} at depth-capped size {} below minimum",
                        resized.route(),
                        resized.net_profit.round_dp(4),
                        resized.size.normalize()
                    ));
                }
                Err(e) => {
                    skipped.push(e.to_string());
                    self.handle_local(&e);
                }
            }
        }

        (validated, skipped)
    }

    fn execute(
        &mut self,
        opportunity: &ArbitrageOpportunity,
        market: &CollectionResult,
        now: DateTime<Utc>,
    ) -> Option<SimulatedTrade> {
        let (Some(buy_depth), Some(sell_depth)) = (
            market.depth(&opportunity.buy_venue, &opportunity.instrument),
            market.depth(&opportunity.sell_venue, &opportunity.instrument),
        ) else {
            self.handle_local(&BotError::DataUnavailable {
                pair: opportunity.route(),
                reason: "depth vanished before execution".to_string(),
            });
            return None;
        };

        let trade = match self.executor.execute(opportunity, buy_depth, sell_depth, now) {
            Ok(trade) => trade,
            Err(e) => {
                self.handle_local(&e);
                return None;
            }
        };

        if self.breaker.phase() == BreakerPhase::HalfOpen {
            self.breaker.apply(BreakerEvent::ProbeAdmitted, now);
        }

        if let Some(archived) = self.tracker.record(trade.net_profit, trade.timestamp) {
            if let Err(e) = self.persistence.save_daily_tally(&archived) {
                self.persistence_failed("daily tally", &e);
            }
        }
        let tally = self.tracker.snapshot().clone();
        if let Err(e) = self.persistence.save_daily_tally(&tally) {
            self.persistence_failed("daily tally", &e);
        }

        if trade.is_win() {
            self.stats.wins += 1;
        } else {
            self.stats.losses += 1;
        }
        self.breaker
            .record_trade(trade.net_profit, self.tracker.consecutive_losses(), now);
        self.breaker.check_balance(self.executor.balance(), now);

        self.stats.trades_executed += 1;
        self.stats.realized_pnl += trade.net_profit;

        if let Err(e) = self.persistence.save_trade(&trade) {
            self.persistence_failed("trade", &e);
        }

        Some(trade)
    }

    fn handle_local(&mut self, error: &BotError) {
        *self.stats.errors.entry(error.class()).or_insert(0) += 1;
        match self.recovery.handle_error(error) {
            RecoveryAction::Skip { log_level } => log_at(log_level, &error.to_string()),
            other => debug!("Unexpected recovery action {:?} for {}", other, error),
        }
    }

    fn persistence_failed(&mut self, what: &str, error: &anyhow::Error) {
        self.stats.persistence_failures += 1;
        warn!("Failed to persist {}: {:#}", what, error);
    }
}

/// Wraps a recoverable error that kept recurring as fatal, keeping it as the source.
fn escalate(error: BotError) -> BotError {
    BotError::fatal("repeated cycle failures", error)
}

fn log_at(level: Level, message: &str) {
    match level {
        Level::ERROR => error!("{}", message),
        Level::WARN => warn!("{}", message),
        Level::INFO => info!("{}", message),
        _ => debug!("{}", message),
    }
}
