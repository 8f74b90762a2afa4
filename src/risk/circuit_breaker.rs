//! Circuit breaker state machine
//!
//! All state changes go through [`transition`], a total function over
//! (state, event). [`CircuitBreaker`] wraps it with the clock, the rolling
//! loss and error windows, and logging.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::{error, info, warn};

use crate::config::BreakerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakerPhase {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BreakerPhase::Closed => "Closed",
            BreakerPhase::Open => "Open",
            BreakerPhase::HalfOpen => "HalfOpen",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerState {
    pub phase: BreakerPhase,
    pub reason: Option<String>,
    pub entered_at: DateTime<Utc>,
    /// Probe trades admitted in the current HalfOpen phase.
    pub probe_count: u32,
    /// When the breaker last left Closed; kept across Open/HalfOpen cycles.
    pub tripped_at: Option<DateTime<Utc>>,
}

impl CircuitBreakerState {
    pub fn closed(at: DateTime<Utc>) -> Self {
        Self {
            phase: BreakerPhase::Closed,
            reason: None,
            entered_at: at,
            probe_count: 0,
            tripped_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerEvent {
    /// Clock advanced; lets an Open breaker finish its cool-down.
    Tick,
    /// The risk gate admitted a trade while HalfOpen.
    ProbeAdmitted,
    TradeWon,
    /// A losing trade, with the loss streak including it.
    TradeLost { loss_streak: u32 },
    /// Realized losses summed over the rolling loss window.
    WindowLoss { total: Decimal },
    /// A cycle failed; both counts include it.
    CycleFailed { consecutive: u32, last_hour: u32 },
    /// Current balance as a percentage of the starting balance.
    BalanceChecked { pct_of_initial: Decimal },
}

/// Thresholds [`transition`] evaluates events against.
#[derive(Debug, Clone)]
pub struct TripPolicy {
    pub loss_threshold: u32,
    pub cooldown: Duration,
    pub max_window_loss: Decimal,
    pub max_consecutive_errors: u32,
    pub max_errors_per_hour: u32,
    pub min_balance_pct: Decimal,
}

impl From<&BreakerSettings> for TripPolicy {
    fn from(settings: &BreakerSettings) -> Self {
        Self {
            loss_threshold: settings.loss_threshold,
            cooldown: Duration::from_std(settings.cooldown).unwrap_or_else(|_| Duration::days(36_500)),
            max_window_loss: settings.max_window_loss,
            max_consecutive_errors: settings.max_consecutive_errors,
            max_errors_per_hour: settings.max_errors_per_hour,
            min_balance_pct: settings.min_balance_pct,
        }
    }
}

/// Next state for every (state, event) pair. Pairs without a rule keep the
/// current state. Every trip condition only fires from Closed.
pub fn transition(
    state: &CircuitBreakerState,
    event: BreakerEvent,
    at: DateTime<Utc>,
    policy: &TripPolicy,
) -> CircuitBreakerState {
    use BreakerEvent::*;
    use BreakerPhase::*;

    let open = |reason: String| CircuitBreakerState {
        phase: Open,
        reason: Some(reason),
        entered_at: at,
        probe_count: 0,
        tripped_at: state.tripped_at.or(Some(at)),
    };

    match (state.phase, event) {
        (Closed, TradeLost { loss_streak }) if loss_streak >= policy.loss_threshold => {
            open(format!("{} consecutive losing trades", loss_streak))
        }
        (Closed, WindowLoss { total }) if total >= policy.max_window_loss => open(format!(
            "lost {} inside the loss window (max {})",
            total.round_dp(2),
            policy.max_window_loss
        )),
        (Closed, CycleFailed { consecutive, .. }) if consecutive >= policy.max_consecutive_errors => {
            open(format!("{} consecutive failed cycles", consecutive))
        }
        (Closed, CycleFailed { last_hour, .. }) if last_hour >= policy.max_errors_per_hour => {
            open(format!("{} failed cycles in the last hour", last_hour))
        }
        (Closed, BalanceChecked { pct_of_initial }) if pct_of_initial < policy.min_balance_pct => {
            open(format!(
                "balance at {}% of starting balance (min {}%)",
                pct_of_initial.round_dp(1),
                policy.min_balance_pct
            ))
        }
        (Open, Tick) if at - state.entered_at >= policy.cooldown => CircuitBreakerState {
            phase: HalfOpen,
            reason: state.reason.clone(),
            entered_at: at,
            probe_count: 0,
            tripped_at: state.tripped_at,
        },
        (HalfOpen, ProbeAdmitted) => CircuitBreakerState {
            probe_count: state.probe_count + 1,
            ..state.clone()
        },
        (HalfOpen, TradeWon) => CircuitBreakerState::closed(at),
        (HalfOpen, TradeLost { .. }) => open("probe trade lost".to_string()),
        (Closed | Open | HalfOpen, _) => state.clone(),
    }
}

pub struct CircuitBreaker {
    state: CircuitBreakerState,
    policy: TripPolicy,
    loss_window: Duration,
    initial_balance: Decimal,
    recent_losses: VecDeque<(DateTime<Utc>, Decimal)>,
    recent_failures: VecDeque<DateTime<Utc>>,
    consecutive_failures: u32,
}

impl CircuitBreaker {
    pub fn new(settings: &BreakerSettings, initial_balance: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            state: CircuitBreakerState::closed(now),
            policy: TripPolicy::from(settings),
            loss_window: Duration::from_std(settings.loss_window).unwrap_or_else(|_| Duration::days(1)),
            initial_balance,
            recent_losses: VecDeque::new(),
            recent_failures: VecDeque::new(),
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> &CircuitBreakerState {
        &self.state
    }

    pub fn phase(&self) -> BreakerPhase {
        self.state.phase
    }

    pub fn apply(&mut self, event: BreakerEvent, at: DateTime<Utc>) -> BreakerPhase {
        let next = transition(&self.state, event, at, &self.policy);
        if next.phase != self.state.phase {
            match next.phase {
                BreakerPhase::Open => error!(
                    "🔴 Circuit breaker OPEN: {} (cool-down {}s)",
                    next.reason.as_deref().unwrap_or("unknown"),
                    self.policy.cooldown.num_seconds()
                ),
                BreakerPhase::HalfOpen => warn!("🟡 Circuit breaker HALF-OPEN: one probe trade permitted"),
                BreakerPhase::Closed => info!("🟢 Circuit breaker CLOSED: probe trade succeeded"),
            }
        }
        self.state = next;
        self.state.phase
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> BreakerPhase {
        self.apply(BreakerEvent::Tick, now)
    }

    /// Feeds a completed trade: win or loss first, then the rolling loss window.
    pub fn record_trade(&mut self, net_profit: Decimal, loss_streak: u32, at: DateTime<Utc>) -> BreakerPhase {
        if net_profit > Decimal::ZERO {
            return self.apply(BreakerEvent::TradeWon, at);
        }

        self.apply(BreakerEvent::TradeLost { loss_streak }, at);
        if net_profit < Decimal::ZERO {
            self.recent_losses.push_back((at, -net_profit));
        }
        let total = self.window_loss(at);
        self.apply(BreakerEvent::WindowLoss { total }, at)
    }

    pub fn record_cycle_failure(&mut self, at: DateTime<Utc>) -> BreakerPhase {
        self.consecutive_failures += 1;
        self.recent_failures.push_back(at);
        let hour_ago = at - Duration::hours(1);
        while self.recent_failures.front().is_some_and(|t| *t < hour_ago) {
            self.recent_failures.pop_front();
        }
        self.apply(
            BreakerEvent::CycleFailed {
                consecutive: self.consecutive_failures,
                last_hour: self.recent_failures.len() as u32,
            },
            at,
        )
    }

    pub fn record_cycle_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn check_balance(&mut self, balance: Decimal, at: DateTime<Utc>) -> BreakerPhase {
        if self.initial_balance <= Decimal::ZERO {
            return self.state.phase;
        }
        let pct_of_initial = balance / self.initial_balance * Decimal::ONE_HUNDRED;
        self.apply(BreakerEvent::BalanceChecked { pct_of_initial }, at)
    }

    /// Realized losses inside the rolling window ending at `now`.
    pub fn window_loss(&mut self, now: DateTime<Utc>) -> Decimal {
        let cutoff = now - self.loss_window;
        while self.recent_losses.front().is_some_and(|(t, _)| *t < cutoff) {
            self.recent_losses.pop_front();
        }
        self.recent_losses.iter().map(|(_, loss)| *loss).sum()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Closed, or HalfOpen with its single probe still unused.
    pub fn permits_trade(&self) -> bool {
        match self.state.phase {
            BreakerPhase::Closed => true,
            BreakerPhase::HalfOpen => self.state.probe_count == 0,
            BreakerPhase::Open => false,
        }
    }

    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        if self.state.phase != BreakerPhase::Open {
            return std::time::Duration::ZERO;
        }
        (self.state.entered_at + self.policy.cooldown - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Time since the breaker last left Closed without getting back, HalfOpen
    /// stretches included. Zero while Closed.
    pub fn unrecovered_for(&self, now: DateTime<Utc>) -> std::time::Duration {
        self.state
            .tripped_at
            .and_then(|tripped| (now - tripped).to_std().ok())
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Administrative override back to Closed. Clears the loss and error windows.
    pub fn force_close(&mut self, now: DateTime<Utc>) {
        warn!("Circuit breaker manually forced CLOSED from {}", self.state.phase);
        self.state = CircuitBreakerState::closed(now);
        self.recent_losses.clear();
        self.recent_failures.clear();
        self.consecutive_failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn settings() -> BreakerSettings {
        BreakerSettings {
            loss_threshold: 3,
            cooldown: std::time::Duration::from_secs(600),
            abandon_after: std::time::Duration::from_secs(3600),
            ..Config::default().risk.breaker
        }
    }

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(&settings(), dec!(1000), t0())
    }

    fn lose(b: &mut CircuitBreaker, streak: u32, at: DateTime<Utc>) -> BreakerPhase {
        b.apply(BreakerEvent::TradeLost { loss_streak: streak }, at)
    }

    #[test]
    fn opens_after_exactly_threshold_losses() {
        let mut b = breaker();
        assert_eq!(lose(&mut b, 1, t0()), BreakerPhase::Closed);
        assert_eq!(lose(&mut b, 2, t0()), BreakerPhase::Closed);
        assert_eq!(lose(&mut b, 3, t0()), BreakerPhase::Open);
        assert!(!b.permits_trade());
        assert_eq!(b.cooldown_remaining(t0()), std::time::Duration::from_secs(600));
    }

    #[test]
    fn half_opens_after_cooldown_and_allows_one_probe() {
        let mut b = breaker();
        lose(&mut b, 3, t0());
        assert_eq!(b.tick(t0() + Duration::seconds(599)), BreakerPhase::Open);
        assert_eq!(b.tick(t0() + Duration::seconds(600)), BreakerPhase::HalfOpen);
        assert!(b.permits_trade());

        b.apply(BreakerEvent::ProbeAdmitted, t0() + Duration::seconds(601));
        assert_eq!(b.state().probe_count, 1);
        assert!(!b.permits_trade());
    }

    #[test]
    fn losing_probe_reopens_with_fresh_cooldown() {
        let mut b = breaker();
        lose(&mut b, 3, t0());
        let half_open_at = t0() + Duration::seconds(700);
        b.tick(half_open_at);
        b.apply(BreakerEvent::ProbeAdmitted, half_open_at);

        let probe_lost_at = half_open_at + Duration::seconds(5);
        assert_eq!(lose(&mut b, 4, probe_lost_at), BreakerPhase::Open);
        assert_eq!(b.state().entered_at, probe_lost_at);
        assert_eq!(b.tick(probe_lost_at + Duration::seconds(599)), BreakerPhase::Open);
        assert_eq!(b.unrecovered_for(probe_lost_at), std::time::Duration::from_secs(705));
    }

    #[test]
    fn winning_probe_closes() {
        let mut b = breaker();
        lose(&mut b, 3, t0());
        b.tick(t0() + Duration::seconds(600));
        assert_eq!(b.apply(BreakerEvent::TradeWon, t0() + Duration::seconds(610)), BreakerPhase::Closed);
        assert_eq!(b.state().tripped_at, None);
        assert_eq!(b.unrecovered_for(t0() + Duration::seconds(700)), std::time::Duration::ZERO);
    }

    #[test]
    fn losses_inside_window_trip_and_old_ones_expire() {
        let mut b = breaker();
        // 60 + 30 spread over 20 minutes: the first loss leaves the 15 minute window.
        assert_eq!(b.record_trade(dec!(-60), 1, t0()), BreakerPhase::Closed);
        b.record_trade(dec!(1), 0, t0() + Duration::minutes(10));
        assert_eq!(b.record_trade(dec!(-30), 1, t0() + Duration::minutes(20)), BreakerPhase::Closed);
        assert_eq!(b.window_loss(t0() + Duration::minutes(20)), dec!(30));

        assert_eq!(b.record_trade(dec!(-70), 2, t0() + Duration::minutes(25)), BreakerPhase::Open);
        assert!(b.state().reason.as_deref().unwrap().contains("loss window"));
    }

    #[test]
    fn consecutive_cycle_failures_trip_and_success_resets_count() {
        let mut b = breaker();
        for minute in 0..4 {
            assert_eq!(b.record_cycle_failure(t0() + Duration::minutes(minute)), BreakerPhase::Closed);
        }
        b.record_cycle_success();
        assert_eq!(b.consecutive_failures(), 0);

        for minute in 10..14 {
            b.record_cycle_failure(t0() + Duration::minutes(minute));
        }
        assert_eq!(b.record_cycle_failure(t0() + Duration::minutes(14)), BreakerPhase::Open);
        assert!(b.state().reason.as_deref().unwrap().contains("5 consecutive failed cycles"));
    }

    #[test]
    fn scattered_failures_trip_on_hourly_count() {
        let mut b = CircuitBreaker::new(
            &BreakerSettings {
                max_errors_per_hour: 4,
                ..settings()
            },
            dec!(1000),
            t0(),
        );
        for minute in [0, 10, 20] {
            b.record_cycle_failure(t0() + Duration::minutes(minute));
            b.record_cycle_success();
        }
        assert_eq!(b.record_cycle_failure(t0() + Duration::minutes(30)), BreakerPhase::Open);

        let mut late = CircuitBreaker::new(
            &BreakerSettings {
                max_errors_per_hour: 4,
                ..settings()
            },
            dec!(1000),
            t0(),
        );
        for minute in [0, 10, 20, 90] {
            late.record_cycle_failure(t0() + Duration::minutes(minute));
            late.record_cycle_success();
        }
        assert_eq!(late.phase(), BreakerPhase::Closed);
    }

    #[test]
    fn balance_below_floor_trips() {
        let mut b = breaker();
        assert_eq!(b.check_balance(dec!(500), t0()), BreakerPhase::Closed);
        assert_eq!(b.check_balance(dec!(499.99), t0()), BreakerPhase::Open);
        assert!(b.state().reason.as_deref().unwrap().contains("starting balance"));
    }

    #[test]
    fn transition_is_total() {
        let events = [
            BreakerEvent::Tick,
            BreakerEvent::ProbeAdmitted,
            BreakerEvent::TradeWon,
            BreakerEvent::TradeLost { loss_streak: 1 },
            BreakerEvent::TradeLost { loss_streak: 10 },
            BreakerEvent::WindowLoss { total: dec!(1000) },
            BreakerEvent::CycleFailed { consecutive: 9, last_hour: 50 },
            BreakerEvent::BalanceChecked { pct_of_initial: dec!(10) },
        ];
        let policy = TripPolicy::from(&settings());
        let at = t0() + Duration::seconds(10_000);
        for phase in [BreakerPhase::Closed, BreakerPhase::Open, BreakerPhase::HalfOpen] {
            let state = CircuitBreakerState { phase, ..CircuitBreakerState::closed(t0()) };
            for event in events {
                let next = transition(&state, event, at, &policy);
                assert!(next.entered_at >= state.entered_at);
            }
        }
    }

    #[test]
    fn trip_conditions_only_fire_from_closed() {
        let policy = TripPolicy::from(&settings());
        let open = transition(
            &CircuitBreakerState::closed(t0()),
            BreakerEvent::BalanceChecked { pct_of_initial: dec!(1) },
            t0(),
            &policy,
        );
        let later = t0() + Duration::seconds(30);
        let again = transition(&open, BreakerEvent::WindowLoss { total: dec!(1000) }, later, &policy);
        assert_eq!(again, open);
    }

    #[test]
    fn force_close_overrides_open() {
        let mut b = breaker();
        b.record_trade(dec!(-150), 1, t0());
        assert_eq!(b.phase(), BreakerPhase::Open);
        b.force_close(t0() + Duration::seconds(1));
        assert_eq!(b.phase(), BreakerPhase::Closed);
        assert!(b.permits_trade());
        assert_eq!(b.window_loss(t0() + Duration::seconds(2)), Decimal::ZERO);
    }
}
