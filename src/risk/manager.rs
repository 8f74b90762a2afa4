//! Pre-trade admission control

use rust_decimal::prelude::*;
use tracing::debug;

use super::circuit_breaker::{BreakerPhase, CircuitBreaker};
use crate::config::RiskLimits;
use crate::types::{ArbitrageOpportunity, DailyTally, DenialReason, FailedCheck, RiskDecision};

pub struct RiskManager {
    limits: RiskLimits,
}

impl RiskManager {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Downside assumed if the trade goes wrong: fees plus adverse slippage
    /// on both legs, capped by the per-trade loss limit.
    pub fn worst_case_loss(&self, opportunity: &ArbitrageOpportunity) -> Decimal {
        let slippage = opportunity.notional() * self.limits.max_slippage_pct / Decimal::ONE_HUNDRED * Decimal::TWO;
        (opportunity.total_fees + slippage).min(self.limits.max_loss_per_trade)
    }

    /// Runs every check in order. The first failure is the denial reason;
    /// the rest are kept for observability.
    pub fn evaluate(
        &self,
        opportunity: &ArbitrageOpportunity,
        tally: &DailyTally,
        breaker: &CircuitBreaker,
        balance: Decimal,
    ) -> RiskDecision {
        let limits = &self.limits;
        let notional = opportunity.notional();
        let mut failed = Vec::new();
        let mut fail = |reason: DenialReason, detail: String| {
            failed.push(FailedCheck { reason, detail });
        };

        if !breaker.permits_trade() {
            let state = breaker.state();
            fail(
                DenialReason::CircuitOpen,
                format!(
                    "breaker {} ({})",
                    state.phase,
                    state.reason.as_deref().unwrap_or("probe already in flight")
                ),
            );
        }

        if notional < limits.min_trade_amount {
            fail(
                DenialReason::TradeAmountBelowMinimum,
                format!("notional {} < min {}", notional.round_dp(2), limits.min_trade_amount),
            );
        }
        if notional > limits.max_trade_amount {
            fail(
                DenialReason::TradeAmountAboveMaximum,
                format!("notional {} > max {}", notional.round_dp(2), limits.max_trade_amount),
            );
        }

        if tally.trade_count >= limits.max_daily_trades {
            fail(
                DenialReason::DailyTradeLimitExceeded,
                format!("{}/{} trades today", tally.trade_count, limits.max_daily_trades),
            );
        }

        let projected_loss = tally.realized_loss() + self.worst_case_loss(opportunity);
        if projected_loss > limits.max_daily_loss {
            fail(
                DenialReason::DailyLossLimitExceeded,
                format!(
                    "projected loss {} > max {}",
                    projected_loss.round_dp(2),
                    limits.max_daily_loss
                ),
            );
        }

        // The HalfOpen probe is how a tripped breaker recovers; blocking it on
        // the streak that tripped the breaker would leave it stuck.
        if breaker.phase() != BreakerPhase::HalfOpen
            && tally.consecutive_losses >= limits.max_consecutive_losses
        {
            fail(
                DenialReason::ConsecutiveLossLimitExceeded,
                format!(
                    "{} consecutive losses (max {})",
                    tally.consecutive_losses, limits.max_consecutive_losses
                ),
            );
        }

        if balance - notional < limits.min_balance_reserve {
            fail(
                DenialReason::InsufficientBalanceReserve,
                format!(
                    "balance {} - {} < reserve {}",
                    balance.round_dp(2),
                    notional.round_dp(2),
                    limits.min_balance_reserve
                ),
            );
        }

        let decision = RiskDecision { failed_checks: failed };
        if let Some(denial) = decision.denial() {
            debug!(
                "Risk denied {}: {} ({} checks failed)",
                opportunity.route(),
                denial.reason,
                decision.failed_checks.len()
            );
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::risk::circuit_breaker::BreakerEvent;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn opportunity(size: Decimal) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            id: "o".into(),
            timestamp: Utc::now(),
            instrument: "BTC/USDT".into(),
            buy_venue: "binance".into(),
            sell_venue: "kraken".into(),
            buy_price: dec!(100),
            sell_price: dec!(102),
            size,
            gross_spread: dec!(2) * size,
            buy_fee: dec!(0.1) * size,
            sell_fee: dec!(0.1) * size,
            total_fees: dec!(0.2) * size,
            net_profit: dec!(1.8) * size,
            combined_latency_ms: 30,
            validated_liquidity: Some(size),
            score: 80.0,
            score_breakdown: None,
        }
    }

    fn setup() -> (RiskManager, CircuitBreaker, DailyTally) {
        let config = Config::default();
        let breaker = CircuitBreaker::new(&config.risk.breaker, config.initial_balance, Utc::now());
        let tally = DailyTally::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        (RiskManager::new(config.risk), breaker, tally)
    }

    #[test]
    fn admits_trade_within_limits() {
        let (risk, breaker, tally) = setup();
        let decision = risk.evaluate(&opportunity(dec!(0.5)), &tally, &breaker, dec!(10000));
        assert!(decision.is_allowed(), "{:?}", decision);
    }

    #[test]
    fn denies_on_trade_amount_bounds_regardless_of_profit() {
        let (risk, breaker, tally) = setup();
        let small = risk.evaluate(&opportunity(dec!(0.05)), &tally, &breaker, dec!(10000));
        assert_eq!(small.denial_reason(), Some(DenialReason::TradeAmountBelowMinimum));

        let large = risk.evaluate(&opportunity(dec!(2)), &tally, &breaker, dec!(10000));
        assert_eq!(large.denial_reason(), Some(DenialReason::TradeAmountAboveMaximum));
    }

    #[test]
    fn eleventh_trade_of_the_day_is_denied() {
        let (_, breaker, mut tally) = setup();
        let mut limits = Config::default().risk;
        limits.max_daily_trades = 10;
        let risk = RiskManager::new(limits);

        tally.trade_count = 9;
        assert!(risk.evaluate(&opportunity(dec!(0.5)), &tally, &breaker, dec!(10000)).is_allowed());

        tally.trade_count = 10;
        let decision = risk.evaluate(&opportunity(dec!(0.5)), &tally, &breaker, dec!(10000));
        assert_eq!(decision.denial_reason(), Some(DenialReason::DailyTradeLimitExceeded));
    }

    #[test]
    fn open_breaker_denies_first_and_other_failures_are_listed() {
        let (risk, mut breaker, mut tally) = setup();
        breaker.apply(BreakerEvent::TradeLost { loss_streak: 5 }, Utc::now());
        tally.consecutive_losses = 5;
        tally.realized_pnl = dec!(-499.99);

        let decision = risk.evaluate(&opportunity(dec!(0.5)), &tally, &breaker, dec!(1020));
        let reasons: Vec<_> = decision.failed_checks.iter().map(|c| c.reason).collect();
        assert_eq!(
            reasons,
            vec![
                DenialReason::CircuitOpen,
                DenialReason::DailyLossLimitExceeded,
                DenialReason::ConsecutiveLossLimitExceeded,
                DenialReason::InsufficientBalanceReserve,
            ]
        );
    }

    #[test]
    fn half_open_probe_is_not_blocked_by_loss_streak() {
        let (risk, mut breaker, mut tally) = setup();
        let tripped = Utc::now() - chrono::Duration::hours(1);
        breaker.apply(BreakerEvent::TradeLost { loss_streak: 5 }, tripped);
        breaker.tick(Utc::now());
        tally.consecutive_losses = 5;

        let decision = risk.evaluate(&opportunity(dec!(0.5)), &tally, &breaker, dec!(10000));
        assert!(decision.is_allowed(), "{:?}", decision);
    }

    #[test]
    fn worst_case_is_capped_per_trade() {
        let (risk, _, _) = setup();
        // fees 0.1 + 50 * 0.5% * 2 = 0.6
        assert_eq!(risk.worst_case_loss(&opportunity(dec!(0.5))), dec!(0.6));

        let mut huge = opportunity(dec!(1000));
        huge.total_fees = dec!(900);
        assert_eq!(risk.worst_case_loss(&huge), dec!(50));
    }
}
