//! Display and printing utilities

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::orchestrator::RunStatistics;
use crate::risk::BreakerPhase;
use crate::types::{ArbitrageOpportunity, DailyTally, SimulatedTrade};

/// Everything one cycle saw and decided.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub quotes_collected: usize,
    pub quotes_failed: usize,
    pub opportunities_detected: usize,
    /// Passed liquidity validation.
    pub opportunities_validated: usize,
    /// Validated and at or above the minimum score.
    pub opportunities_ranked: usize,
    /// Why candidates were dropped before ranking (liquidity, missing depth).
    pub skipped: Vec<String>,
    pub chosen: Option<ArbitrageOpportunity>,
    /// Every failed risk check for the chosen candidate, first one decisive.
    pub denial_reasons: Vec<String>,
    pub breaker_phase: BreakerPhase,
    pub daily: DailyTally,
    pub trade: Option<SimulatedTrade>,
}

/// Receives cycle summaries. Implementations must not block.
pub trait CycleObserver: Send + Sync {
    fn on_cycle(&self, summary: &CycleSummary);
}

/// Emits summaries through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl CycleObserver for LogObserver {
    fn on_cycle(&self, summary: &CycleSummary) {
        info!(
            cycle = summary.cycle,
            quotes = summary.quotes_collected,
            failed = summary.quotes_failed,
            detected = summary.opportunities_detected,
            validated = summary.opportunities_validated,
            ranked = summary.opportunities_ranked,
            breaker = %summary.breaker_phase,
            trades_today = summary.daily.trade_count,
            pnl_today = %summary.daily.realized_pnl,
            "Cycle complete"
        );

        for reason in &summary.skipped {
            info!("   ⏭️  {}", reason);
        }

        if let Some(opportunity) = &summary.chosen {
            print_arbitrage_opportunity(opportunity);
        }

        if let Some((first, rest)) = summary.denial_reasons.split_first() {
            warn!("   🛑 Denied: {}", first);
            for reason in rest {
                warn!("      also: {}", reason);
            }
        }

        if let Some(trade) = &summary.trade {
            print_simulated_trade(trade);
        }
    }
}

pub fn print_arbitrage_opportunity(opportunity: &ArbitrageOpportunity) {
    let grade = opportunity
        .score_breakdown
        .as_ref()
        .map(|b| b.grade)
        .unwrap_or('-');
    info!("🎯 Best opportunity: {}", opportunity.route());
    info!(
        "   Buy {} @ {} | Sell {} @ {} | size {}",
        opportunity.buy_venue,
        opportunity.buy_price,
        opportunity.sell_venue,
        opportunity.sell_price,
        opportunity.size.normalize()
    );
    info!(
        "   Spread {:.4}% | gross {:.4} | fees {:.4} | net {:.4} ({:.4}%)",
        opportunity.spread_pct(),
        opportunity.gross_spread,
        opportunity.total_fees,
        opportunity.net_profit,
        opportunity.net_profit_pct()
    );
    info!("   Score {:.1} [{}] | latency {} ms", opportunity.score, grade, opportunity.combined_latency_ms);
}

pub fn print_simulated_trade(trade: &SimulatedTrade) {
    let outcome = if trade.is_win() { "✅ WIN" } else { "❌ LOSS" };
    info!("🎭 Dry-run trade {} {}", trade.id, outcome);
    info!(
        "   Buy {} vwap {:.4} (slip {:.4}) | Sell {} vwap {:.4} (slip {:.4})",
        trade.buy.venue,
        trade.buy.vwap_price,
        trade.buy.slippage,
        trade.sell.venue,
        trade.sell.vwap_price,
        trade.sell.slippage
    );
    info!(
        "   Size {} | expected {:.4} | realized {:.4} | balance {:.2}",
        trade.traded_size.normalize(),
        trade.expected_profit,
        trade.net_profit,
        trade.balance_after
    );
}

pub fn print_session_stats(stats: &RunStatistics, now: DateTime<Utc>) {
    let runtime = (now - stats.started_at).num_seconds().max(0) / 60;

    info!("\n📊 Session Statistics ({} minutes, {} cycles)", runtime, stats.cycles);
    info!("   📈 MARKET DATA:");
    info!("     Quotes collected: {}", stats.quotes_collected);
    info!("     Pair failures: {}", stats.quote_failures);

    info!("   🎯 OPPORTUNITIES:");
    info!("     Detected: {}", stats.opportunities_detected);
    info!("     Liquidity validated: {}", stats.opportunities_validated);
    info!("     Above minimum score: {}", stats.opportunities_ranked);
    info!("     Denied by risk: {}", stats.denials.values().sum::<u64>());
    for (reason, count) in &stats.denials {
        info!("       {}: {}", reason, count);
    }

    info!("   🚀 DRY-RUN EXECUTION:");
    info!("     Trades: {} ({} wins / {} losses)", stats.trades_executed, stats.wins, stats.losses);
    info!(
        "     Win rate: {:.1}%",
        if stats.trades_executed > 0 {
            (stats.wins as f64 / stats.trades_executed as f64) * 100.0
        } else {
            0.0
        }
    );
    info!("     Realized P&L: {:.4}", stats.realized_pnl);
    info!("     Balance: {:.2}", stats.final_balance);

    info!("   ⚙️  SYSTEM:");
    info!("     Circuit breaker: {}", stats.breaker_phase);
    if stats.persistence_failures > 0 {
        warn!("     Persistence failures: {}", stats.persistence_failures);
    }
    if !stats.errors.is_empty() {
        info!("     Error summary:");
        for (class, count) in &stats.errors {
            info!("       {}: {}", class.as_str(), count);
        }
    }
    if let Some(reason) = &stats.stop_reason {
        info!("     Stopped: {}", reason);
    }

    info!("");
}
