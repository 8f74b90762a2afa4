//! Cross-exchange arbitrage bot - main entry point

use anyhow::{Context, Result};
use cex_arb_bot::*;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use cex_arb_bot::network::{RetryConfig, VenueRegistry};
use cex_arb_bot::storage::JsonlStorage;
use cex_arb_bot::utils::{self, LogObserver};

#[derive(Parser, Debug)]
#[command(name = "cex-arb-bot", version, about = "Cross-exchange arbitrage bot (dry-run)")]
struct Cli {
    /// Simulate trades instead of sending orders
    #[arg(long)]
    dry_run: bool,

    /// Validate configuration and exit
    #[arg(long)]
    check_config: bool,

    /// Ping every configured venue and exit
    #[arg(long)]
    test_connections: bool,

    /// Stop after this many seconds
    #[arg(long, value_name = "SECS")]
    duration: Option<u64>,

    /// Stop after this many cycles
    #[arg(long, value_name = "N")]
    max_cycles: Option<u64>,

    /// Seconds between cycles
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(secs) = cli.duration {
        config.stop.max_duration = Some(Duration::from_secs(secs));
    }
    if let Some(cycles) = cli.max_cycles {
        config.stop.max_cycles = Some(cycles);
    }
    if let Some(secs) = cli.interval {
        config.poll_interval = Duration::from_secs(secs);
    }

    utils::setup_output_directories(&config.output_dir)?;
    let _logging_guard = utils::setup_logging(&config.output_dir.join("logs"))?;

    info!("💱 Cross-Exchange Arbitrage Bot v{}", env!("CARGO_PKG_VERSION"));
    print_config(&config);

    if let Err(e) = config.validate() {
        error!("❌ Invalid configuration: {}", e);
        return Err(e.into());
    }

    if cli.check_config {
        info!("✅ Configuration is valid");
        return Ok(());
    }

    let clients = VenueRegistry::create_all(&config.venues, &config.collector)?;

    if cli.test_connections {
        let report = utils::check_venue_health(
            &clients,
            &RetryConfig::from(&config.collector),
            config.collector.request_timeout,
        )
        .await;
        utils::print_health_report(&report);

        let unreachable: Vec<_> = report.iter().filter(|h| !h.reachable).map(|h| h.venue.as_str()).collect();
        if !unreachable.is_empty() {
            anyhow::bail!("Unreachable venues: {}", unreachable.join(", "));
        }
        return Ok(());
    }

    if !cli.dry_run {
        error!("❌ Live execution is not supported; run with --dry-run");
        anyhow::bail!("refusing to start without --dry-run");
    }

    let persistence = Arc::new(JsonlStorage::new(config.output_dir.clone()));
    let mut orchestrator =
        TradingOrchestrator::new(config, clients, persistence, Arc::new(LogObserver), Utc::now())?;

    let stats = orchestrator.run().await?;
    info!(
        "👋 Finished after {} cycles, {} trades, P&L {}",
        stats.cycles, stats.trades_executed, stats.realized_pnl
    );

    Ok(())
}

fn print_config(config: &Config) {
    info!("📋 Configuration:");
    info!("   Venues: {}", config.venues.join(", "));
    info!("   Instruments: {}", config.instruments.join(", "));
    info!("   Trade amount: {} | Min profit: {}", config.trade_amount, config.min_profit);
    info!(
        "   Trade bounds: [{}, {}] | Max slippage: {}%",
        config.risk.min_trade_amount, config.risk.max_trade_amount, config.risk.max_slippage_pct
    );
    info!(
        "   Daily caps: {} trades, {} loss | Streak cap: {} | Reserve: {}",
        config.risk.max_daily_trades,
        config.risk.max_daily_loss,
        config.risk.max_consecutive_losses,
        config.risk.min_balance_reserve
    );
    info!(
        "   Breaker: {} losses, cool-down {:?}, abandon after {:?}",
        config.risk.breaker.loss_threshold, config.risk.breaker.cooldown, config.risk.breaker.abandon_after
    );
    info!(
        "   Weights: profit {} | liquidity {} | spread/volume {} | stability {} | latency {}",
        config.scoring.profit,
        config.scoring.liquidity,
        config.scoring.spread_volume,
        config.scoring.stability,
        config.scoring.latency
    );
    info!("   Poll interval: {:?} | Output: {}", config.poll_interval, config.output_dir.display());
    if let Some(d) = config.stop.max_duration {
        info!("   Max duration: {:?}", d);
    }
    if let Some(c) = config.stop.max_cycles {
        info!("   Max cycles: {}", c);
    }
}
