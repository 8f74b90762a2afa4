//! Simulated trade storage

use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::append_jsonl;
use crate::types::SimulatedTrade;

pub fn save_trade(root: &Path, trade: &SimulatedTrade) -> Result<()> {
    let path = root
        .join("trades")
        .join(format!("trades_{}.jsonl", trade.timestamp.format("%Y-%m-%d")));

    append_jsonl(&path, trade)?;

    info!(
        trade_id = %trade.id,
        opportunity_id = %trade.opportunity_id,
        net_profit = %trade.net_profit.round_dp(4),
        balance = %trade.balance_after.round_dp(2),
        "Saved simulated trade"
    );

    Ok(())
}
