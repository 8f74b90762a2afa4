//! Arbitrage opportunity storage

use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::append_jsonl;
use crate::types::ArbitrageOpportunity;

pub fn save_opportunity(root: &Path, opp: &ArbitrageOpportunity) -> Result<()> {
    let path = root
        .join("opportunities")
        .join(format!("arbitrage_{}.jsonl", opp.timestamp.format("%Y-%m-%d")));

    append_jsonl(&path, opp)?;

    info!(
        opportunity_id = %opp.id,
        route = %opp.route(),
        net_profit = %opp.net_profit.round_dp(4),
        score = opp.score,
        "Saved arbitrage opportunity"
    );

    Ok(())
}
