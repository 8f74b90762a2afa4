//! Daily tally snapshots
//!
//! Every save appends a line; the last line for a day is that day's tally.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::append_jsonl;
use crate::types::DailyTally;

pub fn save_daily_tally(root: &Path, tally: &DailyTally) -> Result<()> {
    append_jsonl(&tallies_path(root), tally)?;

    debug!(
        day = %tally.day,
        trades = tally.trade_count,
        pnl = %tally.realized_pnl,
        "Saved daily tally"
    );

    Ok(())
}

/// Latest tally saved for `day`. Unreadable lines are skipped.
pub fn load_daily_tally(root: &Path, day: NaiveDate) -> Result<Option<DailyTally>> {
    let path = tallies_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let content =
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut latest = None;
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DailyTally>(line) {
            Ok(tally) if tally.day == day => latest = Some(tally),
            Ok(_) => {}
            Err(e) => warn!("Skipping {}:{}: {}", path.display(), index + 1, e),
        }
    }

    Ok(latest)
}

fn tallies_path(root: &Path) -> PathBuf {
    root.join("daily").join("daily_tallies.jsonl")
}
