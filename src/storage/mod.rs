//! Data persistence and file operations

pub mod daily;
pub mod opportunities;
pub mod trades;

pub use daily::*;
pub use opportunities::*;
pub use trades::*;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::{ArbitrageOpportunity, DailyTally, SimulatedTrade};

/// Sink for the records a run produces. Callers log failures and carry on.
pub trait Persistence: Send + Sync {
    fn save_opportunity(&self, opportunity: &ArbitrageOpportunity) -> Result<()>;
    fn save_trade(&self, trade: &SimulatedTrade) -> Result<()>;
    fn save_daily_tally(&self, tally: &DailyTally) -> Result<()>;

    /// Today's tally from an earlier process, so restarts keep the daily caps.
    fn load_daily_tally(&self, _day: NaiveDate) -> Result<Option<DailyTally>> {
        Ok(None)
    }
}

/// Appends one JSON document per line to dated files under `root`.
#[derive(Debug, Clone)]
pub struct JsonlStorage {
    root: PathBuf,
}

impl JsonlStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Persistence for JsonlStorage {
    fn save_opportunity(&self, opportunity: &ArbitrageOpportunity) -> Result<()> {
        save_opportunity(&self.root, opportunity)
    }

    fn save_trade(&self, trade: &SimulatedTrade) -> Result<()> {
        save_trade(&self.root, trade)
    }

    fn save_daily_tally(&self, tally: &DailyTally) -> Result<()> {
        save_daily_tally(&self.root, tally)
    }

    fn load_daily_tally(&self, day: NaiveDate) -> Result<Option<DailyTally>> {
        load_daily_tally(&self.root, day)
    }
}

pub(crate) fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    writeln!(file, "{}", serde_json::to_string(record)?)?;
    Ok(())
}
