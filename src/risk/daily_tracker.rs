//! Per-calendar-day trade tally

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::types::DailyTally;

pub struct DailyTracker {
    tally: DailyTally,
    reset_loss_streak_on_new_day: bool,
}

impl DailyTracker {
    pub fn new(today: NaiveDate, reset_loss_streak_on_new_day: bool) -> Self {
        Self {
            tally: DailyTally::new(today),
            reset_loss_streak_on_new_day,
        }
    }

    /// Resumes from a tally saved earlier the same day.
    pub fn from_tally(tally: DailyTally, reset_loss_streak_on_new_day: bool) -> Self {
        Self {
            tally,
            reset_loss_streak_on_new_day,
        }
    }

    pub fn snapshot(&self) -> &DailyTally {
        &self.tally
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.tally.consecutive_losses
    }

    /// The tally as it will look for a trade at `now`: a fresh day (with the
    /// carried loss streak) once the stored day is in the past.
    pub fn effective_snapshot(&self, now: DateTime<Utc>) -> DailyTally {
        let today = now.date_naive();
        if today > self.tally.day {
            self.fresh_day(today)
        } else {
            self.tally.clone()
        }
    }

    /// Records one completed trade. Returns the previous day's tally when
    /// this trade is the first one past a day boundary.
    pub fn record(&mut self, net_profit: Decimal, at: DateTime<Utc>) -> Option<DailyTally> {
        let day = at.date_naive();
        let archived = if day > self.tally.day {
            let fresh = self.fresh_day(day);
            let previous = std::mem::replace(&mut self.tally, fresh);
            info!(
                "📅 New trading day {}: archived {} with {} trades, P&L {}",
                day, previous.day, previous.trade_count, previous.realized_pnl
            );
            Some(previous)
        } else {
            if day < self.tally.day {
                warn!("Trade dated {} precedes current day {}, counting it today", day, self.tally.day);
            }
            None
        };

        let tally = &mut self.tally;
        tally.trade_count += 1;
        tally.realized_pnl += net_profit;

        if tally.trade_count == 1 {
            tally.best_trade = net_profit;
            tally.worst_trade = net_profit;
        } else {
            tally.best_trade = tally.best_trade.max(net_profit);
            tally.worst_trade = tally.worst_trade.min(net_profit);
        }

        if net_profit > Decimal::ZERO {
            tally.wins += 1;
            tally.consecutive_losses = 0;
            tally.current_win_streak += 1;
            tally.max_win_streak = tally.max_win_streak.max(tally.current_win_streak);
        } else {
            tally.losses += 1;
            tally.consecutive_losses += 1;
            tally.current_win_streak = 0;
            tally.max_loss_streak = tally.max_loss_streak.max(tally.consecutive_losses);
        }

        archived
    }

    fn fresh_day(&self, day: NaiveDate) -> DailyTally {
        let mut fresh = DailyTally::new(day);
        if !self.reset_loss_streak_on_new_day {
            fresh.consecutive_losses = self.tally.consecutive_losses;
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn tracker(reset: bool) -> DailyTracker {
        DailyTracker::new(at(1, 0).date_naive(), reset)
    }

    #[test]
    fn tracks_counts_pnl_and_streaks() {
        let mut t = tracker(false);
        t.record(dec!(2), at(1, 9));
        t.record(dec!(-1), at(1, 10));
        t.record(dec!(-0.5), at(1, 11));

        let tally = t.snapshot();
        assert_eq!(tally.trade_count, 3);
        assert_eq!(tally.realized_pnl, dec!(0.5));
        assert_eq!(tally.consecutive_losses, 2);
        assert_eq!(tally.best_trade, dec!(2));
        assert_eq!(tally.worst_trade, dec!(-1));
        assert_eq!(tally.max_win_streak, 1);

        t.record(dec!(0.3), at(1, 12));
        assert_eq!(t.consecutive_losses(), 0);
    }

    #[test]
    fn day_boundary_resets_count_and_pnl_but_keeps_loss_streak() {
        let mut t = tracker(false);
        t.record(dec!(-1), at(1, 22));
        t.record(dec!(-1), at(1, 23));

        let archived = t.record(dec!(-1), at(2, 0)).expect("previous day archived");
        assert_eq!(archived.trade_count, 2);
        assert_eq!(archived.realized_pnl, dec!(-2));

        let tally = t.snapshot();
        assert_eq!(tally.day, at(2, 0).date_naive());
        assert_eq!(tally.trade_count, 1);
        assert_eq!(tally.realized_pnl, dec!(-1));
        assert_eq!(tally.consecutive_losses, 3);
    }

    #[test]
    fn loss_streak_reset_is_configurable() {
        let mut t = tracker(true);
        t.record(dec!(-1), at(1, 23));
        t.record(dec!(-1), at(2, 1));
        assert_eq!(t.consecutive_losses(), 1);
    }

    #[test]
    fn resumed_tally_keeps_counting() {
        let mut saved = DailyTally::new(at(1, 0).date_naive());
        saved.trade_count = 4;
        saved.realized_pnl = dec!(-3);
        saved.consecutive_losses = 2;

        let mut t = DailyTracker::from_tally(saved, false);
        t.record(dec!(-1), at(1, 15));
        assert_eq!(t.snapshot().trade_count, 5);
        assert_eq!(t.snapshot().realized_pnl, dec!(-4));
        assert_eq!(t.consecutive_losses(), 3);
    }

    #[test]
    fn effective_snapshot_rolls_stale_day() {
        let mut t = tracker(false);
        for hour in 1..6 {
            t.record(dec!(-1), at(1, hour));
        }
        let view = t.effective_snapshot(at(2, 8));
        assert_eq!(view.trade_count, 0);
        assert_eq!(view.realized_pnl, Decimal::ZERO);
        assert_eq!(view.consecutive_losses, 5);
        assert_eq!(t.snapshot().trade_count, 5);
    }
}
