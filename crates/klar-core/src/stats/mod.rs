//! Daily focus statistics.
//!
//! Stats accumulate as a side effect of completed phases. Authenticated users
//! get server-computed numbers; everyone else keeps a date-keyed snapshot in
//! the local store which is discarded once the calendar date changes.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, TodayStats};
use crate::error::StorageError;
use crate::storage::{keys, KeyValueStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub focus_seconds_today: u64,
    pub breaks_taken: u32,
    pub breaks_missed: u32,
}

impl DailyStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            focus_seconds_today: 0,
            breaks_taken: 0,
            breaks_missed: 0,
        }
    }

    pub fn today() -> Self {
        Self::empty(local_today())
    }

    /// Reset counters when `today` differs from the recorded date.
    /// Returns true if a reset happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        *self = Self::empty(today);
        true
    }

    pub fn from_remote(date: NaiveDate, remote: TodayStats) -> Self {
        Self {
            date,
            focus_seconds_today: remote.total_focus_seconds,
            breaks_taken: remote.breaks_taken,
            breaks_missed: remote.breaks_missed,
        }
    }

    pub fn record_focus(&mut self, secs: u64) {
        self.focus_seconds_today = self.focus_seconds_today.saturating_add(secs);
    }

    pub fn record_break_taken(&mut self) {
        self.breaks_taken = self.breaks_taken.saturating_add(1);
    }

    pub fn record_break_missed(&mut self) {
        self.breaks_missed = self.breaks_missed.saturating_add(1);
    }
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Load the locally persisted snapshot for `today`.
///
/// Missing, undecodable or stale-dated records all yield zeroed stats.
pub fn load_local(store: &dyn KeyValueStore, today: NaiveDate) -> DailyStats {
    let raw = match store.get(keys::DAILY_STATS) {
        Ok(Some(raw)) => raw,
        Ok(None) => return DailyStats::empty(today),
        Err(e) => {
            tracing::warn!("failed to read local stats: {e}");
            return DailyStats::empty(today);
        }
    };
    match serde_json::from_str::<DailyStats>(&raw) {
        Ok(stats) if stats.date == today => stats,
        Ok(stats) => {
            tracing::debug!("discarding stale local stats from {}", stats.date);
            DailyStats::empty(today)
        }
        Err(e) => {
            tracing::warn!("discarding corrupt local stats: {e}");
            DailyStats::empty(today)
        }
    }
}

pub fn save_local(store: &dyn KeyValueStore, stats: &DailyStats) -> Result<(), StorageError> {
    let json = serde_json::to_string(stats).map_err(|e| StorageError::Corrupt {
        key: keys::DAILY_STATS.into(),
        message: e.to_string(),
    })?;
    store.set(keys::DAILY_STATS, &json)
}

/// Today's stats: server-computed when authenticated, otherwise (or when the
/// backend fails) the local snapshot.
pub async fn load_today(client: Option<&ApiClient>, store: &dyn KeyValueStore, today: NaiveDate) -> DailyStats {
    if let Some(client) = client {
        match client.today_stats().await {
            Ok(remote) => return DailyStats::from_remote(today, remote),
            Err(e) => tracing::warn!("loading today's stats failed, using local snapshot: {e}"),
        }
    }
    load_local(store, today)
}
