use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::CollectedStats;
use crate::state_store::{StateMap, StateStore, StateStoreExt};

pub const KEY_WEEKLY_ROI: &str = "weeklyRoi";
pub const KEY_LAST_WEEK_ROI: &str = "lastWeekRoi";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRoi {
    pub week_start: DateTime<Utc>,
    pub clicks_this_week: u64,
    pub blocked_this_week: u64,
    pub sessions_this_week: u64,
}

/// Monday 00:00 UTC of the week containing `now`
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let monday = date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64);
    monday.and_time(NaiveTime::MIN).and_utc()
}

impl WeeklyRoi {
    pub fn starting(week_start: DateTime<Utc>) -> Self {
        Self {
            week_start,
            clicks_this_week: 0,
            blocked_this_week: 0,
            sessions_this_week: 0,
        }
    }

    /// Start a fresh week if `now` is past this one; returns the finished week
    pub fn rollover(&mut self, now: DateTime<Utc>) -> Option<WeeklyRoi> {
        let current = week_start(now);
        if self.week_start == current {
            return None;
        }
        Some(std::mem::replace(self, WeeklyRoi::starting(current)))
    }

    pub fn add(&mut self, collected: CollectedStats) {
        self.clicks_this_week += collected.clicks;
        self.blocked_this_week += collected.blocked;
    }
}

fn read_entry(map: &StateMap, key: &str) -> Option<WeeklyRoi> {
    map.get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

/// Load, roll over, modify and persist the current week in one locked cycle
fn apply(
    store: &dyn StateStore,
    now: DateTime<Utc>,
    mut f: impl FnMut(&mut WeeklyRoi),
) -> Result<WeeklyRoi> {
    let mut updated = WeeklyRoi::starting(week_start(now));

    store.update(&mut |map| {
        let mut roi =
            read_entry(map, KEY_WEEKLY_ROI).unwrap_or_else(|| WeeklyRoi::starting(week_start(now)));

        if let Some(finished) = roi.rollover(now) {
            info!(
                "Week of {} done: {} clicks, {} blocked, {} sessions",
                finished.week_start.format("%Y-%m-%d"),
                finished.clicks_this_week,
                finished.blocked_this_week,
                finished.sessions_this_week
            );
            map.insert(
                KEY_LAST_WEEK_ROI.to_string(),
                serde_json::to_value(&finished)?,
            );
        }

        f(&mut roi);
        map.insert(KEY_WEEKLY_ROI.to_string(), serde_json::to_value(&roi)?);
        updated = roi;
        Ok(())
    })?;

    Ok(updated)
}

/// Fold collected agent counters into the current week
pub fn record(
    store: &dyn StateStore,
    collected: CollectedStats,
    now: DateTime<Utc>,
) -> Result<WeeklyRoi> {
    apply(store, now, |roi| roi.add(collected))
}

pub fn record_session(store: &dyn StateStore, now: DateTime<Utc>) -> Result<WeeklyRoi> {
    apply(store, now, |roi| roi.sessions_this_week += 1)
}

/// Current week as it would read after a rollover, without writing
pub fn current(store: &dyn StateStore, now: DateTime<Utc>) -> WeeklyRoi {
    let mut roi = store.get(KEY_WEEKLY_ROI, WeeklyRoi::starting(week_start(now)));
    roi.rollover(now);
    roi
}

pub fn last_week(store: &dyn StateStore) -> Option<WeeklyRoi> {
    store.get(KEY_LAST_WEEK_ROI, None)
}

#[cfg(test)]
#[path = "roi_test.rs"]
mod roi_test;
