use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Words that mark a click as running a terminal command
const TERMINAL_KEYWORDS: &[&str] = &["run", "execute", "command", "terminal"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub clicks: u64,
    pub blocked: u64,
    /// Blocks over the whole session; not cleared by `collect_and_clear`
    #[serde(default)]
    pub blocked_total: u64,
    pub file_edits: u64,
    pub terminal_commands: u64,
    pub actions_while_away: u64,
    pub is_window_focused: bool,
    pub session_start_time: DateTime<Utc>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::started_at(Utc::now())
    }
}

/// Counters handed over by `collect_and_clear`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedStats {
    pub clicks: u64,
    pub blocked: u64,
}

impl std::ops::AddAssign for CollectedStats {
    fn add_assign(&mut self, other: Self) {
        self.clicks += other.clicks;
        self.blocked += other.blocked;
    }
}

/// Running totals for the current session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub total_actions: u64,
    pub file_edits: u64,
    pub terminal_commands: u64,
    pub blocked: u64,
    pub session_start_time: DateTime<Utc>,
    pub duration_secs: i64,
}

impl SessionStats {
    pub fn started_at(now: DateTime<Utc>) -> Self {
        Self {
            clicks: 0,
            blocked: 0,
            blocked_total: 0,
            file_edits: 0,
            terminal_commands: 0,
            actions_while_away: 0,
            is_window_focused: true,
            session_start_time: now,
        }
    }

    pub fn track_click(&mut self, text: &str) {
        self.clicks += 1;

        let lowered = text.to_lowercase();
        if TERMINAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            self.terminal_commands += 1;
        } else {
            self.file_edits += 1;
        }

        if !self.is_window_focused {
            self.actions_while_away += 1;
        }
    }

    pub fn track_blocked(&mut self) {
        self.blocked += 1;
        self.blocked_total += 1;
    }

    /// Hand over click/blocked counts and zero them
    pub fn collect_and_clear(&mut self) -> CollectedStats {
        let collected = CollectedStats {
            clicks: self.clicks,
            blocked: self.blocked,
        };
        self.clicks = 0;
        self.blocked = 0;
        collected
    }

    pub fn consume_away_actions(&mut self) -> u64 {
        std::mem::take(&mut self.actions_while_away)
    }

    /// Past clicks keep their classification
    pub fn set_focus_state(&mut self, focused: bool) {
        self.is_window_focused = focused;
    }

    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            total_actions: self.file_edits + self.terminal_commands,
            file_edits: self.file_edits,
            terminal_commands: self.terminal_commands,
            blocked: self.blocked_total,
            session_start_time: self.session_start_time,
            duration_secs: (now - self.session_start_time).num_seconds().max(0),
        }
    }
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod stats_test;
