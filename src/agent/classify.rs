use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::filter::{self, BannedPattern};

/// Labels longer than this are text blocks, not buttons
pub const MAX_LABEL_LEN: usize = 50;

/// Minimum gap between two clicks on the same element
pub const CLICK_COOLDOWN: Duration = Duration::from_millis(5000);

/// Ancestor levels walked when collecting code text near a control
pub const NEARBY_MAX_ANCESTOR_DEPTH: usize = 10;
/// Preceding siblings inspected per ancestor level
pub const NEARBY_MAX_SIBLINGS: usize = 5;
/// Stop walking up once this much code text is gathered
pub const NEARBY_MIN_TEXT_LEN: usize = 10;

/// Rejection wins over acceptance
pub const REJECT_KEYWORDS: &[&str] = &[
    "skip", "reject", "cancel", "close", "refine", "deny", "dismiss", "undo", "discard",
    "stop",
];

pub const ACCEPT_KEYWORDS: &[&str] = &[
    "accept",
    "run",
    "retry",
    "apply",
    "execute",
    "confirm",
    "allow",
    "continue",
    "resume",
];

/// Words suggesting the click executes a command
const COMMAND_KEYWORDS: &[&str] = &["run", "execute"];

lazy_static! {
    /// Trailing shortcut hints such as "Ctrl+Enter", "⌘⏎" or "Alt + Y"
    static ref SHORTCUT_HINT: Regex =
        Regex::new(r"(?i)\s*(?:\b(?:ctrl|cmd|alt|shift|meta)\b|[⌘⌥⇧⌃])\s*(?:\+\s*)?\S+\s*$")
            .expect("shortcut hint pattern");
    static ref ZERO_WIDTH: Regex =
        Regex::new("[\u{200B}\u{200C}\u{200D}\u{2060}\u{FEFF}]").expect("zero-width pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("whitespace pattern");
}

/// A control as reported by one DOM scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Stable id stamped on the element by the page helper
    pub id: String,
    pub text: String,
    pub aria_label: Option<String>,
    pub title: Option<String>,
    pub visible: bool,
    pub interactable: bool,
    pub disabled: bool,
    /// Code text found around the control; only gathered for command-like labels
    pub nearby_text: Option<String>,
}

impl Candidate {
    /// Text the denylist is checked against
    pub fn command_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(nearby) = self.nearby_text.as_deref() {
            parts.push(nearby);
        }
        if let Some(label) = self.aria_label.as_deref() {
            parts.push(label);
        }
        if let Some(title) = self.title.as_deref() {
            parts.push(title);
        }
        parts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    TooLong,
    RejectKeyword,
    NoAcceptKeyword,
    Hidden,
    NotInteractable,
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Click it; carries the normalized label
    Click { text: String },
    /// A denylist entry vetoed a command-running control
    Blocked { text: String, pattern: String },
    Skip(SkipReason),
}

/// Strip shortcut hints and zero-width characters, collapse whitespace, lowercase
pub fn normalize_text(raw: &str) -> String {
    let without_zero_width = ZERO_WIDTH.replace_all(raw, "");
    let collapsed = WHITESPACE.replace_all(without_zero_width.trim(), " ");
    let mut text = collapsed.to_string();
    // Hints can stack, e.g. "Run Ctrl+Enter Alt+R"
    loop {
        let stripped = SHORTCUT_HINT.replace(&text, "").to_string();
        if stripped == text || stripped.trim().is_empty() {
            break;
        }
        text = stripped;
    }
    text.trim().to_lowercase()
}

pub fn suggests_command(normalized: &str) -> bool {
    COMMAND_KEYWORDS.iter().any(|k| normalized.contains(k))
}

/// Full decision for one candidate, in order: label shape, keywords,
/// denylist for command-running controls, then visibility and state.
pub fn is_actionable(candidate: &Candidate, banned: &[BannedPattern]) -> Decision {
    let text = normalize_text(&candidate.text);

    if text.is_empty() {
        return Decision::Skip(SkipReason::Empty);
    }
    if text.chars().count() > MAX_LABEL_LEN {
        return Decision::Skip(SkipReason::TooLong);
    }
    if REJECT_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Decision::Skip(SkipReason::RejectKeyword);
    }
    if !ACCEPT_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Decision::Skip(SkipReason::NoAcceptKeyword);
    }

    if suggests_command(&text) {
        let command = candidate.command_text();
        if let Some(pattern) = filter::first_match(&command, banned) {
            return Decision::Blocked {
                text,
                pattern: pattern.source().to_string(),
            };
        }
    }

    if !candidate.visible {
        return Decision::Skip(SkipReason::Hidden);
    }
    if !candidate.interactable {
        return Decision::Skip(SkipReason::NotInteractable);
    }
    if candidate.disabled {
        return Decision::Skip(SkipReason::Disabled);
    }

    Decision::Click { text }
}

/// Per-element click throttle
#[derive(Debug, Clone)]
pub struct ClickCooldown {
    window: Duration,
    last: HashMap<String, Instant>,
}

impl Default for ClickCooldown {
    fn default() -> Self {
        Self::new(CLICK_COOLDOWN)
    }
}

impl ClickCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: HashMap::new(),
        }
    }

    pub fn is_cooling(&self, id: &str, now: Instant) -> bool {
        self.last
            .get(id)
            .is_some_and(|at| now.saturating_duration_since(*at) < self.window)
    }

    /// Record an action on `id` unless it is still cooling. Returns whether
    /// the action may proceed.
    pub fn try_acquire(&mut self, id: &str, now: Instant) -> bool {
        if self.is_cooling(id, now) {
            return false;
        }
        self.last.insert(id.to_string(), now);
        // Expired entries are dead weight once the element re-renders
        let window = self.window;
        self.last
            .retain(|_, at| now.saturating_duration_since(*at) < window);
        true
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod classify_test;
