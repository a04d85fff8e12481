use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::state_store::{StateStore, StateStoreExt};
use crate::types::{AgentConfig, IdeMode};

pub const KEY_ENABLED: &str = "enabled";
pub const KEY_POLL_FREQUENCY: &str = "pollFrequency";
pub const KEY_BANNED_COMMANDS: &str = "bannedCommands";

pub const DEFAULT_POLL_FREQUENCY_MS: u64 = 1000;
/// Anything faster hammers the page for no gain
pub const MIN_POLL_FREQUENCY_MS: u64 = 100;

pub const DEFAULT_BANNED_COMMANDS: &[&str] = &[
    "rm -rf /",
    "rm -rf ~",
    "rm -rf *",
    "format c:",
    "del /f /s /q",
    "rmdir /s /q",
    ":(){:|:&};:",
    "dd if=",
    "mkfs.",
    "> /dev/sda",
    "chmod -R 777 /",
];

pub fn default_banned_commands() -> Vec<String> {
    DEFAULT_BANNED_COMMANDS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub poll_frequency_ms: u64,
    pub banned_commands: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_frequency_ms: DEFAULT_POLL_FREQUENCY_MS,
            banned_commands: default_banned_commands(),
        }
    }
}

impl Settings {
    pub fn load(store: &dyn StateStore) -> Self {
        let defaults = Settings::default();
        Self {
            enabled: store.get(KEY_ENABLED, defaults.enabled),
            poll_frequency_ms: store
                .get(KEY_POLL_FREQUENCY, defaults.poll_frequency_ms)
                .max(MIN_POLL_FREQUENCY_MS),
            banned_commands: store.get(KEY_BANNED_COMMANDS, defaults.banned_commands),
        }
    }

    pub fn save(&self, store: &dyn StateStore) -> Result<()> {
        store.update(&mut |map| {
            map.insert(KEY_ENABLED.to_string(), serde_json::to_value(self.enabled)?);
            map.insert(
                KEY_POLL_FREQUENCY.to_string(),
                serde_json::to_value(self.poll_frequency_ms)?,
            );
            map.insert(
                KEY_BANNED_COMMANDS.to_string(),
                serde_json::to_value(&self.banned_commands)?,
            );
            Ok(())
        })
    }

    pub fn agent_config(&self, mode: IdeMode, background: bool) -> AgentConfig {
        AgentConfig {
            mode,
            is_background_mode: background,
            poll_interval_ms: self.poll_frequency_ms,
            banned_commands: self.banned_commands.clone(),
        }
    }

    /// Add a pattern; returns false if it was already present
    pub fn add_banned(&mut self, pattern: &str) -> bool {
        let pattern = pattern.trim();
        if pattern.is_empty() || self.banned_commands.iter().any(|p| p == pattern) {
            return false;
        }
        self.banned_commands.push(pattern.to_string());
        true
    }

    /// Remove a pattern; returns false if it was not present
    pub fn remove_banned(&mut self, pattern: &str) -> bool {
        let before = self.banned_commands.len();
        self.banned_commands.retain(|p| p != pattern.trim());
        self.banned_commands.len() != before
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod settings_test;
