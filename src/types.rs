use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// IDE flavor the agent is driving
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IdeMode {
    /// Plain polling over generic button selectors
    #[default]
    Simple,
    /// Cursor-like layout with composer tabs
    Cursor,
    /// Antigravity-like layout with agent conversation tabs
    Antigravity,
}

impl fmt::Display for IdeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdeMode::Simple => write!(f, "simple"),
            IdeMode::Cursor => write!(f, "cursor"),
            IdeMode::Antigravity => write!(f, "antigravity"),
        }
    }
}

impl std::str::FromStr for IdeMode {
    type Err = anyhow::Error;

    /// Parse an IDE flavor (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(IdeMode::Simple),
            "cursor" => Ok(IdeMode::Cursor),
            "antigravity" => Ok(IdeMode::Antigravity),
            _ => anyhow::bail!("Unsupported IDE mode: {}", s),
        }
    }
}

/// Output format for CLI results
#[derive(Clone, Copy, Debug, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format for programmatic consumption
    Json,
    /// Human-readable simple format
    Simple,
}

/// Kind of a debuggable target, as reported by the discovery endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Page,
    Iframe,
    Worker,
    Other,
}

impl TargetKind {
    /// Map the `type` field of a target descriptor
    pub fn from_descriptor(kind: &str) -> Self {
        match kind {
            "page" => TargetKind::Page,
            "iframe" => TargetKind::Iframe,
            "worker" | "service_worker" | "shared_worker" => TargetKind::Worker,
            _ => TargetKind::Other,
        }
    }

    /// Sort priority: pages first, workers last
    pub fn priority(&self) -> u8 {
        match self {
            TargetKind::Page => 0,
            TargetKind::Iframe => 1,
            TargetKind::Other => 2,
            TargetKind::Worker => 3,
        }
    }

    /// Whether the target hosts a DOM worth driving
    pub fn has_dom(&self) -> bool {
        !matches!(self, TargetKind::Worker)
    }
}

/// A remotely debuggable page, frame or worker
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub url: String,
    pub title: String,
    pub kind: TargetKind,
    /// WebSocket debugger URL
    pub socket_address: String,
    /// Port the target was discovered on
    pub port: u16,
}

/// Configuration pushed to an agent on every sync
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub mode: IdeMode,
    pub is_background_mode: bool,
    pub poll_interval_ms: u64,
    pub banned_commands: Vec<String>,
}

/// Inclusive port range parsed from "START-END" or a single port
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// Parse "9000-9003" or "9222"
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        let (start, end) = match parts.as_slice() {
            [single] => (*single, *single),
            [start, end] => (*start, *end),
            _ => anyhow::bail!("Invalid port range. Use START-END (e.g., 9000-9003)"),
        };

        let start = start
            .trim()
            .parse::<u16>()
            .map_err(|_| anyhow::anyhow!("Invalid start port in range"))?;
        let end = end
            .trim()
            .parse::<u16>()
            .map_err(|_| anyhow::anyhow!("Invalid end port in range"))?;

        if start > end {
            anyhow::bail!("Port range start {} is after end {}", start, end);
        }

        Ok(PortRange { start, end })
    }

    pub fn ports(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
