//! # autoaccept
#![allow(clippy::uninlined_format_args)]
//!
//! Clicks confirmation controls ("Accept", "Run", "Apply", ...) inside an IDE that is
//! rendered as a set of Chromium pages, by driving those pages over the Chrome DevTools
//! Protocol. Shell-like commands are checked against a denylist before they are allowed
//! to run unattended.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Launch the IDE with a debugging port first
//! cursor --remote-debugging-port=9000
//!
//! # Drive it in the foreground
//! autoaccept --ide cursor run
//!
//! # Cycle through conversation tabs with an overlay
//! autoaccept --ide cursor --background run
//!
//! # Or in the background
//! autoaccept daemon start
//! autoaccept daemon status
//! autoaccept stats
//! autoaccept daemon stop
//!
//! # List what is reachable
//! autoaccept scan
//! autoaccept --port-range 9000-9010 scan | jq '.[].title'
//!
//! # Check a command against the denylist
//! autoaccept check "sudo rm -rf /tmp/x"
//!
//! # Manage the denylist
//! autoaccept banned list
//! autoaccept banned add "/^dd if=.*$/i"
//! autoaccept banned remove "format c:"
//! autoaccept banned reset
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use autoaccept::orchestrator::{Orchestrator, OrchestratorConfig};
//! use autoaccept::state_store::{JsonFileStore, StateStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store: Arc<dyn StateStore> = Arc::new(JsonFileStore::open(JsonFileStore::default_path()?)?);
//! let orchestrator = Orchestrator::new(OrchestratorConfig::default(), store)?;
//! let outcome = orchestrator.tick().await?;
//! println!("{:?}", outcome);
//! orchestrator.shutdown()?;
//! # Ok(())
//! # }
//! ```

/// Per-page automation: classification, page helper, agent loop and analytics
pub mod agent;

/// DevTools protocol discovery and command channel
pub mod cdp;

/// Live page connections and their agents
pub mod connection_manager;

/// Background orchestrator over a local socket
pub mod daemon;

/// Single-writer coordination between instances
pub mod instance_lock;

/// Periodic driver
pub mod orchestrator;

/// Weekly click/blocked roll-up
pub mod roi;

/// Durable user settings
pub mod settings;

/// Persisted key/value state shared between instances
pub mod state_store;

/// Shared type definitions
pub mod types;

pub use agent::{AgentHandle, is_banned};
pub use cdp::{CdpChannel, CdpError, TargetScanner};
pub use connection_manager::ConnectionManager;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use types::{AgentConfig, IdeMode, OutputFormat, PortRange, Target, TargetKind};
