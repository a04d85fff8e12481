use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cdp::{ScannerConfig, TargetScanner};
use crate::connection_manager::{ConnectionInfo, ConnectionManager, PageSummary, SyncReport};
use crate::instance_lock::{InstanceLock, LockDecision};
use crate::roi::{self, WeeklyRoi};
use crate::settings::Settings;
use crate::state_store::StateStore;
use crate::types::IdeMode;

/// Well under the heartbeat staleness window
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub scanner: ScannerConfig,
    pub ide: IdeMode,
    pub background: bool,
    pub tick_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            ide: IdeMode::default(),
            background: false,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum TickOutcome {
    Disabled,
    #[serde(rename_all = "camelCase")]
    Standby {
        owner_id: String,
        heartbeat_age_secs: u64,
        targets: usize,
    },
    #[serde(rename_all = "camelCase")]
    Synced { targets: usize, report: SyncReport },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStatus {
    pub ide: IdeMode,
    pub background: bool,
    pub enabled: bool,
    pub owner_id: String,
    pub last_tick: Option<TickOutcome>,
    pub connections: Vec<ConnectionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub weekly_roi: WeeklyRoi,
    pub last_week_roi: Option<WeeklyRoi>,
    pub sessions: Vec<PageSummary>,
}

#[derive(Default)]
struct RunState {
    last_tick: Option<TickOutcome>,
    was_focused: bool,
    session_counted: bool,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn StateStore>,
    scanner: TargetScanner,
    manager: ConnectionManager,
    lock: InstanceLock,
    state: Mutex<RunState>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, store: Arc<dyn StateStore>) -> Result<Self> {
        let scanner = TargetScanner::new(config.scanner.clone())?;
        let lock = InstanceLock::new(store.clone(), config.ide);
        Ok(Self {
            config,
            store,
            scanner,
            manager: ConnectionManager::new(),
            lock,
            state: Mutex::new(RunState {
                was_focused: true,
                ..RunState::default()
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// One cycle: settings, discovery, lock, sync, analytics
    pub async fn tick(&self) -> Result<TickOutcome> {
        let now = Utc::now();
        let settings = Settings::load(self.store.as_ref());

        let outcome = if !settings.enabled {
            if self.manager.connection_count() > 0 {
                info!("Disabled, dropping all connections");
                self.flush_stats()?;
                self.manager.disconnect_all();
            }
            self.lock.release()?;
            TickOutcome::Disabled
        } else {
            let targets = self.scanner.discover().await;

            match self.lock.try_acquire(now)? {
                LockDecision::Standby { owner_id, age } => {
                    if self.manager.connection_count() > 0 {
                        info!("Another instance ({}) is active, standing by", owner_id);
                        self.flush_stats()?;
                        self.manager.disconnect_all();
                    }
                    TickOutcome::Standby {
                        owner_id,
                        heartbeat_age_secs: age.as_secs(),
                        targets: targets.len(),
                    }
                }
                LockDecision::Acquired => {
                    self.count_session()?;
                    let config = settings.agent_config(self.config.ide, self.config.background);
                    let report = self.manager.sync(&targets, &config).await;
                    if report.opened > 0 || report.pruned > 0 {
                        info!(
                            "Sync: {} opened, {} pruned, {} active",
                            report.opened, report.pruned, report.active
                        );
                    }
                    self.refresh_focus().await;
                    self.flush_stats()?;
                    TickOutcome::Synced {
                        targets: targets.len(),
                        report,
                    }
                }
            }
        };

        self.state().last_tick = Some(outcome.clone());
        Ok(outcome)
    }

    fn count_session(&self) -> Result<()> {
        if self.state().session_counted {
            return Ok(());
        }
        let roi = roi::record_session(self.store.as_ref(), Utc::now())?;
        self.state().session_counted = true;
        debug!("Session {} of this week", roi.sessions_this_week);
        Ok(())
    }

    /// Move agent counters into the weekly roll-up
    fn flush_stats(&self) -> Result<()> {
        let collected = self.manager.collect_and_clear_all();
        roi::record(self.store.as_ref(), collected, Utc::now())?;
        Ok(())
    }

    async fn refresh_focus(&self) {
        let Some(focused) = self.manager.refresh_focus().await else {
            return;
        };
        let was_focused = std::mem::replace(&mut self.state().was_focused, focused);
        if focused && !was_focused {
            let away = self.manager.consume_away_actions_all();
            if away > 0 {
                info!("{} action(s) handled while the window was in the background", away);
            }
        }
    }

    /// Tick until `shutdown` flips to true or its sender goes away
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "Orchestrator started: ide={} background={} ports={:?} tick={}ms",
            self.config.ide,
            self.config.background,
            self.scanner.ports(),
            self.config.tick_interval.as_millis()
        );

        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(outcome) => debug!("Tick: {:?}", outcome),
                        Err(e) => warn!("Tick failed: {:#}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.shutdown()
    }

    /// Flush counters, stop every agent and give up the lock
    pub fn shutdown(&self) -> Result<()> {
        self.flush_stats()?;
        let dropped = self.manager.disconnect_all();
        self.lock.release()?;
        info!("Orchestrator stopped ({} connection(s) closed)", dropped);
        Ok(())
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut settings = Settings::load(self.store.as_ref());
        settings.enabled = enabled;
        settings.save(self.store.as_ref())?;
        if !enabled {
            self.flush_stats()?;
            self.manager.disconnect_all();
        }
        info!("{}", if enabled { "Enabled" } else { "Disabled" });
        Ok(())
    }

    pub fn update_banned_commands(&self, patterns: Vec<String>) -> Result<()> {
        let mut settings = Settings::load(self.store.as_ref());
        settings.banned_commands = patterns;
        settings.save(self.store.as_ref())?;
        self.manager
            .update_banned_commands_all(&settings.banned_commands);
        Ok(())
    }

    pub fn reset_stats(&self) {
        self.manager.reset_stats_all();
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            ide: self.config.ide,
            background: self.config.background,
            enabled: Settings::load(self.store.as_ref()).enabled,
            owner_id: self.lock.owner_id().to_string(),
            last_tick: self.state().last_tick.clone(),
            connections: self.manager.connections(),
        }
    }

    pub fn stats(&self) -> StatsReport {
        let now = Utc::now();
        StatsReport {
            weekly_roi: roi::current(self.store.as_ref(), now),
            last_week_roi: roi::last_week(self.store.as_ref()),
            sessions: self.manager.session_summaries(),
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod orchestrator_test;
