use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::agent::{AgentHandle, AgentSnapshot, CdpPage, CollectedStats, SessionSummary, injector};
use crate::cdp::{CdpChannel, CdpError};
use crate::types::{AgentConfig, Target, TargetKind};

/// One live page: its channel and the agent driving it
pub struct PageConnection {
    pub target: Target,
    pub channel: Arc<CdpChannel>,
    pub agent: AgentHandle,
    injected: AtomicBool,
    pub connected_at: Instant,
}

impl PageConnection {
    fn new(target: Target, channel: CdpChannel) -> Self {
        let channel = Arc::new(channel);
        let page = Arc::new(CdpPage::new(channel.clone()));
        let label = format!("{}:{}", target.port, short_id(&target.id));
        Self {
            agent: AgentHandle::attach(page, label),
            target,
            channel,
            injected: AtomicBool::new(false),
            connected_at: Instant::now(),
        }
    }

    pub fn is_injected(&self) -> bool {
        self.injected.load(Ordering::Acquire)
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Outcome of one `sync`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub opened: usize,
    pub open_failures: usize,
    pub injected: usize,
    pub injection_failures: usize,
    pub pruned: usize,
    pub active: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub target_id: String,
    pub title: String,
    pub url: String,
    pub kind: TargetKind,
    pub port: u16,
    pub injected: bool,
    pub age_seconds: u64,
    pub agent: AgentSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub target_id: String,
    pub title: String,
    pub summary: SessionSummary,
}

/// Owns the set of live page connections, at most one per target id
pub struct ConnectionManager {
    connections: Arc<DashMap<String, Arc<PageConnection>>>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Bring the table in line with `targets`: drop closed connections, open
    /// missing ones, inject where needed and (re)configure every agent.
    pub async fn sync(&self, targets: &[Target], config: &AgentConfig) -> SyncReport {
        let mut report = SyncReport::default();

        let closed: Vec<String> = self
            .connections
            .iter()
            .filter(|entry| entry.channel.is_closed())
            .map(|entry| entry.key().clone())
            .collect();
        for id in closed {
            if let Some((_, conn)) = self.connections.remove(&id) {
                conn.agent.stop();
                report.pruned += 1;
            }
        }

        let missing: Vec<&Target> = targets
            .iter()
            .filter(|t| t.kind.has_dom())
            .filter(|t| !self.connections.contains_key(&t.id))
            .collect();
        let opened = join_all(missing.iter().map(|target| async move {
            (*target, CdpChannel::open(target).await)
        }))
        .await;

        for (target, result) in opened {
            match result {
                Ok(channel) => {
                    let conn = Arc::new(PageConnection::new(target.clone(), channel));
                    match self.connections.entry(target.id.clone()) {
                        // A concurrent sync won the race for this id
                        Entry::Occupied(_) => continue,
                        Entry::Vacant(slot) => {
                            slot.insert(conn.clone());
                        }
                    }
                    self.watch_close(&conn);
                    info!("Connected to '{}' ({})", target.title, target.id);
                    report.opened += 1;
                }
                Err(e) => {
                    debug!("Failed to open {}: {}", target.id, e);
                    report.open_failures += 1;
                }
            }
        }

        for conn in self.snapshot() {
            if !conn.is_injected() {
                match injector::inject(&conn.channel).await {
                    Ok(()) => {
                        conn.injected.store(true, Ordering::Release);
                        report.injected += 1;
                        debug!("Helper injected into {}", conn.target.id);
                    }
                    Err(e) => {
                        log_injection_failure(&conn.target, &e);
                        report.injection_failures += 1;
                        continue;
                    }
                }
            }

            conn.agent.update_banned_commands(&config.banned_commands);
            conn.agent.start(config);
        }

        report.active = self.connections.len();
        report
    }

    /// Drop the table entry once the socket goes away. Only the exact
    /// connection being watched is removed.
    fn watch_close(&self, conn: &Arc<PageConnection>) {
        let weak = Arc::downgrade(conn);
        let table = self.connections.clone();
        let mut closed = conn.channel.closed_signal();

        tokio::spawn(async move {
            let _ = closed.wait_for(|closed| *closed).await;
            if let Some(conn) = weak.upgrade() {
                conn.agent.stop();
                let removed = table
                    .remove_if(&conn.target.id, |_, existing| Arc::ptr_eq(existing, &conn))
                    .is_some();
                if removed {
                    debug!("Connection to {} closed", conn.target.id);
                }
            }
        });
    }

    fn snapshot(&self) -> Vec<Arc<PageConnection>> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Stop every agent and drop all connections
    pub fn disconnect_all(&self) -> usize {
        let all = self.snapshot();
        for conn in &all {
            conn.agent.stop();
        }
        self.connections.clear();
        if !all.is_empty() {
            info!("Disconnected {} page(s)", all.len());
        }
        all.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, target_id: &str) -> bool {
        self.connections.contains_key(target_id)
    }

    pub fn connections(&self) -> Vec<ConnectionInfo> {
        let mut list: Vec<ConnectionInfo> = self
            .snapshot()
            .into_iter()
            .map(|conn| ConnectionInfo {
                target_id: conn.target.id.clone(),
                title: conn.target.title.clone(),
                url: conn.target.url.clone(),
                kind: conn.target.kind,
                port: conn.target.port,
                injected: conn.is_injected(),
                age_seconds: conn.connected_at.elapsed().as_secs(),
                agent: conn.agent.snapshot(),
            })
            .collect();
        list.sort_by(|a, b| (a.port, &a.target_id).cmp(&(b.port, &b.target_id)));
        list
    }

    pub fn collect_and_clear_all(&self) -> CollectedStats {
        let mut total = CollectedStats::default();
        for conn in self.snapshot() {
            total += conn.agent.collect_and_clear();
        }
        total
    }

    pub fn consume_away_actions_all(&self) -> u64 {
        self.snapshot()
            .iter()
            .map(|conn| conn.agent.consume_away_actions())
            .sum()
    }

    pub fn set_focus_state_all(&self, focused: bool) {
        for conn in self.snapshot() {
            conn.agent.set_focus_state(focused);
        }
    }

    pub fn reset_stats_all(&self) {
        for conn in self.snapshot() {
            conn.agent.reset_stats();
        }
    }

    pub fn update_banned_commands_all(&self, patterns: &[String]) {
        for conn in self.snapshot() {
            conn.agent.update_banned_commands(patterns);
        }
    }

    pub fn session_summaries(&self) -> Vec<PageSummary> {
        self.snapshot()
            .into_iter()
            .map(|conn| PageSummary {
                target_id: conn.target.id.clone(),
                title: conn.target.title.clone(),
                summary: conn.agent.session_summary(),
            })
            .collect()
    }

    /// Probe every page for focus and push the result to all agents.
    /// `None` when no page answered.
    pub async fn refresh_focus(&self) -> Option<bool> {
        let conns = self.snapshot();
        let answers = join_all(conns.iter().map(|conn| conn.agent.probe_focus())).await;
        let answered: Vec<bool> = answers.into_iter().flatten().collect();
        if answered.is_empty() {
            return None;
        }
        let focused = answered.iter().any(|f| *f);
        self.set_focus_state_all(focused);
        Some(focused)
    }
}

fn log_injection_failure(target: &Target, error: &CdpError) {
    if error.is_transient() {
        debug!("Injection into {} failed: {}", target.id, error);
    } else {
        warn!("Injection into {} failed: {}", target.id, error);
    }
}

#[cfg(test)]
#[path = "connection_manager_test.rs"]
mod connection_manager_test;
