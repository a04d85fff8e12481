use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use super::classify::{self, ClickCooldown, Decision};
use super::filter::{self, BannedPattern};
use super::page::{ConversationStatus, Overlay, PageDriver, TabStatus};
use super::stats::{CollectedStats, SessionStats, SessionSummary};
use super::strategy::{self, ConversationStrategy};
use crate::types::{AgentConfig, IdeMode};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Pause between two multi-conversation cycles
pub const CONVERSATION_CYCLE_DELAY: Duration = Duration::from_secs(3);

/// How long a clicked control gets to disappear
pub const DISAPPEAR_TIMEOUT: Duration = Duration::from_millis(500);
const DISAPPEAR_POLL: Duration = Duration::from_millis(50);

/// Mutable state of one agent, shared by its handle and loop task
#[derive(Debug)]
pub struct SessionContext {
    pub is_running: bool,
    pub session_generation: u64,
    pub mode: IdeMode,
    pub background_mode: bool,
    pub poll_interval: Duration,
    pub banned_commands: Vec<String>,
    pub banned_patterns: Vec<BannedPattern>,
    pub tab_names: Vec<String>,
    pub completion_status: HashMap<String, ConversationStatus>,
    pub stats: SessionStats,
    pub cooldown: ClickCooldown,
}

impl Default for SessionContext {
    fn default() -> Self {
        let mut ctx = Self {
            is_running: false,
            session_generation: 0,
            mode: IdeMode::default(),
            background_mode: false,
            poll_interval: Duration::ZERO,
            banned_commands: Vec::new(),
            banned_patterns: Vec::new(),
            tab_names: Vec::new(),
            completion_status: HashMap::new(),
            stats: SessionStats::default(),
            cooldown: ClickCooldown::default(),
        };
        ctx.ensure_defaults();
        ctx
    }
}

impl SessionContext {
    /// Repair fields that would stall or confuse a loop. Idempotent.
    pub fn ensure_defaults(&mut self) {
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.banned_patterns.is_empty() && !self.banned_commands.is_empty() {
            self.banned_patterns = filter::compile_all(&self.banned_commands);
        }
        // Statuses follow the current tab list
        let names = &self.tab_names;
        self.completion_status.retain(|name, _| names.contains(name));
        for name in &self.tab_names {
            self.completion_status
                .entry(name.clone())
                .or_insert(ConversationStatus::Working);
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_running && self.session_generation == generation
    }

    fn overlay(&self, active: usize) -> Overlay {
        Overlay {
            tabs: self
                .tab_names
                .iter()
                .map(|name| TabStatus {
                    name: name.clone(),
                    status: self
                        .completion_status
                        .get(name)
                        .copied()
                        .unwrap_or(ConversationStatus::Working),
                })
                .collect(),
            active,
        }
    }
}

/// Point-in-time view of an agent for status output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSnapshot {
    pub is_running: bool,
    pub session_generation: u64,
    pub mode: IdeMode,
    pub background_mode: bool,
    pub poll_interval_ms: u64,
    pub tabs: Vec<TabStatus>,
}

/// Control surface for one page's agent. Cheap to clone; all entry points
/// are synchronous and valid before the first `start`.
#[derive(Clone)]
pub struct AgentHandle {
    label: Arc<str>,
    page: Arc<dyn PageDriver>,
    ctx: Arc<Mutex<SessionContext>>,
}

impl AgentHandle {
    pub fn attach(page: Arc<dyn PageDriver>, label: impl Into<String>) -> Self {
        let label: String = label.into();
        Self {
            label: Arc::from(label.as_str()),
            page,
            ctx: Arc::new(Mutex::new(SessionContext::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.ctx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start (or restart) the loop. Returns true when a new generation was
    /// spawned; identical mode and background settings leave a running loop
    /// alone. Must be called inside a tokio runtime.
    pub fn start(&self, config: &AgentConfig) -> bool {
        let Some(generation) = self.begin(config) else {
            return false;
        };

        info!(
            "Agent {} started: mode={} background={} generation={}",
            self.label, config.mode, config.is_background_mode, generation
        );

        let handle = self.clone();
        tokio::spawn(async move { handle.run(generation).await });
        true
    }

    /// Apply `config` and open a new generation if mode or background changed
    fn begin(&self, config: &AgentConfig) -> Option<u64> {
        let mut ctx = self.lock();
        ctx.poll_interval = Duration::from_millis(config.poll_interval_ms);
        ctx.ensure_defaults();

        if ctx.is_running
            && ctx.mode == config.mode
            && ctx.background_mode == config.is_background_mode
        {
            return None;
        }

        ctx.is_running = true;
        ctx.session_generation += 1;
        ctx.mode = config.mode;
        ctx.background_mode = config.is_background_mode;
        Some(ctx.session_generation)
    }

    /// Stop the loop at its next boundary. The overlay is removed by the
    /// exiting loop.
    pub fn stop(&self) {
        let mut ctx = self.lock();
        if ctx.is_running {
            info!(
                "Agent {} stopping (generation {})",
                self.label, ctx.session_generation
            );
        }
        ctx.is_running = false;
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running
    }

    pub fn generation(&self) -> u64 {
        self.lock().session_generation
    }

    pub fn get_stats(&self) -> SessionStats {
        self.lock().stats.clone()
    }

    /// Zero every counter and restart the session clock
    pub fn reset_stats(&self) {
        let mut ctx = self.lock();
        let focused = ctx.stats.is_window_focused;
        ctx.stats = SessionStats::default();
        ctx.stats.set_focus_state(focused);
    }

    pub fn session_summary(&self) -> SessionSummary {
        self.lock().stats.summary(chrono::Utc::now())
    }

    pub fn consume_away_actions(&self) -> u64 {
        self.lock().stats.consume_away_actions()
    }

    pub fn set_focus_state(&self, focused: bool) {
        self.lock().stats.set_focus_state(focused);
    }

    pub fn update_banned_commands(&self, patterns: &[String]) {
        let mut ctx = self.lock();
        if ctx.banned_commands.as_slice() == patterns {
            return;
        }
        ctx.banned_commands = patterns.to_vec();
        ctx.banned_patterns = filter::compile_all(patterns);
        debug!(
            "Agent {} banned list updated ({} patterns)",
            self.label,
            ctx.banned_patterns.len()
        );
    }

    pub fn collect_and_clear(&self) -> CollectedStats {
        self.lock().stats.collect_and_clear()
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        let ctx = self.lock();
        AgentSnapshot {
            is_running: ctx.is_running,
            session_generation: ctx.session_generation,
            mode: ctx.mode,
            background_mode: ctx.background_mode,
            poll_interval_ms: ctx.poll_interval.as_millis() as u64,
            tabs: ctx.overlay(0).tabs,
        }
    }

    /// Ask the page whether it has focus; `None` when the page did not answer
    pub async fn probe_focus(&self) -> Option<bool> {
        match self.page.has_focus().await {
            Ok(focused) => Some(focused),
            Err(e) => {
                debug!("Focus probe on {} failed: {}", self.label, e);
                None
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().is_current(generation)
    }

    async fn run(self, generation: u64) {
        let (mode, background) = {
            let ctx = self.lock();
            (ctx.mode, ctx.background_mode)
        };
        let strategy = strategy::strategy_for(mode);
        let cycles = strategy::cycles_conversations(mode, background);
        let mut cycle: usize = 0;

        while self.is_current(generation) {
            if cycles {
                self.conversation_cycle(generation, strategy, cycle).await;
                cycle = cycle.wrapping_add(1);
                tokio::time::sleep(CONVERSATION_CYCLE_DELAY).await;
            } else {
                self.click_pass(generation, strategy.control_selectors())
                    .await;
                let pause = self.lock().poll_interval;
                tokio::time::sleep(pause).await;
            }
        }

        debug!("Agent {} loop for generation {} exited", self.label, generation);

        if !self.is_running()
            && let Err(e) = self.page.remove_overlay().await
        {
            debug!("Overlay removal on {} failed: {}", self.label, e);
        }
    }

    /// Scan once and click every actionable control. Returns the number of
    /// clicks made.
    pub async fn click_pass(&self, generation: u64, selectors: &[&str]) -> usize {
        let candidates = match self.page.scan_candidates(selectors).await {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!("Scan on {} failed: {}", self.label, e);
                return 0;
            }
        };

        let banned = self.lock().banned_patterns.clone();
        let mut clicks = 0;

        for candidate in candidates {
            if !self.is_current(generation) {
                break;
            }

            match classify::is_actionable(&candidate, &banned) {
                Decision::Click { text } => {
                    if self.lock().cooldown.is_cooling(&candidate.id, Instant::now()) {
                        continue;
                    }
                    match self.page.click(&candidate.id).await {
                        Ok(true) => {}
                        Ok(false) => continue,
                        Err(e) => {
                            debug!("Click on {} failed: {}", self.label, e);
                            continue;
                        }
                    }
                    // Only a landed click starts the cooldown
                    self.lock().cooldown.try_acquire(&candidate.id, Instant::now());
                    self.wait_for_disappearance(&candidate.id).await;
                    self.lock().stats.track_click(&text);
                    clicks += 1;
                    info!("Agent {} clicked '{}'", self.label, text);
                }
                Decision::Blocked { text, pattern } => {
                    // Cooldown keeps one banned control from being counted every pass
                    if !self.lock().cooldown.try_acquire(&candidate.id, Instant::now()) {
                        continue;
                    }
                    self.lock().stats.track_blocked();
                    warn!(
                        "Agent {} blocked '{}': command matched banned pattern {:?}",
                        self.label, text, pattern
                    );
                }
                Decision::Skip(reason) => {
                    trace!("Skipping {} ({:?})", candidate.id, reason);
                }
            }
        }

        clicks
    }

    /// Give the clicked control a moment to go away. The click counts either way.
    async fn wait_for_disappearance(&self, id: &str) {
        let started = Instant::now();
        loop {
            match self.page.is_visible(id).await {
                Ok(false) | Err(_) => return,
                Ok(true) => {}
            }
            if started.elapsed() >= DISAPPEAR_TIMEOUT {
                trace!("{} still visible after click", id);
                return;
            }
            tokio::time::sleep(DISAPPEAR_POLL).await;
        }
    }

    /// One multi-conversation step: click, pick the next tab, record its
    /// status and redraw the overlay.
    pub async fn conversation_cycle(
        &self,
        generation: u64,
        strategy: &dyn ConversationStrategy,
        cycle: usize,
    ) {
        self.click_pass(generation, strategy.control_selectors())
            .await;
        if !self.is_current(generation) {
            return;
        }

        let labels = match self.page.list_tabs(strategy.tab_selector()).await {
            Ok(labels) => labels,
            Err(e) => {
                debug!("Tab listing on {} failed: {}", self.label, e);
                return;
            }
        };
        if labels.is_empty() {
            return;
        }

        let names = strategy::dedupe_labels(&labels);
        let index = cycle % names.len();

        if let Err(e) = self.page.focus_tab(strategy.tab_selector(), index).await {
            debug!("Focusing tab {} on {} failed: {}", index, self.label, e);
        }

        let done = match self.page.is_complete(&strategy.completion_rule()).await {
            Ok(done) => done,
            Err(e) => {
                debug!("Completion check on {} failed: {}", self.label, e);
                false
            }
        };

        let overlay = {
            let mut ctx = self.lock();
            if !ctx.is_current(generation) {
                return;
            }
            ctx.tab_names = names;
            let name = ctx.tab_names[index].clone();
            let status = if done {
                ConversationStatus::Done
            } else {
                ConversationStatus::Working
            };
            ctx.completion_status.insert(name, status);
            ctx.ensure_defaults();
            ctx.overlay(index)
        };

        if let Err(e) = self.page.render_overlay(&overlay).await {
            debug!("Overlay render on {} failed: {}", self.label, e);
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
