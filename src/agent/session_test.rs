#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::agent::classify::Candidate;
    use crate::agent::strategy::{CompletionRule, CursorStrategy};
    use crate::cdp::CdpError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct FakeState {
        candidates: Vec<Candidate>,
        clicked: Vec<String>,
        scans: usize,
        scanned_selectors: Vec<Vec<String>>,
        stays_visible: bool,
        refuse_clicks: bool,
        tabs: Vec<String>,
        focused_tab: Option<usize>,
        complete: bool,
        overlays: Vec<Overlay>,
        overlay_removals: usize,
        focused: bool,
    }

    #[derive(Default)]
    struct FakePage {
        state: Mutex<FakeState>,
    }

    impl FakePage {
        fn with_candidates(candidates: Vec<Candidate>) -> Arc<Self> {
            let page = FakePage::default();
            page.state.lock().unwrap().candidates = candidates;
            Arc::new(page)
        }

        fn state(&self) -> MutexGuard<'_, FakeState> {
            self.state.lock().unwrap()
        }
    }

    #[async_trait]
    impl PageDriver for FakePage {
        async fn scan_candidates(&self, selectors: &[&str]) -> Result<Vec<Candidate>, CdpError> {
            let mut state = self.state();
            state.scans += 1;
            state
                .scanned_selectors
                .push(selectors.iter().map(|s| s.to_string()).collect());
            Ok(state.candidates.clone())
        }

        async fn click(&self, id: &str) -> Result<bool, CdpError> {
            let mut state = self.state();
            if state.refuse_clicks {
                return Ok(false);
            }
            state.clicked.push(id.to_string());
            Ok(true)
        }

        async fn is_visible(&self, _id: &str) -> Result<bool, CdpError> {
            Ok(self.state().stays_visible)
        }

        async fn list_tabs(&self, _selector: &str) -> Result<Vec<String>, CdpError> {
            Ok(self.state().tabs.clone())
        }

        async fn focus_tab(&self, _selector: &str, index: usize) -> Result<bool, CdpError> {
            self.state().focused_tab = Some(index);
            Ok(true)
        }

        async fn is_complete(&self, _rule: &CompletionRule) -> Result<bool, CdpError> {
            Ok(self.state().complete)
        }

        async fn render_overlay(&self, overlay: &Overlay) -> Result<(), CdpError> {
            self.state().overlays.push(overlay.clone());
            Ok(())
        }

        async fn remove_overlay(&self) -> Result<(), CdpError> {
            self.state().overlay_removals += 1;
            Ok(())
        }

        async fn has_focus(&self) -> Result<bool, CdpError> {
            Ok(self.state().focused)
        }
    }

    fn control(id: &str, text: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            text: text.to_string(),
            visible: true,
            interactable: true,
            ..Default::default()
        }
    }

    fn config(mode: IdeMode, background: bool, poll_ms: u64) -> AgentConfig {
        AgentConfig {
            mode,
            is_background_mode: background,
            poll_interval_ms: poll_ms,
            banned_commands: Vec::new(),
        }
    }

    #[test]
    fn test_identical_start_keeps_generation() {
        let handle = AgentHandle::attach(Arc::new(FakePage::default()), "page-1");
        let cfg = config(IdeMode::Simple, false, 1000);

        assert_eq!(handle.begin(&cfg), Some(1));
        assert_eq!(handle.begin(&cfg), None);
        assert_eq!(handle.generation(), 1);
    }

    #[test]
    fn test_changed_start_advances_generation() {
        let handle = AgentHandle::attach(Arc::new(FakePage::default()), "page-1");

        assert_eq!(handle.begin(&config(IdeMode::Cursor, false, 1000)), Some(1));
        assert_eq!(handle.begin(&config(IdeMode::Cursor, true, 1000)), Some(2));
        assert_eq!(
            handle.begin(&config(IdeMode::Antigravity, true, 1000)),
            Some(3)
        );

        // A stopped agent restarts under a fresh generation
        handle.stop();
        assert_eq!(
            handle.begin(&config(IdeMode::Antigravity, true, 1000)),
            Some(4)
        );
    }

    #[test]
    fn test_identical_start_still_applies_poll_interval() {
        let handle = AgentHandle::attach(Arc::new(FakePage::default()), "page-1");
        handle.begin(&config(IdeMode::Simple, false, 1000));
        handle.begin(&config(IdeMode::Simple, false, 250));
        assert_eq!(handle.snapshot().poll_interval_ms, 250);
    }

    #[tokio::test]
    async fn test_click_pass_clicks_and_blocks() {
        let mut run = control("r1", "Run");
        run.nearby_text = Some("rm -rf / --no-preserve-root".to_string());
        let page = FakePage::with_candidates(vec![
            control("a1", "Accept"),
            control("c1", "Cancel"),
            run,
        ]);
        let handle = AgentHandle::attach(page.clone(), "page-1");
        handle.update_banned_commands(&["rm -rf /".to_string()]);
        let generation = handle.begin(&config(IdeMode::Simple, false, 1000)).unwrap();

        let clicks = handle
            .click_pass(generation, strategy::SIMPLE_CONTROL_SELECTORS)
            .await;

        assert_eq!(clicks, 1);
        assert_eq!(page.state().clicked, vec!["a1".to_string()]);
        let stats = handle.get_stats();
        assert_eq!(stats.clicks, 1);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.file_edits, 1);
    }

    #[tokio::test]
    async fn test_cooldown_holds_across_passes() {
        let mut run = control("r1", "Run");
        run.nearby_text = Some("rm -rf /".to_string());
        let page = FakePage::with_candidates(vec![control("a1", "Accept"), run]);
        let handle = AgentHandle::attach(page.clone(), "page-1");
        handle.update_banned_commands(&["rm -rf /".to_string()]);
        let generation = handle.begin(&config(IdeMode::Simple, false, 1000)).unwrap();

        handle
            .click_pass(generation, strategy::SIMPLE_CONTROL_SELECTORS)
            .await;
        let second = handle
            .click_pass(generation, strategy::SIMPLE_CONTROL_SELECTORS)
            .await;

        assert_eq!(second, 0);
        assert_eq!(page.state().clicked.len(), 1);
        assert_eq!(handle.get_stats().blocked, 1);
    }

    #[tokio::test]
    async fn test_control_that_stays_visible_is_still_counted() {
        let page = FakePage::with_candidates(vec![control("a1", "Accept")]);
        page.state().stays_visible = true;
        let handle = AgentHandle::attach(page.clone(), "page-1");
        let generation = handle.begin(&config(IdeMode::Simple, false, 1000)).unwrap();

        let started = Instant::now();
        let clicks = handle
            .click_pass(generation, strategy::SIMPLE_CONTROL_SELECTORS)
            .await;
        let elapsed = started.elapsed();

        assert_eq!(clicks, 1);
        assert_eq!(handle.get_stats().clicks, 1);
        assert!(elapsed >= DISAPPEAR_TIMEOUT, "returned after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(1), "waited {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_refused_click_does_not_start_cooldown() {
        let page = FakePage::with_candidates(vec![control("a1", "Accept")]);
        page.state().refuse_clicks = true;
        let handle = AgentHandle::attach(page.clone(), "page-1");
        let generation = handle.begin(&config(IdeMode::Simple, false, 1000)).unwrap();

        let first = handle
            .click_pass(generation, strategy::SIMPLE_CONTROL_SELECTORS)
            .await;
        assert_eq!(first, 0);
        assert_eq!(handle.get_stats().clicks, 0);

        page.state().refuse_clicks = false;
        let second = handle
            .click_pass(generation, strategy::SIMPLE_CONTROL_SELECTORS)
            .await;
        assert_eq!(second, 1);
        assert_eq!(page.state().clicked, vec!["a1".to_string()]);
    }

    async fn selectors_scanned_by(mode: IdeMode) -> Vec<String> {
        let page = FakePage::with_candidates(Vec::new());
        let handle = AgentHandle::attach(page.clone(), "page-1");
        handle.start(&config(mode, false, 10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();

        let state = page.state();
        state
            .scanned_selectors
            .first()
            .cloned()
            .expect("loop should have scanned")
    }

    #[tokio::test]
    async fn test_foreground_loop_scans_mode_selectors() {
        let simple = selectors_scanned_by(IdeMode::Simple).await;
        let expected: Vec<String> = strategy::SIMPLE_CONTROL_SELECTORS
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(simple, expected);

        let cursor = selectors_scanned_by(IdeMode::Cursor).await;
        assert!(cursor.contains(&"[class*='anysphere']".to_string()));

        let antigravity = selectors_scanned_by(IdeMode::Antigravity).await;
        assert!(antigravity.contains(&".bg-ide-button-background".to_string()));
    }

    #[tokio::test]
    async fn test_retired_generation_does_not_click() {
        let page = FakePage::with_candidates(vec![control("a1", "Accept")]);
        let handle = AgentHandle::attach(page.clone(), "page-1");
        let old = handle.begin(&config(IdeMode::Simple, false, 1000)).unwrap();
        handle.begin(&config(IdeMode::Cursor, false, 1000)).unwrap();

        let clicks = handle
            .click_pass(old, strategy::SIMPLE_CONTROL_SELECTORS)
            .await;

        assert_eq!(clicks, 0);
        assert!(page.state().clicked.is_empty());
    }

    #[tokio::test]
    async fn test_conversation_cycle_tracks_tabs() {
        let page = Arc::new(FakePage::default());
        {
            let mut state = page.state();
            state.tabs = vec!["Chat".into(), "Chat".into(), "Fix tests".into()];
            state.complete = true;
        }
        let handle = AgentHandle::attach(page.clone(), "page-1");
        let generation = handle.begin(&config(IdeMode::Cursor, true, 1000)).unwrap();

        handle
            .conversation_cycle(generation, &CursorStrategy, 4)
            .await;

        let state = page.state();
        assert_eq!(state.focused_tab, Some(1));
        assert_eq!(
            state.overlays.last().cloned(),
            Some(Overlay {
                tabs: vec![
                    TabStatus {
                        name: "Chat".into(),
                        status: ConversationStatus::Working
                    },
                    TabStatus {
                        name: "Chat (2)".into(),
                        status: ConversationStatus::Done
                    },
                    TabStatus {
                        name: "Fix tests".into(),
                        status: ConversationStatus::Working
                    },
                ],
                active: 1,
            })
        );
    }

    #[tokio::test]
    async fn test_stop_ends_loop_and_removes_overlay() {
        let page = FakePage::with_candidates(Vec::new());
        let handle = AgentHandle::attach(page.clone(), "page-1");
        assert!(handle.start(&config(IdeMode::Simple, false, 10)));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(page.state().scans > 0);

        handle.stop();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let scans = page.state().scans;
        assert_eq!(page.state().overlay_removals, 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(page.state().scans, scans);
    }

    #[tokio::test]
    async fn test_restart_retires_previous_loop() {
        let page = FakePage::with_candidates(Vec::new());
        let handle = AgentHandle::attach(page.clone(), "page-1");
        assert!(handle.start(&config(IdeMode::Simple, false, 10)));
        assert!(handle.start(&config(IdeMode::Cursor, false, 10)));
        assert!(!handle.start(&config(IdeMode::Cursor, false, 10)));
        assert_eq!(handle.generation(), 2);

        // Let the retired loop notice while the agent is still running
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(page.state().overlay_removals, 1);
    }

    #[test]
    fn test_reset_stats_keeps_focus_state() {
        let handle = AgentHandle::attach(Arc::new(FakePage::default()), "page-1");
        handle.set_focus_state(false);
        handle.lock().stats.track_click("accept");

        handle.reset_stats();
        let stats = handle.get_stats();
        assert_eq!(stats.clicks, 0);
        assert_eq!(stats.file_edits, 0);
        assert!(!stats.is_window_focused);
    }

    #[test]
    fn test_summary_counts_actions() {
        let handle = AgentHandle::attach(Arc::new(FakePage::default()), "page-1");
        handle.lock().stats.track_click("run command");
        handle.lock().stats.track_click("accept");
        let summary = handle.session_summary();
        assert_eq!(summary.total_actions, 2);
        assert_eq!(summary.terminal_commands, 1);
    }

    #[tokio::test]
    async fn test_probe_focus() {
        let page = Arc::new(FakePage::default());
        page.state().focused = true;
        let handle = AgentHandle::attach(page, "page-1");
        assert_eq!(handle.probe_focus().await, Some(true));
    }

    #[test]
    fn test_ensure_defaults() {
        let mut ctx = SessionContext {
            poll_interval: Duration::ZERO,
            banned_commands: vec!["rm -rf /".into()],
            tab_names: vec!["Chat".into()],
            ..SessionContext::default()
        };
        ctx.completion_status
            .insert("Gone".into(), ConversationStatus::Done);

        ctx.ensure_defaults();

        assert_eq!(ctx.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(ctx.banned_patterns.len(), 1);
        assert_eq!(
            ctx.completion_status.get("Chat"),
            Some(&ConversationStatus::Working)
        );
        assert!(!ctx.completion_status.contains_key("Gone"));
    }
}
