#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::types::IdeMode;
    use pretty_assertions::assert_eq;

    fn target(id: &str, kind: TargetKind, socket_address: &str) -> Target {
        Target {
            id: id.to_string(),
            url: "app://workbench".to_string(),
            title: "Workbench".to_string(),
            kind,
            socket_address: socket_address.to_string(),
            port: 1,
        }
    }

    fn config() -> AgentConfig {
        AgentConfig {
            mode: IdeMode::Simple,
            is_background_mode: false,
            poll_interval_ms: 1000,
            banned_commands: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_sync_with_no_targets() {
        let manager = ConnectionManager::new();
        let report = manager.sync(&[], &config()).await;
        assert_eq!(report, SyncReport::default());
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_workers_are_never_opened() {
        let manager = ConnectionManager::new();
        let targets = vec![target(
            "w1",
            TargetKind::Worker,
            "ws://127.0.0.1:1/devtools/page/w1",
        )];
        let report = manager.sync(&targets, &config()).await;
        assert_eq!(report.open_failures, 0);
        assert_eq!(report.opened, 0);
    }

    #[tokio::test]
    async fn test_unreachable_target_is_retried_later() {
        let manager = ConnectionManager::new();
        let targets = vec![target(
            "p1",
            TargetKind::Page,
            "ws://127.0.0.1:1/devtools/page/p1",
        )];

        let report = manager.sync(&targets, &config()).await;
        assert_eq!(report.open_failures, 1);
        assert!(!manager.is_connected("p1"));

        // Nothing is remembered about the failure
        let report = manager.sync(&targets, &config()).await;
        assert_eq!(report.open_failures, 1);
    }

    #[tokio::test]
    async fn test_empty_manager_aggregates() {
        let manager = ConnectionManager::new();
        assert_eq!(manager.disconnect_all(), 0);
        assert_eq!(manager.collect_and_clear_all(), CollectedStats::default());
        assert_eq!(manager.consume_away_actions_all(), 0);
        assert!(manager.connections().is_empty());
        assert!(manager.session_summaries().is_empty());
        assert_eq!(manager.refresh_focus().await, None);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("ABCDEF0123456789"), "ABCDEF01");
        assert_eq!(short_id("p1"), "p1");
    }
}
