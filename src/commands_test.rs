#[cfg(test)]
mod tests {
    use crate::commands::check::evaluate;
    use crate::commands::utils::GlobalOptions;
    use autoaccept::types::{IdeMode, PortRange};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::time::Duration;

    fn options() -> GlobalOptions {
        GlobalOptions {
            port: 9000,
            port_range: None,
            ide: IdeMode::Cursor,
            background: false,
            tick_ms: 5000,
            state_file: None,
        }
    }

    #[test]
    fn test_default_range_surrounds_preferred_port() {
        let config = options().scanner_config().unwrap();
        assert_eq!(config.preferred_port, 9000);
        assert_eq!(config.port_range, PortRange { start: 8997, end: 9003 });
    }

    #[test]
    fn test_explicit_range_is_parsed() {
        let mut opts = options();
        opts.port_range = Some("9222-9230".to_string());
        let config = opts.scanner_config().unwrap();
        assert_eq!(config.port_range, PortRange { start: 9222, end: 9230 });

        opts.port_range = Some("9230-9222".to_string());
        assert!(opts.scanner_config().is_err());
    }

    #[test]
    fn test_orchestrator_config() {
        let mut opts = options();
        opts.background = true;
        opts.tick_ms = 250;
        let config = opts.orchestrator_config().unwrap();
        assert_eq!(config.ide, IdeMode::Cursor);
        assert!(config.background);
        assert_eq!(config.tick_interval, Duration::from_millis(250));

        opts.tick_ms = 0;
        assert!(opts.orchestrator_config().is_err());
    }

    #[test]
    fn test_to_args_round_trips_flags() {
        let mut opts = options();
        opts.background = true;
        opts.port_range = Some("9000-9002".to_string());
        opts.state_file = Some(PathBuf::from("/tmp/state.json"));

        assert_eq!(
            opts.to_args(),
            vec![
                "--port",
                "9000",
                "--ide",
                "cursor",
                "--tick-ms",
                "5000",
                "--port-range",
                "9000-9002",
                "--background",
                "--state-file",
                "/tmp/state.json",
            ]
        );
    }

    #[test]
    fn test_explicit_state_file_wins() {
        let mut opts = options();
        opts.state_file = Some(PathBuf::from("/tmp/other.json"));
        assert_eq!(opts.state_path().unwrap(), PathBuf::from("/tmp/other.json"));
    }

    #[test]
    fn test_check_reports_matching_pattern() {
        let patterns = vec!["git push --force".to_string(), "rm -rf /".to_string()];
        let result = evaluate("sudo rm -rf /tmp/x", &patterns);
        assert!(result.banned);
        assert_eq!(result.pattern.as_deref(), Some("rm -rf /"));
        assert_eq!(result.patterns_checked, 2);
    }

    #[test]
    fn test_check_regex_and_empty_list() {
        let result = evaluate(
            "dd if=/dev/zero of=/dev/sda",
            &["/^dd if=.*$/i".to_string()],
        );
        assert!(result.banned);

        let result = evaluate("anything at all", &[]);
        assert!(!result.banned);
        assert_eq!(result.pattern, None);
        assert_eq!(result.patterns_checked, 0);
    }
}
