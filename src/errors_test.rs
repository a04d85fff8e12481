#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(AutoAcceptError::NoTargets { ports: vec![9000] }.exit_code(), 4);
        assert_eq!(AutoAcceptError::Timeout("x".into()).exit_code(), 5);
        assert_eq!(AutoAcceptError::DaemonUnavailable("x".into()).exit_code(), 6);
        assert_eq!(
            AutoAcceptError::Other(anyhow::anyhow!("boom")).exit_code(),
            1
        );
    }

    #[test]
    fn test_typed_error_survives_anyhow() {
        let err = anyhow::Error::new(AutoAcceptError::NoTargets {
            ports: vec![9000, 9001],
        });
        let converted: AutoAcceptError = err.into();
        assert_eq!(converted.exit_code(), 4);
        assert!(converted.to_string().contains("9000, 9001"));
    }

    #[test]
    fn test_cdp_timeout_maps_to_timeout() {
        let err = anyhow::Error::new(CdpError::Timeout {
            method: "Runtime.evaluate".into(),
            id: 7,
            timeout_ms: 2000,
        });
        let converted: AutoAcceptError = err.into();
        assert!(matches!(converted, AutoAcceptError::Timeout(_)));
    }

    #[test]
    fn test_daemon_connect_failure_maps_to_unavailable() {
        let err = anyhow::anyhow!("refused")
            .context("Failed to connect to daemon. Is it running?");
        let converted: AutoAcceptError = err.into();
        assert_eq!(converted.exit_code(), 6);
    }

    #[test]
    fn test_other_errors_are_generic() {
        let converted: AutoAcceptError = anyhow::anyhow!("Invalid port range").into();
        assert_eq!(converted.exit_code(), 1);
        assert_eq!(converted.to_string(), "Invalid port range");
    }
}
