use std::fmt;

use autoaccept::cdp::CdpError;

/// Custom error type that includes exit codes
#[derive(Debug)]
pub enum AutoAcceptError {
    /// No debuggable page answered on any probed port (exit code 4)
    NoTargets { ports: Vec<u16> },
    /// Operation timeout (exit code 5)
    Timeout(String),
    /// Local daemon socket unreachable (exit code 6)
    DaemonUnavailable(String),
    /// Generic error (exit code 1)
    Other(anyhow::Error),
}

impl AutoAcceptError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AutoAcceptError::NoTargets { .. } => 4,
            AutoAcceptError::Timeout(_) => 5,
            AutoAcceptError::DaemonUnavailable(_) => 6,
            AutoAcceptError::Other(_) => 1,
        }
    }
}

impl fmt::Display for AutoAcceptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoAcceptError::NoTargets { ports } => {
                let ports: Vec<String> = ports.iter().map(|p| p.to_string()).collect();
                write!(
                    f,
                    "No debuggable targets found on port(s) {}. Launch the IDE with --remote-debugging-port",
                    ports.join(", ")
                )
            }
            AutoAcceptError::Timeout(msg) => write!(f, "Operation timed out: {}", msg),
            AutoAcceptError::DaemonUnavailable(msg) => {
                write!(f, "Daemon unavailable: {}", msg)
            }
            AutoAcceptError::Other(err) => write!(f, "{:#}", err),
        }
    }
}

impl std::error::Error for AutoAcceptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AutoAcceptError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for AutoAcceptError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<AutoAcceptError>() {
            Ok(typed) => return typed,
            Err(err) => err,
        };

        if let Some(CdpError::Timeout { .. }) = err.downcast_ref::<CdpError>() {
            return AutoAcceptError::Timeout(err.to_string());
        }

        let msg = format!("{:#}", err);
        if msg.contains("Failed to connect to daemon") {
            AutoAcceptError::DaemonUnavailable(msg)
        } else if msg.contains("timed out") {
            AutoAcceptError::Timeout(msg)
        } else {
            AutoAcceptError::Other(err)
        }
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;
