use thiserror::Error;

/// Errors raised by the command channel and target discovery
#[derive(Debug, Error)]
pub enum CdpError {
    /// WebSocket handshake with a target failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Transport-level WebSocket failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Command was not answered in time
    #[error("Command '{method}' (id {id}) timed out after {timeout_ms}ms")]
    Timeout {
        method: String,
        id: u64,
        timeout_ms: u64,
    },

    /// Socket closed while the command was pending
    #[error("Connection closed")]
    Closed,

    /// Remote side answered with an error object
    #[error("Protocol error: {message}")]
    Protocol { code: Option<i64>, message: String },

    /// Evaluated script threw inside the page
    #[error("Script exception: {0}")]
    ScriptException(String),

    /// Response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Discovery endpoint failure
    #[error("HTTP error: {0}")]
    Http(String),
}

impl CdpError {
    /// Transient I/O failures are retried on the next cycle
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CdpError::ConnectionFailed(_)
                | CdpError::WebSocket(_)
                | CdpError::Timeout { .. }
                | CdpError::Closed
                | CdpError::Http(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}
