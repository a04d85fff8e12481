use anyhow::{Context, Result};
use interprocess::local_socket::{
    GenericFilePath, Listener, ListenerOptions, Name, Stream, ToFsName,
    traits::{ListenerExt, Stream as StreamTrait},
};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::orchestrator::{Orchestrator, OrchestratorStatus, StatsReport};

/// Background orchestrator reachable over a local socket
pub struct Daemon {
    orchestrator: Arc<Orchestrator>,
}

/// Messages that can be sent to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DaemonRequest {
    Ping,
    Status,
    Stats,
    ResetStats,
    SetEnabled { enabled: bool },
    UpdateBannedCommands { patterns: Vec<String> },
    Shutdown,
}

/// Responses from the daemon
#[derive(Debug, Serialize, Deserialize)]
pub enum DaemonResponse {
    Pong,
    Success(String),
    Error(String),
    Status(Box<OrchestratorStatus>),
    Stats(Box<StatsReport>),
}

impl Daemon {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn socket_path() -> Result<PathBuf> {
        let runtime_dir = dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .or_else(|| std::env::temp_dir().into())
            .context("Could not determine runtime directory")?;

        Ok(runtime_dir.join("autoaccept-daemon.sock"))
    }

    fn socket_name() -> Result<Name<'static>> {
        let socket_path = Self::socket_path()?;
        let path_string = socket_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Socket path is not valid UTF-8"))?
            .to_owned();
        // Leaked for the 'static lifetime; created once per process
        let path_str: &'static str = Box::leak(path_string.into_boxed_str());
        Ok(path_str.to_fs_name::<GenericFilePath>()?)
    }

    pub fn is_running() -> bool {
        if let Ok(name) = Self::socket_name() {
            // Connecting is enough; an empty request is ignored by the server
            Stream::connect(name).is_ok()
        } else {
            false
        }
    }

    /// Serve requests and run the orchestrator until a Shutdown request
    pub async fn start(self) -> Result<()> {
        if Self::is_running() {
            anyhow::bail!("Daemon is already running");
        }

        let socket_path = Self::socket_path()?;
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }

        let listener = ListenerOptions::new()
            .name(Self::socket_name()?)
            .create_sync()?;
        info!("Daemon listening on {:?}", socket_path);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let orchestrator = self.orchestrator.clone();
        // The listener is blocking, so it gets its own thread
        std::thread::spawn(move || Self::accept_loop(listener, orchestrator, shutdown_tx));

        let result = self.orchestrator.run(shutdown_rx).await;

        if let Err(e) = std::fs::remove_file(&socket_path) {
            debug!("Socket cleanup: {}", e);
        }
        result
    }

    fn accept_loop(
        listener: Listener,
        orchestrator: Arc<Orchestrator>,
        shutdown: watch::Sender<bool>,
    ) {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => match Self::handle_client(stream, &orchestrator) {
                    Ok(true) => {
                        info!("Daemon shutting down");
                        let _ = shutdown.send(true);
                        break;
                    }
                    Ok(false) => {}
                    Err(e) => error!("Error handling client: {}", e),
                },
                Err(e) => error!("Error accepting connection: {}", e),
            }
        }
    }

    /// Answer one request. Returns true when the daemon should stop.
    fn handle_client(mut stream: Stream, orchestrator: &Orchestrator) -> Result<bool> {
        let mut reader = BufReader::new(&mut stream);
        let mut request_line = String::new();
        let bytes_read = reader.read_line(&mut request_line)?;

        // A bare connect is a liveness probe
        if bytes_read == 0 || request_line.trim().is_empty() {
            return Ok(false);
        }

        let request: DaemonRequest = serde_json::from_str(request_line.trim_end())?;
        debug!("Received request: {:?}", request);

        let (response, stop) = Self::handle_request(orchestrator, request);

        let response_json = serde_json::to_string(&response)?;
        stream.write_all(response_json.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;

        Ok(stop)
    }

    fn handle_request(orchestrator: &Orchestrator, request: DaemonRequest) -> (DaemonResponse, bool) {
        let response = match request {
            DaemonRequest::Ping => DaemonResponse::Pong,
            DaemonRequest::Status => DaemonResponse::Status(Box::new(orchestrator.status())),
            DaemonRequest::Stats => DaemonResponse::Stats(Box::new(orchestrator.stats())),
            DaemonRequest::ResetStats => {
                orchestrator.reset_stats();
                DaemonResponse::Success("Session stats reset".to_string())
            }
            DaemonRequest::SetEnabled { enabled } => match orchestrator.set_enabled(enabled) {
                Ok(()) => DaemonResponse::Success(
                    if enabled { "Enabled" } else { "Disabled" }.to_string(),
                ),
                Err(e) => DaemonResponse::Error(e.to_string()),
            },
            DaemonRequest::UpdateBannedCommands { patterns } => {
                let count = patterns.len();
                match orchestrator.update_banned_commands(patterns) {
                    Ok(()) => DaemonResponse::Success(format!("{} banned pattern(s) active", count)),
                    Err(e) => DaemonResponse::Error(e.to_string()),
                }
            }
            DaemonRequest::Shutdown => {
                return (
                    DaemonResponse::Success("Daemon shutting down".to_string()),
                    true,
                );
            }
        };
        (response, false)
    }
}

/// Client for communicating with the daemon
pub struct DaemonClient;

impl DaemonClient {
    pub fn send_request(request: DaemonRequest) -> Result<DaemonResponse> {
        let name = Daemon::socket_name()?;

        let mut stream =
            Stream::connect(name).context("Failed to connect to daemon. Is it running?")?;

        let request_json = serde_json::to_string(&request)?;
        stream.write_all(request_json.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        match reader.read_line(&mut response_line) {
            Ok(0) => anyhow::bail!("Daemon closed connection without sending response"),
            Ok(_) => {
                if response_line.trim().is_empty() {
                    anyhow::bail!("Received empty response from daemon");
                }
                let response: DaemonResponse = serde_json::from_str(&response_line)
                    .with_context(|| format!("Failed to parse daemon response: {}", response_line))?;
                Ok(response)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_daemon_running() -> bool {
        Daemon::is_running()
    }
}

#[cfg(test)]
#[path = "../daemon_test.rs"]
mod daemon_test;
