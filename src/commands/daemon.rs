use anyhow::Result;
use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use autoaccept::daemon::{Daemon, DaemonClient, DaemonRequest, DaemonResponse};
use autoaccept::orchestrator::{Orchestrator, OrchestratorStatus};
use autoaccept::types::OutputFormat;

use super::utils::{GlobalOptions, print_output};
use crate::errors::AutoAcceptError;

#[derive(Subcommand)]
pub enum DaemonCommands {
    /// Run the daemon (in foreground)
    Run,

    /// Start the daemon in the background
    Start,

    /// Stop the daemon
    Stop,

    /// Check daemon status
    Status {
        /// Output format
        #[arg(short, long, default_value = "simple")]
        format: OutputFormat,
    },
}

fn log_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("autoaccept-daemon.log")
}

/// Poll the socket for a while after spawning
fn wait_until_running(log_file: &Path) {
    let mut daemon_started = false;
    for i in 0..10 {
        std::thread::sleep(Duration::from_millis(500));
        if Daemon::is_running() {
            daemon_started = true;
            break;
        }
        if i == 0 {
            std::thread::sleep(Duration::from_millis(1500));
        }
    }

    if daemon_started {
        println!("Daemon started successfully");
        println!("Log file: {}", log_file.display());
    } else {
        eprintln!(
            "Failed to start daemon. Check log file: {}",
            log_file.display()
        );
    }
}

pub async fn handle_daemon(options: &GlobalOptions, command: DaemonCommands) -> Result<()> {
    match command {
        DaemonCommands::Run => {
            if Daemon::is_running() {
                println!("Daemon is already running");
            } else {
                let store = options.open_store()?;
                let orchestrator = Orchestrator::new(options.orchestrator_config()?, store)?;
                Daemon::new(Arc::new(orchestrator)).start().await?;
            }
        }
        DaemonCommands::Start => {
            if Daemon::is_running() {
                println!("Daemon is already running");
            } else {
                println!("Starting daemon in background...");
                // Validate flags here rather than in the detached child
                options.orchestrator_config()?;
                spawn_detached(options, &log_file())?;
            }
        }
        DaemonCommands::Stop => {
            if DaemonClient::is_daemon_running() {
                match DaemonClient::send_request(DaemonRequest::Shutdown) {
                    Ok(_) => println!("Daemon stopped"),
                    Err(e) => println!("Failed to stop daemon: {}", e),
                }
            } else {
                println!("Daemon is not running");
            }
        }
        DaemonCommands::Status { format } => {
            if !DaemonClient::is_daemon_running() {
                return Err(AutoAcceptError::DaemonUnavailable(
                    "Daemon is not running. Start it with: autoaccept daemon start".to_string(),
                )
                .into());
            }
            match DaemonClient::send_request(DaemonRequest::Status)? {
                DaemonResponse::Status(status) => {
                    print_output(status.as_ref(), format, print_status)?;
                }
                other => anyhow::bail!("Daemon is not responding properly: {:?}", other),
            }
        }
    }
    Ok(())
}

fn print_status(status: &OrchestratorStatus) {
    println!(
        "Daemon is running ({}, {}, {})",
        status.ide,
        if status.background { "background" } else { "foreground" },
        if status.enabled { "enabled" } else { "disabled" }
    );
    if let Some(tick) = &status.last_tick {
        println!("Last tick: {:?}", tick);
    }
    if !status.connections.is_empty() {
        println!("\nConnected pages:");
        for conn in &status.connections {
            println!(
                "  {}:{} - {} ({})",
                conn.port,
                conn.target_id,
                conn.title,
                if conn.agent.is_running { "running" } else { "idle" }
            );
        }
    }
}

#[cfg(unix)]
fn spawn_detached(options: &GlobalOptions, log_file: &Path) -> Result<()> {
    use nix::unistd::{ForkResult, fork, setsid};
    use std::os::unix::io::AsRawFd;
    use std::os::unix::process::CommandExt;

    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => {
            wait_until_running(log_file);
        }
        Ok(ForkResult::Child) => {
            let _ = setsid();

            let log = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?;
            let log_fd = log.as_raw_fd();
            nix::unistd::dup2(log_fd, 1)?;
            nix::unistd::dup2(log_fd, 2)?;
            nix::unistd::close(0)?;

            // A fresh process, so no runtime state is inherited across the fork
            let exe_path = std::env::current_exe()?;
            let _ = std::process::Command::new(exe_path)
                .args(options.to_args())
                .arg("daemon")
                .arg("run")
                .exec();

            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Fork failed: {}", e);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn spawn_detached(options: &GlobalOptions, log_file: &Path) -> Result<()> {
    use std::process::Command;
    let exe_path = std::env::current_exe()?;

    let child = Command::new(&exe_path)
        .args(options.to_args())
        .arg("daemon")
        .arg("run")
        .stdin(std::process::Stdio::null())
        .stdout(std::fs::File::create(log_file)?)
        .stderr(std::fs::File::create(log_file)?)
        .spawn()?;

    std::mem::forget(child);
    wait_until_running(log_file);
    Ok(())
}
