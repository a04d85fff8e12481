#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod errors;

use autoaccept::cdp::discovery::PREFERRED_PORT;
use autoaccept::orchestrator::DEFAULT_TICK_INTERVAL;
use autoaccept::types::{IdeMode, OutputFormat};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const _EXIT_COMMAND_ERROR: i32 = 1;
const _EXIT_NO_TARGETS: i32 = 4;
const _EXIT_TIMEOUT: i32 = 5;
const _EXIT_DAEMON_UNAVAILABLE: i32 = 6;

use crate::commands::daemon::DaemonCommands;
use crate::commands::settings::BannedCommands;
use crate::commands::utils::GlobalOptions;

#[derive(Parser)]
#[command(name = "autoaccept")]
#[command(about = "Accepts IDE agent prompts over the DevTools protocol", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Preferred remote debugging port
    #[arg(long, global = true, default_value_t = PREFERRED_PORT)]
    port: u16,

    /// Additional ports to probe (START-END, e.g., 9000-9003)
    #[arg(long, global = true)]
    port_range: Option<String>,

    /// IDE flavor
    #[arg(long, global = true, default_value = "simple")]
    ide: IdeMode,

    /// Cycle through conversation tabs with an overlay
    #[arg(long, global = true)]
    background: bool,

    /// Orchestrator tick interval in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_TICK_INTERVAL.as_millis() as u64)]
    tick_ms: u64,

    /// State file (defaults to ~/.autoaccept/state.json)
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> GlobalOptions {
        GlobalOptions {
            port: self.port,
            port_range: self.port_range.clone(),
            ide: self.ide,
            background: self.background,
            tick_ms: self.tick_ms,
            state_file: self.state_file.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the IDE in the foreground until interrupted
    Run,

    /// List debuggable targets
    Scan {
        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Check a command line against the denylist
    Check {
        /// Command text to check
        text: String,

        /// Pattern to check against instead of the stored denylist (repeatable)
        #[arg(short, long = "pattern")]
        patterns: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Manage the background daemon
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },

    /// Turn automation on
    Enable,

    /// Turn automation off
    Disable,

    /// Manage the command denylist
    Banned {
        #[command(subcommand)]
        command: BannedCommands,
    },

    /// Show weekly and per-session statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Reset live session counters first (daemon only)
        #[arg(long)]
        reset: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let result = run().await;

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            let autoaccept_err: errors::AutoAcceptError = err.into();

            // Output JSON error to stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": autoaccept_err.to_string(),
                "exit_code": autoaccept_err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            eprintln!("Error: {}", autoaccept_err);
            std::process::exit(autoaccept_err.exit_code());
        }
    }
}

async fn run() -> Result<()> {
    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoaccept=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();
    let options = cli.options();

    match cli.command {
        Commands::Run => commands::run::handle_run(&options).await?,

        Commands::Scan { format } => commands::scan::handle_scan(&options, format).await?,

        Commands::Check {
            text,
            patterns,
            format,
        } => commands::check::handle_check(&options, text, patterns, format)?,

        Commands::Daemon { command } => {
            commands::daemon::handle_daemon(&options, command).await?
        }

        Commands::Enable => commands::settings::handle_set_enabled(&options, true)?,

        Commands::Disable => commands::settings::handle_set_enabled(&options, false)?,

        Commands::Banned { command } => commands::settings::handle_banned(&options, command)?,

        Commands::Stats { format, reset } => {
            commands::stats::handle_stats(&options, format, reset)?
        }

        Commands::Version => commands::version::handle_version()?,
    }

    Ok(())
}
