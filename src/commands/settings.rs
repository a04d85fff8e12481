use anyhow::Result;
use clap::Subcommand;

use autoaccept::daemon::{DaemonClient, DaemonRequest, DaemonResponse};
use autoaccept::settings::{Settings, default_banned_commands};
use autoaccept::types::OutputFormat;

use super::utils::{GlobalOptions, print_output};

#[derive(Subcommand)]
pub enum BannedCommands {
    /// Show the active denylist
    List {
        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Add a pattern (literal text, or /regex/flags)
    Add { pattern: String },

    /// Remove a pattern
    Remove { pattern: String },

    /// Restore the built-in denylist
    Reset,
}

/// Forward a request to the daemon when one is running.
/// Returns false when there is no daemon to tell.
fn notify_daemon(request: DaemonRequest) -> Result<bool> {
    if !DaemonClient::is_daemon_running() {
        return Ok(false);
    }
    match DaemonClient::send_request(request)? {
        DaemonResponse::Error(e) => anyhow::bail!("Daemon rejected the change: {}", e),
        _ => Ok(true),
    }
}

pub fn handle_set_enabled(options: &GlobalOptions, enabled: bool) -> Result<()> {
    // The daemon saves the setting itself and drops its connections when disabling
    if !notify_daemon(DaemonRequest::SetEnabled { enabled })? {
        let store = options.open_store()?;
        let mut settings = Settings::load(store.as_ref());
        settings.enabled = enabled;
        settings.save(store.as_ref())?;
    }
    println!("{}", if enabled { "Enabled" } else { "Disabled" });
    Ok(())
}

pub fn handle_banned(options: &GlobalOptions, command: BannedCommands) -> Result<()> {
    let store = options.open_store()?;
    let mut settings = Settings::load(store.as_ref());

    let changed = match command {
        BannedCommands::List { format } => {
            return print_output(&settings.banned_commands, format, |patterns: &Vec<String>| {
                for pattern in patterns {
                    println!("{}", pattern);
                }
            });
        }
        BannedCommands::Add { pattern } => {
            if settings.add_banned(&pattern) {
                println!("Added: {}", pattern.trim());
                true
            } else {
                println!("Already present or empty: {}", pattern);
                false
            }
        }
        BannedCommands::Remove { pattern } => {
            if settings.remove_banned(&pattern) {
                println!("Removed: {}", pattern.trim());
                true
            } else {
                println!("Not in the denylist: {}", pattern);
                false
            }
        }
        BannedCommands::Reset => {
            settings.banned_commands = default_banned_commands();
            println!("Restored {} default pattern(s)", settings.banned_commands.len());
            true
        }
    };

    if changed
        && !notify_daemon(DaemonRequest::UpdateBannedCommands {
            patterns: settings.banned_commands.clone(),
        })?
    {
        settings.save(store.as_ref())?;
    }
    Ok(())
}
