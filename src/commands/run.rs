use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use autoaccept::daemon::DaemonClient;
use autoaccept::orchestrator::Orchestrator;

use super::utils::GlobalOptions;

/// Drive the IDE in the foreground until Ctrl-C
pub async fn handle_run(options: &GlobalOptions) -> Result<()> {
    if DaemonClient::is_daemon_running() {
        warn!("A daemon is already running; this instance will stand by while it holds the lock");
    }

    let store = options.open_store()?;
    let orchestrator = Arc::new(Orchestrator::new(options.orchestrator_config()?, store)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    orchestrator.run(shutdown_rx).await?;

    let stats = orchestrator.stats();
    info!(
        "This week: {} click(s), {} blocked, {} session(s)",
        stats.weekly_roi.clicks_this_week,
        stats.weekly_roi.blocked_this_week,
        stats.weekly_roi.sessions_this_week
    );
    Ok(())
}
