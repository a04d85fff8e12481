use anyhow::Result;
use chrono::Utc;

use autoaccept::daemon::{DaemonClient, DaemonRequest, DaemonResponse};
use autoaccept::orchestrator::StatsReport;
use autoaccept::roi;
use autoaccept::types::OutputFormat;

use super::utils::{GlobalOptions, print_output};

/// Weekly roll-up, plus live sessions when a daemon is running
pub fn handle_stats(options: &GlobalOptions, format: OutputFormat, reset: bool) -> Result<()> {
    let report = if DaemonClient::is_daemon_running() {
        if reset {
            DaemonClient::send_request(DaemonRequest::ResetStats)?;
        }
        match DaemonClient::send_request(DaemonRequest::Stats)? {
            DaemonResponse::Stats(report) => *report,
            DaemonResponse::Error(e) => anyhow::bail!("Daemon error: {}", e),
            other => anyhow::bail!("Unexpected daemon response: {:?}", other),
        }
    } else {
        let store = options.open_store()?;
        StatsReport {
            weekly_roi: roi::current(store.as_ref(), Utc::now()),
            last_week_roi: roi::last_week(store.as_ref()),
            sessions: Vec::new(),
        }
    };

    print_output(&report, format, |r: &StatsReport| {
        println!(
            "Week of {}: {} click(s), {} blocked, {} session(s)",
            r.weekly_roi.week_start.format("%Y-%m-%d"),
            r.weekly_roi.clicks_this_week,
            r.weekly_roi.blocked_this_week,
            r.weekly_roi.sessions_this_week
        );
        if let Some(last) = &r.last_week_roi {
            println!(
                "Last week:        {} click(s), {} blocked, {} session(s)",
                last.clicks_this_week, last.blocked_this_week, last.sessions_this_week
            );
        }
        for page in &r.sessions {
            println!(
                "  {} - {} action(s), {} blocked, {}s",
                page.title,
                page.summary.total_actions,
                page.summary.blocked,
                page.summary.duration_secs
            );
        }
    })
}
