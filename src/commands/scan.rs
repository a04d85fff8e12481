use anyhow::Result;

use autoaccept::cdp::TargetScanner;
use autoaccept::types::{OutputFormat, Target};

use super::utils::{GlobalOptions, print_output};
use crate::errors::AutoAcceptError;

/// Print every debuggable target currently reachable
pub async fn handle_scan(options: &GlobalOptions, format: OutputFormat) -> Result<()> {
    let scanner = TargetScanner::new(options.scanner_config()?)?;
    let targets = scanner.discover().await;

    if targets.is_empty() {
        return Err(AutoAcceptError::NoTargets {
            ports: scanner.ports(),
        }
        .into());
    }

    print_output(&targets, format, |targets: &Vec<Target>| {
        for target in targets {
            println!(
                "{:<8} {:>5}  {}  {}",
                format!("{:?}", target.kind).to_lowercase(),
                target.port,
                target.title,
                target.url
            );
        }
    })
}
