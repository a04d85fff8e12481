// Common test utilities and fixtures

#![allow(dead_code)]

use std::time::Duration;

use autoaccept::cdp::{ScannerConfig, TargetScanner};
use autoaccept::types::{AgentConfig, IdeMode, PortRange, Target};

include!("../fake_devtools_app.rs");

/// Start a fake endpoint serving `targets` and return it with its port
pub async fn start_fake(targets: Vec<FakeTarget>) -> (FakeDevtools, u16) {
    let fake = FakeDevtools::new(targets);
    let addr = fake.spawn().await;
    (fake, addr.port())
}

/// Scanner that only looks at `port`
pub fn scanner_config(port: u16) -> ScannerConfig {
    ScannerConfig {
        preferred_port: port,
        port_range: PortRange {
            start: port,
            end: port,
        },
        probe_timeout: Duration::from_millis(500),
        ..ScannerConfig::default()
    }
}

pub async fn discover(port: u16) -> Vec<Target> {
    TargetScanner::new(scanner_config(port))
        .expect("scanner")
        .discover()
        .await
}

pub fn agent_config(mode: IdeMode, banned: &[&str]) -> AgentConfig {
    AgentConfig {
        mode,
        is_background_mode: false,
        poll_interval_ms: 50,
        banned_commands: banned.iter().map(|s| s.to_string()).collect(),
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let started = std::time::Instant::now();
    while started.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
