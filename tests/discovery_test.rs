// Target discovery against live HTTP endpoints

mod common;

use autoaccept::cdp::{ScannerConfig, TargetScanner};
use autoaccept::types::{PortRange, TargetKind};
use common::{FakeTarget, discover, start_fake};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[tokio::test]
async fn test_discovers_debuggable_targets_in_priority_order() {
    let (_fake, port) = start_fake(vec![
        FakeTarget::worker("w1"),
        FakeTarget::iframe("f1"),
        FakeTarget::page("p1", "Workbench"),
        FakeTarget::page("p2", "Settings").without_socket(),
    ])
    .await;

    let targets = discover(port).await;
    let summary: Vec<(&str, TargetKind)> =
        targets.iter().map(|t| (t.id.as_str(), t.kind)).collect();

    assert_eq!(
        summary,
        vec![
            ("p1", TargetKind::Page),
            ("f1", TargetKind::Iframe),
            ("w1", TargetKind::Worker),
        ]
    );
    assert!(targets.iter().all(|t| t.port == port));
    assert!(targets[0].socket_address.ends_with("/devtools/page/p1"));
    assert_eq!(targets[0].title, "Workbench");
}

#[tokio::test]
async fn test_duplicate_ids_across_ports_are_kept_once() {
    let (_a, port_a) = start_fake(vec![FakeTarget::page("shared", "Workbench")]).await;
    let (_b, port_b) = start_fake(vec![
        FakeTarget::page("shared", "Workbench"),
        FakeTarget::page("only-b", "Other Window"),
    ])
    .await;

    let scanner = TargetScanner::new(ScannerConfig {
        preferred_port: port_a,
        port_range: PortRange {
            start: port_b,
            end: port_b,
        },
        probe_timeout: Duration::from_millis(500),
        ..ScannerConfig::default()
    })
    .unwrap();
    assert_eq!(scanner.ports(), vec![port_a, port_b]);

    let targets = scanner.discover().await;
    let shared: Vec<_> = targets.iter().filter(|t| t.id == "shared").collect();
    assert_eq!(shared.len(), 1);
    assert!(targets.iter().any(|t| t.id == "only-b"));
}

#[tokio::test]
async fn test_targets_follow_the_endpoint() {
    let (fake, port) = start_fake(vec![FakeTarget::page("p1", "Workbench")]).await;
    assert_eq!(discover(port).await.len(), 1);

    fake.set_targets(vec![]);
    assert!(discover(port).await.is_empty());
}
