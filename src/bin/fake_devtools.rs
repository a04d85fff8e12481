// Standalone fake DevTools endpoint for manual runs of the CLI

use tracing::{Level, info};

include!("../../tests/fake_devtools_app.rs");

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|p| p.parse().ok())
        .unwrap_or(9000);

    let fake = FakeDevtools::new(vec![
        FakeTarget::page("workbench", "Workbench"),
        FakeTarget::worker("extension-host"),
    ]);
    fake.set_candidates(vec![
        candidate("accept-1", "Accept"),
        command_candidate("run-1", "Run", "rm -rf / --no-preserve-root"),
        command_candidate("run-2", "Run", "cargo fmt --all"),
    ]);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    info!("Fake DevTools listening on http://{}/json/list", addr);

    axum::serve(listener, fake.router()).await.expect("Server failed");
}
