use futures::StreamExt;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use super::error::CdpError;
use super::protocol::TargetDescriptor;
use crate::types::{PortRange, Target, TargetKind};

/// Port the IDE is usually launched with
pub const PREFERRED_PORT: u16 = 9000;

/// Per-port metadata fetch timeout
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on simultaneous port probes
const MAX_CONCURRENT_PROBES: usize = 8;

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub host: String,
    pub preferred_port: u16,
    pub port_range: PortRange,
    pub probe_timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            preferred_port: PREFERRED_PORT,
            port_range: PortRange {
                start: PREFERRED_PORT - 3,
                end: PREFERRED_PORT + 3,
            },
            probe_timeout: PROBE_TIMEOUT,
        }
    }
}

/// Finds what is currently reachable. Never fails: a port that does not
/// answer simply contributes no targets.
pub struct TargetScanner {
    client: reqwest::Client,
    config: ScannerConfig,
}

impl TargetScanner {
    pub fn new(config: ScannerConfig) -> Result<Self, CdpError> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Preferred port first, then the range, without duplicates
    pub fn ports(&self) -> Vec<u16> {
        let mut seen = HashSet::new();
        std::iter::once(self.config.preferred_port)
            .chain(self.config.port_range.ports())
            .filter(|port| seen.insert(*port))
            .collect()
    }

    pub async fn discover(&self) -> Vec<Target> {
        let ports = self.ports();
        let probes = futures::stream::iter(ports)
            .map(|port| async move { (port, self.probe(port).await) })
            .buffered(MAX_CONCURRENT_PROBES)
            .collect::<Vec<_>>()
            .await;

        let found: Vec<(u16, TargetDescriptor)> = probes
            .into_iter()
            .filter_map(|(port, result)| match result {
                Ok(descriptors) => Some(descriptors.into_iter().map(move |d| (port, d))),
                Err(e) => {
                    debug!("Nothing usable on port {}: {}", port, e);
                    None
                }
            })
            .flatten()
            .collect();

        collect_targets(found)
    }

    async fn probe(&self, port: u16) -> Result<Vec<TargetDescriptor>, CdpError> {
        let url = format!("http://{}:{}/json/list", self.config.host, port);
        let descriptors = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<TargetDescriptor>>()
            .await?;
        debug!("Port {} lists {} target(s)", port, descriptors.len());
        Ok(descriptors)
    }
}

/// Whether a debugger URL can actually be dialed
pub fn is_usable_socket_address(address: &str) -> bool {
    url::Url::parse(address)
        .map(|u| matches!(u.scheme(), "ws" | "wss") && u.host().is_some())
        .unwrap_or(false)
}

/// Drop unusable entries, keep the first sighting of each id, order by kind
pub fn collect_targets(found: Vec<(u16, TargetDescriptor)>) -> Vec<Target> {
    let mut seen = HashSet::new();
    let mut targets: Vec<Target> = found
        .into_iter()
        .filter_map(|(port, descriptor)| {
            let socket_address = descriptor.web_socket_debugger_url?;
            if !is_usable_socket_address(&socket_address) {
                return None;
            }
            if !seen.insert(descriptor.id.clone()) {
                return None;
            }
            Some(Target {
                kind: TargetKind::from_descriptor(&descriptor.kind),
                id: descriptor.id,
                url: descriptor.url,
                title: descriptor.title,
                socket_address,
                port,
            })
        })
        .collect();

    // Stable sort keeps port order within a kind
    targets.sort_by_key(|t| t.kind.priority());
    targets
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod discovery_test;
