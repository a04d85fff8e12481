use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use autoaccept::cdp::ScannerConfig;
use autoaccept::orchestrator::OrchestratorConfig;
use autoaccept::state_store::{JsonFileStore, StateStore};
use autoaccept::types::{IdeMode, OutputFormat, PortRange};

/// Flags shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub port: u16,
    pub port_range: Option<String>,
    pub ide: IdeMode,
    pub background: bool,
    pub tick_ms: u64,
    pub state_file: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn scanner_config(&self) -> Result<ScannerConfig> {
        let mut config = ScannerConfig {
            preferred_port: self.port,
            ..ScannerConfig::default()
        };
        config.port_range = match &self.port_range {
            Some(range) => PortRange::parse(range)?,
            // Without an explicit range, scan around the preferred port
            None => PortRange {
                start: self.port.saturating_sub(3),
                end: self.port.saturating_add(3),
            },
        };
        Ok(config)
    }

    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig> {
        if self.tick_ms == 0 {
            anyhow::bail!("--tick-ms must be greater than zero");
        }
        Ok(OrchestratorConfig {
            scanner: self.scanner_config()?,
            ide: self.ide,
            background: self.background,
            tick_interval: Duration::from_millis(self.tick_ms),
        })
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => JsonFileStore::default_path(),
        }
    }

    pub fn open_store(&self) -> Result<Arc<dyn StateStore>> {
        Ok(Arc::new(JsonFileStore::open(self.state_path()?)?))
    }

    /// Flags to hand to a re-executed copy of ourselves
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--port".to_string(),
            self.port.to_string(),
            "--ide".to_string(),
            self.ide.to_string(),
            "--tick-ms".to_string(),
            self.tick_ms.to_string(),
        ];
        if let Some(range) = &self.port_range {
            args.push("--port-range".to_string());
            args.push(range.clone());
        }
        if self.background {
            args.push("--background".to_string());
        }
        if let Some(path) = &self.state_file {
            args.push("--state-file".to_string());
            args.push(path.display().to_string());
        }
        args
    }
}

/// Print a value as pretty JSON or through a simple-format renderer
pub fn print_output<T: Serialize>(
    value: &T,
    format: OutputFormat,
    simple: impl FnOnce(&T),
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Simple => simple(value),
    }
    Ok(())
}
