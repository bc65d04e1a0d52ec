//! Configuration — `<config dir>/platter/config.toml`

use anyhow::{Context, Result, bail};
use platter_a2a::{ClientConfig, DeliveryProfile, OrchestratorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Comma-separated agent addresses that replace `orchestrator.remote_agents`
pub const REMOTE_AGENTS_ENV: &str = "PLATTER_REMOTE_AGENTS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatterConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub budget: BudgetSection,
    #[serde(default)]
    pub delivery: DeliveryProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub remote_agents: Vec<String>,
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            remote_agents: Vec::new(),
            health_interval_secs: default_health_interval(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_name() -> String {
    "Alex Helper Bot".to_string()
}
fn default_health_interval() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_request_timeout() -> u64 {
    60
}

/// Observability sink; no url disables it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorSection {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSection {
    #[serde(default = "default_balance")]
    pub initial_balance: f64,
}

impl Default for BudgetSection {
    fn default() -> Self {
        Self {
            initial_balance: default_balance(),
        }
    }
}

fn default_balance() -> f64 {
    50.0
}

pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Cannot determine config directory")?;
    Ok(dir.join("platter").join("config.toml"))
}

fn validate_address(kind: &str, address: &str) -> Result<()> {
    let parsed = url::Url::parse(address)
        .with_context(|| format!("Invalid {} address '{}'", kind, address))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("{} address '{}' must use http or https", kind, address);
    }
    Ok(())
}

impl PlatterConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_config_path()?, false),
        };

        if !path.exists() {
            if explicit {
                bail!("Config file not found: {}", path.display());
            }
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Replace the configured agent addresses with a comma-separated list
    pub fn apply_remote_agents_override(&mut self, value: Option<String>) {
        let Some(value) = value else {
            return;
        };
        let addresses: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();
        debug!(
            "{} overrides remote agents with {} address(es)",
            REMOTE_AGENTS_ENV,
            addresses.len()
        );
        self.orchestrator.remote_agents = addresses;
    }

    pub fn validate(&self) -> Result<()> {
        if self.orchestrator.remote_agents.is_empty() {
            bail!(
                "No remote agents configured. Set orchestrator.remote_agents or {}",
                REMOTE_AGENTS_ENV
            );
        }
        for address in &self.orchestrator.remote_agents {
            validate_address("Remote agent", address)?;
        }
        if let Some(url) = &self.monitor.url {
            validate_address("Monitor", url)?;
        }
        if self.orchestrator.health_interval_secs == 0 {
            bail!("orchestrator.health_interval_secs must be greater than zero");
        }
        if !self.budget.initial_balance.is_finite() || self.budget.initial_balance < 0.0 {
            bail!(
                "budget.initial_balance must be a non-negative amount, got {}",
                self.budget.initial_balance
            );
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_secs(self.orchestrator.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.orchestrator.request_timeout_secs),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            name: self.orchestrator.name.clone(),
            remote_agents: self.orchestrator.remote_agents.clone(),
            health_interval: Duration::from_secs(self.orchestrator.health_interval_secs),
            delivery: self.delivery.clone(),
        }
    }
}
