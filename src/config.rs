//! Runtime configuration.
//!
//! Settings come from an optional YAML file (`--config`), every field of
//! which has a default, and are then overridden by command-line flags.
//!
//! ```yaml
//! pool_file: proxies.cfg
//! probe_url: http://httpbin.org/ip
//! probe_timeout_secs: 5
//! content_timeout_secs: 10
//! discovery_url: https://www.sslproxies.org/
//! max_fetch_attempts: 50
//! ```

use crate::cli::Cli;
use crate::egress::client::DEFAULT_USER_AGENT;
use crate::egress::{Backoff, RotationLimits};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Plain-text pool file, one proxy address per line.
    pub pool_file: String,
    /// Endpoint used to probe candidates; must answer 200.
    pub probe_url: String,
    pub probe_timeout_secs: u64,
    /// Upper bound on a single page fetch, including the body.
    pub content_timeout_secs: u64,
    /// Free proxy list scraped when the pool is exhausted.
    pub discovery_url: String,
    pub discovery_timeout_secs: u64,
    /// Only take proxies the list marks as HTTPS-capable.
    pub discovery_https_only: bool,
    pub discovery_pause_ms: u64,
    pub discovery_pause_max_ms: u64,
    pub max_fetch_attempts: Option<usize>,
    pub max_discovery_attempts: Option<usize>,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_file: "proxies.cfg".to_string(),
            probe_url: "http://httpbin.org/ip".to_string(),
            probe_timeout_secs: 5,
            content_timeout_secs: 10,
            discovery_url: "https://www.sslproxies.org/".to_string(),
            discovery_timeout_secs: 1,
            discovery_https_only: true,
            discovery_pause_ms: 500,
            discovery_pause_max_ms: 5_000,
            max_fetch_attempts: None,
            max_discovery_attempts: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let text = tokio::fs::read_to_string(path).await?;
                let config = Self::from_yaml(&text)?;
                info!(path, "Loaded configuration");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Command-line flags win over file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(pool_file) = &cli.pool_file {
            self.pool_file = pool_file.clone();
        }
        if let Some(probe_url) = &cli.probe_url {
            self.probe_url = probe_url.clone();
        }
        if let Some(discovery_url) = &cli.discovery_url {
            self.discovery_url = discovery_url.clone();
        }
        if cli.max_attempts.is_some() {
            self.max_fetch_attempts = cli.max_attempts;
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_secs(self.content_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn discovery_backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.discovery_pause_ms),
            Duration::from_millis(self.discovery_pause_max_ms),
        )
    }

    pub fn limits(&self) -> RotationLimits {
        RotationLimits {
            max_fetch_attempts: self.max_fetch_attempts,
            max_discovery_attempts: self.max_discovery_attempts,
        }
    }
}
