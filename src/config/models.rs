// src/config/models.rs
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HEALTH_CHECK_TIME: u64 = 5;
pub const DEFAULT_STRATEGY: &str = "round_robin";

pub const VALID_STRATEGIES: &[&str] = &["round_robin", "weighted", "least_connections"];

/// Top-level configuration record. Unrecognized fields are rejected at
/// parse time; zero/empty values read as "unset" and take the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub port: u16,

    /// Probe interval in seconds.
    #[serde(default)]
    pub health_check_time: u64,

    #[serde(default)]
    pub strategy: String,

    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub weight: u32,
}

impl Config {
    pub fn apply_defaults(&mut self) {
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.health_check_time == 0 {
            self.health_check_time = DEFAULT_HEALTH_CHECK_TIME;
        }
        if self.strategy.is_empty() {
            self.strategy = DEFAULT_STRATEGY.to_string();
        }

        for backend in &mut self.backends {
            if backend.weight == 0 {
                backend.weight = 1;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be between 1 and 65535");
        }

        if self.health_check_time < 1 {
            anyhow::bail!("health_check_time must be at least 1 second");
        }

        if !VALID_STRATEGIES.contains(&self.strategy.as_str()) {
            anyhow::bail!(
                "unknown strategy: {} (valid: round_robin, weighted, least_connections)",
                self.strategy
            );
        }

        if self.backends.is_empty() {
            anyhow::bail!("at least one backend is required");
        }

        for (i, backend) in self.backends.iter().enumerate() {
            if backend.url.is_empty() {
                anyhow::bail!("backend {}: URL is required", i);
            }
            if backend.weight < 1 {
                anyhow::bail!("backend {}: weight must be at least 1", i);
            }
        }

        Ok(())
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_time)
    }
}
