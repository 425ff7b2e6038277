use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_ONEINCH_BASE_URL: &str = "https://api.1inch.dev";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Runtime configuration, read from the process environment (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "listen_host")]
    pub host: String,
    pub port: u16,
    #[serde(rename = "node_env")]
    pub environment: Environment,
    pub oneinch_api_key: Option<String>,
    pub oneinch_base_url: String,
    pub oneinch_timeout_secs: u64,
    pub scheduler_enabled: bool,
    pub scheduler_interval_secs: u64,
    pub seed_demo_data: bool,
    pub log_format: LogFormat,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("listen_host", "0.0.0.0")?
            .set_default("port", 3002)?
            .set_default("node_env", "production")?
            .set_default("oneinch_base_url", DEFAULT_ONEINCH_BASE_URL)?
            .set_default("oneinch_timeout_secs", 10)?
            .set_default("scheduler_enabled", true)?
            .set_default("scheduler_interval_secs", 60)?
            .set_default("seed_demo_data", true)?
            .set_default("log_format", "pretty")?
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("invalid configuration")?;

        if config.oneinch_timeout_secs == 0 {
            anyhow::bail!("ONEINCH_TIMEOUT_SECS must be greater than zero");
        }
        if config.scheduler_interval_secs == 0 {
            anyhow::bail!("SCHEDULER_INTERVAL_SECS must be greater than zero");
        }
        Ok(config)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    /// Error details are only echoed back to clients in development.
    pub fn exposes_error_details(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn oneinch_timeout(&self) -> Duration {
        Duration::from_secs(self.oneinch_timeout_secs)
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            environment: Environment::Production,
            oneinch_api_key: None,
            oneinch_base_url: DEFAULT_ONEINCH_BASE_URL.to_string(),
            oneinch_timeout_secs: 10,
            scheduler_enabled: true,
            scheduler_interval_secs: 60,
            seed_demo_data: true,
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.port, 3002);
        assert_eq!(config.oneinch_base_url, DEFAULT_ONEINCH_BASE_URL);
        assert_eq!(config.oneinch_timeout(), Duration::from_secs(10));
        assert!(!config.exposes_error_details());
    }

    #[test]
    fn only_development_exposes_error_details() {
        let mut config = Config::default();
        config.environment = Environment::Development;
        assert!(config.exposes_error_details());
        config.environment = Environment::Test;
        assert!(!config.exposes_error_details());
    }

    #[test]
    fn socket_addr_combines_host_and_port() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 4000,
            ..Config::default()
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:4000");
    }
}
