use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL (override with DATABASE_URL)
    pub postgres_url: String,
    /// Pool size; bounds concurrent transfers holding row locks
    #[serde(default = "default_pool_size")]
    pub postgres_pool_size: u32,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Per-request deadline for transfer execution
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_pool_size() -> u32 {
    10
}

/// Push sink endpoint configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PushConfig {
    pub sink_url: String,
    pub timeout_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            sink_url: "http://localhost:9090/publish".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Outbox worker configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutboxConfig {
    pub poll_interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_attempts: 5,
        }
    }
}

impl AppConfig {
    /// Load config from YAML file based on environment
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config: Self =
            serde_yaml::from_str(&content).context("Failed to parse config yaml")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables take precedence over the YAML file
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.postgres_url = url;
        }
        if let Ok(size) = std::env::var("PG_POOL_SIZE") {
            if let Ok(size) = size.parse() {
                self.postgres_pool_size = size;
            }
        }
        if let Ok(url) = std::env::var("PUSH_SINK_URL") {
            self.push.sink_url = url;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.gateway.port = port;
            }
        }
        if let Ok(interval) = std::env::var("OUTBOX_POLL_INTERVAL_SECS") {
            if let Ok(interval) = interval.parse() {
                self.outbox.poll_interval_secs = interval;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = r#"
log_level: info
log_dir: ./logs
log_file: payrail.log
use_json: false
rotation: daily
gateway:
  host: 127.0.0.1
  port: 8080
postgres_url: postgres://localhost/payrail
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.request_timeout_secs, 30);
        assert_eq!(config.postgres_pool_size, 10);
        assert_eq!(config.outbox.poll_interval_secs, 5);
        assert_eq!(config.outbox.max_attempts, 5);
        assert_eq!(config.push.timeout_secs, 30);
    }
}
