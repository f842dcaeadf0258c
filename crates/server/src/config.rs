use aesthetic::ScorerConfig;
use serde::{Deserialize, Serialize};
use shotspot::UploadConfig;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Budget for one scoring call; exceeding it fails the upload
    #[serde(default = "default_scoring_timeout_secs")]
    pub scoring_timeout_secs: u64,

    /// Uploads scored at the same time; each worker thread holds its own model copy
    #[serde(default = "default_scoring_workers")]
    pub scoring_workers: usize,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Smallest accepted image width/height in pixels
    #[serde(default = "default_min_image_dimension")]
    pub min_image_dimension: u32,

    /// Rate limit: requests per minute per API key
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// API keys for authentication (in production, use a database)
    #[serde(default)]
    pub api_keys: HashSet<String>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// CLIP model selection
    #[serde(default)]
    pub scorer: ScorerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            scoring_timeout_secs: default_scoring_timeout_secs(),
            scoring_workers: default_scoring_workers(),
            max_body_size_mb: default_max_body_size_mb(),
            min_image_dimension: default_min_image_dimension(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            api_keys: HashSet::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            scorer: ScorerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `server.{toml,yaml,json}` and `SHOTSPOT_SERVER__*` variables
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("SHOTSPOT_SERVER").separator("__"));

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;

        // Add demo API key if none configured (for development)
        if config.api_keys.is_empty() {
            tracing::warn!("No API keys configured, using demo key 'demo-key-12345'");
            config.api_keys.insert("demo-key-12345".to_string());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scoring_timeout_secs == 0 {
            anyhow::bail!("scoring_timeout_secs must be >= 1");
        }
        if self.scoring_workers == 0 {
            anyhow::bail!("scoring_workers must be >= 1");
        }
        if self.max_body_size_mb == 0 {
            anyhow::bail!("max_body_size_mb must be >= 1");
        }
        self.scorer.validate()?;
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_secs(self.scoring_timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    /// Upload limits handed to the scoring pipeline
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            max_bytes: self.max_body_size(),
            min_dimension: self.min_image_dimension,
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_scoring_timeout_secs() -> u64 {
    30
}

fn default_scoring_workers() -> usize {
    4
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_min_image_dimension() -> u32 {
    1
}

fn default_rate_limit_per_minute() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout_secs, 60);
        assert_eq!(cfg.scoring_timeout_secs, 30);
        assert_eq!(cfg.scoring_workers, 4);
        assert_eq!(cfg.max_body_size_mb, 10);
        assert_eq!(cfg.rate_limit_per_minute, 100);
        assert!(cfg.enable_cors);
        assert!(cfg.metrics_enabled);
        assert_eq!(cfg.scorer.mode, "onnx");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_upload_config_follows_body_limit() {
        let cfg = ServerConfig {
            max_body_size_mb: 2,
            min_image_dimension: 64,
            ..Default::default()
        };
        let upload = cfg.upload_config();
        assert_eq!(upload.max_bytes, 2 * 1024 * 1024);
        assert_eq!(upload.min_dimension, 64);
    }

    #[test]
    fn test_validate_rejects_zero_scoring_timeout() {
        let cfg = ServerConfig {
            scoring_timeout_secs: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_scoring_workers() {
        let cfg = ServerConfig {
            scoring_workers: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg: ServerConfig = serde_json::from_str(r#"{"scoring_workers": 2}"#).unwrap();
        assert_eq!(cfg.scoring_workers, 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_nested_scorer_config_deserializes() {
        let cfg: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "scorer": {"mode": "fast"}}"#).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.scorer.mode, "fast");
        assert_eq!(cfg.scorer.embedding_dim, 512);
        assert_eq!(cfg.scoring_timeout_secs, 30);
    }
}
