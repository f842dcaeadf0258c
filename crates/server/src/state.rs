use crate::config::ServerConfig;
use crate::error::ServerResult;
use aesthetic::AestheticScorer;
use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use shotspot::UploadConfig;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, std::time::Instant)>>,

    /// Scorer with its prompt bank (shared across requests)
    pub scorer: AestheticScorer,

    /// Prometheus render handle, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,

    /// One permit per concurrent scoring job, sized by `scoring_workers`
    pub scoring_slots: Arc<Semaphore>,

    upload: UploadConfig,
}

impl ServerState {
    /// Create new server state around an already loaded scorer
    pub fn new(config: ServerConfig, scorer: AestheticScorer) -> Self {
        let upload = config.upload_config();
        let scoring_slots = Arc::new(Semaphore::new(config.scoring_workers.max(1)));
        Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            scorer,
            metrics: None,
            scoring_slots,
            upload,
        }
    }

    /// Load the configured CLIP model, encode the prompt bank and build the state.
    ///
    /// Fails if the model cannot be loaded; the server must not start without it.
    pub async fn load(config: ServerConfig) -> ServerResult<Self> {
        let scorer = aesthetic::load_scorer(&config.scorer).await?;
        tracing::info!(model = scorer.model_name(), "scorer ready");
        Ok(Self::new(config, scorer))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn upload_config(&self) -> &UploadConfig {
        &self.upload
    }

    /// True once the prompt bank is initialized
    pub fn is_ready(&self) -> bool {
        self.scorer.is_ready()
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = std::time::Instant::now();
        let window = std::time::Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
    pub model_name: String,
    pub embedding_dim: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use aesthetic::StubEncoder;

    fn state(limit: u32) -> ServerState {
        let mut config = ServerConfig {
            rate_limit_per_minute: limit,
            ..Default::default()
        };
        config.api_keys.insert("key-a".into());
        let scorer =
            AestheticScorer::with_encoder(Arc::new(StubEncoder::new("stub", 16))).unwrap();
        ServerState::new(config, scorer)
    }

    #[test]
    fn api_key_lookup() {
        let state = state(10);
        assert!(state.is_valid_api_key("key-a"));
        assert!(!state.is_valid_api_key("key-b"));
        assert!(state.is_ready());
        assert_eq!(state.scoring_slots.available_permits(), 4);
    }

    #[test]
    fn rate_limit_is_per_key() {
        let state = state(2);
        assert!(state.check_rate_limit("key-a"));
        assert!(state.check_rate_limit("key-a"));
        assert!(!state.check_rate_limit("key-a"));
        assert!(state.check_rate_limit("key-b"));
    }

    #[tokio::test]
    async fn load_fast_mode() {
        let config = ServerConfig {
            scorer: aesthetic::ScorerConfig::fast(),
            ..Default::default()
        };
        let state = ServerState::load(config).await.unwrap();
        assert!(state.is_ready());
        assert_eq!(state.upload_config().max_bytes, 10 * 1024 * 1024);
    }
}
