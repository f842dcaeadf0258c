//! Prometheus wiring: recorder installation and the pipeline metrics observer.

use aesthetic::{AestheticError, QualityTier};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shotspot::{PipelineError, PipelineMetrics};
use std::time::Duration;

/// Installs the global Prometheus recorder. Call at most once per process.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

/// Forwards pipeline stage timings to the `metrics` facade.
#[derive(Debug, Default)]
pub struct PrometheusPipelineMetrics;

impl PipelineMetrics for PrometheusPipelineMetrics {
    fn record_decode(&self, latency: Duration, result: Result<(), PipelineError>) {
        let outcome = match &result {
            Ok(()) => "ok",
            Err(err) if err.is_client_error() => "rejected",
            Err(_) => "error",
        };
        metrics::histogram!("shotspot_decode_seconds", "outcome" => outcome)
            .record(latency.as_secs_f64());
    }

    fn record_score(&self, latency: Duration, result: Result<QualityTier, AestheticError>) {
        match result {
            Ok(tier) => {
                metrics::histogram!("shotspot_score_seconds").record(latency.as_secs_f64());
                metrics::counter!("shotspot_scores_total", "tier" => tier.as_str()).increment(1);
            }
            Err(_) => {
                metrics::counter!("shotspot_score_failures_total").increment(1);
            }
        }
    }
}

/// `route` is the matched route template, never the raw path.
pub(crate) fn record_http_request(method: &str, route: &str, status: u16, latency: Duration) {
    metrics::counter!(
        "shotspot_http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("shotspot_http_request_seconds", "route" => route.to_string())
        .record(latency.as_secs_f64());
}

pub(crate) fn record_auth_rejection(reason: &'static str) {
    metrics::counter!("shotspot_auth_rejections_total", "reason" => reason).increment(1);
}

pub(crate) fn record_scoring_timeout() {
    metrics::counter!("shotspot_scoring_timeouts_total").increment(1);
}
