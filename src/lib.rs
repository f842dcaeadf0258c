//! Workspace umbrella crate for ShotSpot.
//!
//! This crate stitches upload validation, image decoding and aesthetic scoring
//! together so callers can go from raw upload bytes to a [`ScoreBreakdown`]
//! with a single API entry point.

pub mod config;

pub use aesthetic::{
    AestheticError, AestheticScorer, Category, ClipEncoder, Dimension, DimensionSimilarities,
    EvaluationMethod, MappingBand, PromptBank, PromptGroup, QualityTier, ScoreBreakdown,
    ScorerConfig, StubEncoder, decode_image, load_encoder, load_scorer, score_similarities,
};
pub use config::{ConfigLoadError, ShotspotConfig};

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default upper bound on upload size (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A photo as received from the uploader, before any validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUpload {
    pub id: String,
    /// Free-form category label; unknown labels score against the generic prompts.
    pub category: String,
    /// MIME type reported by the client, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Limits applied to uploads before they reach the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
    /// Minimum width and height in pixels.
    pub min_dimension: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            min_dimension: 1,
        }
    }
}

/// A successfully scored upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredUpload {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub breakdown: ScoreBreakdown,
}

/// Upload rejected before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("upload payload is empty")]
    EmptyPayload,
    #[error("upload is {size} bytes, limit is {max}")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("unsupported content type '{0}', expected image/*")]
    UnsupportedContentType(String),
    #[error("image is {width}x{height}, minimum dimension is {min}px")]
    ImageTooSmall { width: u32, height: u32, min: u32 },
}

/// Errors that can occur while processing an upload through the pipeline.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("upload rejected: {0}")]
    Upload(#[from] UploadError),
    #[error("scoring failed: {0}")]
    Aesthetic(#[from] AestheticError),
}

impl PipelineError {
    /// True when the uploader sent something we cannot score, as opposed to a service fault.
    pub fn is_client_error(&self) -> bool {
        match self {
            PipelineError::Upload(_) => true,
            PipelineError::Aesthetic(err) => err.is_request_error(),
        }
    }
}

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_decode(&self, latency: Duration, result: Result<(), PipelineError>);
    fn record_score(&self, latency: Duration, result: Result<QualityTier, AestheticError>);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_decode(self, result: Result<(), PipelineError>) {
        self.recorder.record_decode(self.start.elapsed(), result);
    }

    fn record_score(self, result: Result<QualityTier, AestheticError>) {
        self.recorder.record_score(self.start.elapsed(), result);
    }
}

/// Checks size and content type without touching the image data.
pub fn validate_upload(raw: &RawUpload, cfg: &UploadConfig) -> Result<(), UploadError> {
    if raw.bytes.is_empty() {
        return Err(UploadError::EmptyPayload);
    }
    if raw.bytes.len() > cfg.max_bytes {
        return Err(UploadError::PayloadTooLarge {
            size: raw.bytes.len(),
            max: cfg.max_bytes,
        });
    }
    if let Some(content_type) = raw.content_type.as_deref() {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !essence.starts_with("image/") {
            return Err(UploadError::UnsupportedContentType(content_type.to_string()));
        }
    }
    Ok(())
}

fn decode_upload(raw: &RawUpload, cfg: &UploadConfig) -> Result<DynamicImage, PipelineError> {
    validate_upload(raw, cfg)?;
    let image = decode_image(&raw.bytes)?;
    let (width, height) = image.dimensions();
    if width < cfg.min_dimension || height < cfg.min_dimension {
        return Err(UploadError::ImageTooSmall {
            width,
            height,
            min: cfg.min_dimension,
        }
        .into());
    }
    Ok(image)
}

/// Validate, decode and score one upload.
///
/// Every failure propagates; no fallback score is ever produced. The call
/// blocks on model inference, so async hosts should run it on a blocking worker.
pub fn process_upload(
    raw: RawUpload,
    scorer: &AestheticScorer,
    cfg: &UploadConfig,
) -> Result<ScoredUpload, PipelineError> {
    let mut decode_metrics = MetricsSpan::start();
    let image = match decode_upload(&raw, cfg) {
        Ok(image) => {
            if let Some(span) = decode_metrics.take() {
                span.record_decode(Ok(()));
            }
            image
        }
        Err(err) => {
            tracing::debug!(upload = %raw.id, error = %err, "upload rejected");
            if let Some(span) = decode_metrics.take() {
                span.record_decode(Err(err.clone()));
            }
            return Err(err);
        }
    };

    let mut score_metrics = MetricsSpan::start();
    let breakdown = match scorer.evaluate(&image, &raw.category) {
        Ok(breakdown) => {
            if let Some(span) = score_metrics.take() {
                span.record_score(Ok(breakdown.tier));
            }
            breakdown
        }
        Err(err) => {
            if let Some(span) = score_metrics.take() {
                span.record_score(Err(err.clone()));
            }
            return Err(PipelineError::Aesthetic(err));
        }
    };

    let (width, height) = image.dimensions();
    Ok(ScoredUpload {
        id: raw.id,
        width,
        height,
        breakdown,
    })
}

/// Convenience helper that scores `bytes` with default upload limits.
pub fn score_bytes(
    id: &str,
    category: &str,
    bytes: Vec<u8>,
    scorer: &AestheticScorer,
) -> Result<ScoredUpload, PipelineError> {
    let raw = RawUpload {
        id: id.to_string(),
        category: category.to_string(),
        content_type: None,
        bytes,
    };
    process_upload(raw, scorer, &UploadConfig::default())
}
