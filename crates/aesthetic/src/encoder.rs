use image::DynamicImage;
use std::sync::Arc;

use crate::assets::resolve_model_assets;
use crate::onnx::OnnxClipEncoder;
use crate::stub::StubEncoder;
use crate::{AestheticError, ScorerConfig};

/// A dual encoder mapping images and text into one embedding space where cosine
/// similarity is meaningful.
///
/// Implementations must be safe to call from many threads at once. If the
/// underlying runtime is not re-entrant, the implementation serializes or
/// shards access itself.
pub trait ClipEncoder: Send + Sync {
    /// Model identifier reported on every breakdown.
    fn model_name(&self) -> &str;

    /// Width of the shared embedding space.
    fn embedding_dim(&self) -> usize;

    /// Encode one decoded image.
    fn encode_image(&self, image: &DynamicImage) -> Result<Vec<f32>, AestheticError>;

    /// Encode a batch of prompts, one vector per input, in order.
    fn encode_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AestheticError>;
}

/// Builds the encoder selected by `cfg.mode`.
///
/// In `"onnx"` mode missing model files are a hard [`AestheticError::ModelUnavailable`];
/// there is no silent fallback to the stub.
pub async fn load_encoder(cfg: &ScorerConfig) -> Result<Arc<dyn ClipEncoder>, AestheticError> {
    cfg.validate()?;
    match cfg.mode.as_str() {
        "fast" => Ok(Arc::new(StubEncoder::new(&cfg.model_name, cfg.embedding_dim))),
        _ => {
            let assets = resolve_model_assets(cfg).await?;
            let encoder = OnnxClipEncoder::load(assets, &cfg.model_name, cfg.embedding_dim)?;
            Ok(Arc::new(encoder))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn fast_mode_builds_stub() {
        let cfg = ScorerConfig::fast();
        let encoder = load_encoder(&cfg).await.unwrap();
        assert_eq!(encoder.model_name(), "stub-clip");
        assert_eq!(encoder.embedding_dim(), 512);
    }

    #[tokio::test]
    async fn onnx_mode_without_assets_is_unavailable() {
        let cfg = ScorerConfig {
            visual_model_path: PathBuf::from("./missing/visual.onnx"),
            text_model_path: PathBuf::from("./missing/textual.onnx"),
            tokenizer_path: PathBuf::from("./missing/tokenizer.json"),
            ..Default::default()
        };
        let err = load_encoder(&cfg).await.err().expect("assets are missing");
        assert!(matches!(err, AestheticError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn invalid_mode_is_rejected_before_loading() {
        let cfg = ScorerConfig {
            mode: "remote".into(),
            ..Default::default()
        };
        let err = load_encoder(&cfg).await.err().unwrap();
        assert!(matches!(err, AestheticError::InvalidConfig(_)));
    }
}
