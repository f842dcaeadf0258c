use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::AestheticError;

/// Runtime configuration describing which CLIP model backs the scorer.
///
/// # Example
/// ```no_run
/// use aesthetic::{load_scorer, ScorerConfig};
/// use std::path::PathBuf;
///
/// # async fn run() -> Result<(), aesthetic::AestheticError> {
/// let cfg = ScorerConfig {
///     visual_model_path: PathBuf::from("models/clip-vit-b32/visual.onnx"),
///     text_model_path: PathBuf::from("models/clip-vit-b32/textual.onnx"),
///     tokenizer_path: PathBuf::from("models/clip-vit-b32/tokenizer.json"),
///     ..Default::default()
/// };
/// let scorer = load_scorer(&cfg).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScorerConfig {
    /// Encoder selector: `"onnx"` runs CLIP locally, `"fast"` uses the deterministic stub.
    pub mode: String,
    /// Label reported on every `ScoreBreakdown`.
    pub model_name: String,
    /// Local path of the CLIP image tower (also the download target for
    /// [`visual_model_url`](Self::visual_model_url)).
    pub visual_model_path: PathBuf,
    /// Optional URL fetched when [`visual_model_path`](Self::visual_model_path) is missing.
    pub visual_model_url: Option<String>,
    /// Local path of the CLIP text tower.
    pub text_model_path: PathBuf,
    /// Optional URL fetched when [`text_model_path`](Self::text_model_path) is missing.
    pub text_model_url: Option<String>,
    /// Path to the CLIP BPE `tokenizer.json`.
    pub tokenizer_path: PathBuf,
    /// Optional URL fetched when [`tokenizer_path`](Self::tokenizer_path) is missing.
    pub tokenizer_url: Option<String>,
    /// Width of the shared image/text embedding space (512 for ViT-B/32).
    pub embedding_dim: usize,
    /// Compute device. Only `"cpu"` is wired today; the field keeps configs forward-compatible.
    pub device: String,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            mode: "onnx".into(),
            model_name: "clip-vit-b32".into(),
            visual_model_path: PathBuf::from("./models/clip-vit-b32/visual.onnx"),
            visual_model_url: None,
            text_model_path: PathBuf::from("./models/clip-vit-b32/textual.onnx"),
            text_model_url: None,
            tokenizer_path: PathBuf::from("./models/clip-vit-b32/tokenizer.json"),
            tokenizer_url: None,
            embedding_dim: 512,
            device: "cpu".into(),
        }
    }
}

impl ScorerConfig {
    /// Config for the deterministic stub encoder. Handy for tests and local development.
    pub fn fast() -> Self {
        Self {
            mode: "fast".into(),
            model_name: "stub-clip".into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AestheticError> {
        match self.mode.as_str() {
            "onnx" | "fast" => {}
            other => {
                return Err(AestheticError::InvalidConfig(format!(
                    "unknown scorer mode '{other}' (expected 'onnx' or 'fast')"
                )))
            }
        }
        if self.embedding_dim == 0 {
            return Err(AestheticError::InvalidConfig(
                "embedding_dim must be >= 1".into(),
            ));
        }
        if self.device != "cpu" {
            return Err(AestheticError::InvalidConfig(format!(
                "device '{}' is not supported, only 'cpu'",
                self.device
            )));
        }
        Ok(())
    }
}
