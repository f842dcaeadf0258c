//! Shotspot Aesthetic Scoring
//!
//! This crate scores photographs for visual quality. An image goes through the
//! CLIP image tower once, and the resulting vector is compared against banks of
//! hand-tuned text prompts ("sharp focus and excellent exposure", "dramatic light
//! creating visual interest", ...). The similarities are weighted, remapped onto a
//! 30-98 scale and labelled with a quality tier.
//!
//! Two encoders ship in the box:
//!
//! - **ONNX mode** - CLIP ViT-B/32 run locally. Needs the visual and textual
//!   graphs plus `tokenizer.json`; they can be downloaded on first start.
//! - **Fast mode** - Deterministic stub vectors. Great for tests, useless for
//!   judging actual photos.
//!
//! There is no fallback between the two. If the ONNX files are missing you get
//! [`AestheticError::ModelUnavailable`], not a made-up score.
//!
//! ## How a score is made
//!
//! 1. Encode the image.
//! 2. Quick filter: mean similarity to the universal prompts below `0.20` maps
//!    straight onto `[20, 40]` and stops there.
//! 3. Otherwise score universal, technical, composition, lighting and the
//!    category prompts, then combine with [`WEIGHTS`].
//! 4. Remap through three linear bands, subtract a penalty when the image looks
//!    like the negative prompts, clamp to `[30, 98]`.
//!
//! The arithmetic lives in [`scoring`] and is usable without a model via
//! [`score_similarities`].
//!
//! ## Threading notes
//!
//! ONNX sessions are cached per thread. First call on any worker thread does
//! the expensive load. Prompt embeddings are computed once in [`PromptBank`]
//! and shared read-only by every thread after that.
//!
//! ## Quick example
//!
//! ```no_run
//! use aesthetic::{load_scorer, ScorerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let scorer = load_scorer(&ScorerConfig::default()).await.unwrap();
//!     let breakdown = scorer.evaluate_path("photos/dusk.jpg", "sunset").unwrap();
//!     println!("{} ({})", breakdown.aesthetic_score, breakdown.tier);
//! }
//! ```

pub mod config;
pub mod error;
pub mod prompts;
pub mod scoring;
pub mod types;

mod assets;
mod bank;
mod cache;
mod encoder;
mod onnx;
mod preprocess;
mod scorer;
mod similarity;
mod stub;

pub use crate::bank::PromptBank;
pub use crate::config::ScorerConfig;
pub use crate::encoder::{load_encoder, ClipEncoder};
pub use crate::error::AestheticError;
pub use crate::onnx::OnnxClipEncoder;
pub use crate::preprocess::decode_image;
pub use crate::prompts::PromptGroup;
pub use crate::scorer::AestheticScorer;
pub use crate::scoring::{score_similarities, DimensionWeights, WEIGHTS};
pub use crate::similarity::cosine_similarity;
pub use crate::stub::StubEncoder;
pub use crate::types::{
    Category, Dimension, DimensionSimilarities, EvaluationMethod, MappingBand, QualityTier,
    ScoreBreakdown,
};

use std::sync::Arc;

/// Loads the configured encoder, encodes the prompt bank and returns a ready scorer.
///
/// Call once at startup. Any failure here means the process should not accept
/// scoring traffic.
pub async fn load_scorer(cfg: &ScorerConfig) -> Result<AestheticScorer, AestheticError> {
    let encoder = load_encoder(cfg).await?;
    let bank = Arc::new(PromptBank::new());
    bank.initialize(encoder.as_ref())?;
    AestheticScorer::new(encoder, bank)
}
