use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;

use crate::bank::PromptBank;
use crate::encoder::ClipEncoder;
use crate::preprocess::{decode_image, ensure_non_empty};
use crate::scoring::{detailed_breakdown, quick_breakdown, quick_filter};
use crate::similarity::ensure_finite;
use crate::types::{Category, Dimension, DimensionSimilarities, ScoreBreakdown};
use crate::AestheticError;

/// Turns one decoded image and a category label into a [`ScoreBreakdown`].
///
/// Cloning is cheap: the encoder and the prompt bank are shared behind `Arc`s
/// and are read-only once the bank is initialized.
#[derive(Clone)]
pub struct AestheticScorer {
    encoder: Arc<dyn ClipEncoder>,
    bank: Arc<PromptBank>,
}

impl std::fmt::Debug for AestheticScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AestheticScorer")
            .field("model_name", &self.encoder.model_name())
            .field("bank_initialized", &self.bank.is_initialized())
            .finish()
    }
}

impl AestheticScorer {
    /// Pairs an encoder with a prompt bank.
    ///
    /// The bank may still be empty; `evaluate` then fails with
    /// [`AestheticError::ModelUnavailable`]. If it is already initialized it must
    /// have been built by the same model, otherwise image and prompt vectors
    /// would live in different spaces.
    pub fn new(
        encoder: Arc<dyn ClipEncoder>,
        bank: Arc<PromptBank>,
    ) -> Result<Self, AestheticError> {
        check_compatible(encoder.as_ref(), &bank)?;
        Ok(Self { encoder, bank })
    }

    /// Builds a fresh bank from `encoder` and wraps both in a scorer.
    pub fn with_encoder(encoder: Arc<dyn ClipEncoder>) -> Result<Self, AestheticError> {
        let bank = Arc::new(PromptBank::new());
        bank.initialize(encoder.as_ref())?;
        Self::new(encoder, bank)
    }

    pub fn bank(&self) -> &Arc<PromptBank> {
        &self.bank
    }

    pub fn encoder(&self) -> &Arc<dyn ClipEncoder> {
        &self.encoder
    }

    pub fn model_name(&self) -> &str {
        self.encoder.model_name()
    }

    pub fn is_ready(&self) -> bool {
        self.bank.is_initialized()
    }

    /// Scores `image` for the given category label.
    ///
    /// The image is encoded exactly once. Images whose universal similarity
    /// falls below the quick-filter threshold skip the remaining prompt groups.
    /// Unknown category labels score against the generic prompts.
    ///
    /// Blocking: the call runs the image tower synchronously. Async hosts should
    /// run it on a blocking worker.
    pub fn evaluate(
        &self,
        image: &DynamicImage,
        category: &str,
    ) -> Result<ScoreBreakdown, AestheticError> {
        // Checked before encoding so an unusable bank never costs an inference.
        self.ensure_bank_ready()?;
        ensure_non_empty(image)?;

        let embedding = self.encoder.encode_image(image)?;
        self.evaluate_embedding(&embedding, Category::from_label(category))
    }

    /// Runs stages 2-6 against an image embedding produced by the same model.
    pub fn evaluate_embedding(
        &self,
        embedding: &[f32],
        category: Category,
    ) -> Result<ScoreBreakdown, AestheticError> {
        self.ensure_bank_ready()?;
        ensure_finite(embedding, "image embedding")?;
        let universal_group = self.bank.prompts_for(Dimension::Universal, None)?;
        if embedding.len() != universal_group.embedding_dim() {
            return Err(AestheticError::Encoding(format!(
                "image embedding has {} dims, prompt bank expects {}",
                embedding.len(),
                universal_group.embedding_dim()
            )));
        }

        let category = category.prompt_category();
        let model_name = self.encoder.model_name();
        let universal = universal_group.mean_similarity(embedding);

        if let Some(mapped) = quick_filter(universal) {
            tracing::debug!(universal, score = mapped, "quick filter rejected image");
            return Ok(quick_breakdown(universal, mapped, category, model_name));
        }

        let similarity = |dimension: Dimension| -> Result<f64, AestheticError> {
            Ok(self
                .bank
                .prompts_for(dimension, Some(category))?
                .mean_similarity(embedding))
        };
        let sims = DimensionSimilarities {
            universal,
            technical: similarity(Dimension::Technical)?,
            composition: similarity(Dimension::Composition)?,
            lighting: similarity(Dimension::Lighting)?,
            category: similarity(Dimension::Category)?,
            negative: self.bank.negative_prompts()?.mean_similarity(embedding),
        };

        let breakdown = detailed_breakdown(&sims, category, model_name);
        tracing::debug!(
            weighted = breakdown.weighted_raw,
            mapped = breakdown.mapped_score,
            penalty = breakdown.negative_penalty,
            score = breakdown.aesthetic_score,
            "detailed analysis complete"
        );
        Ok(breakdown)
    }

    /// The bank may have been filled after construction, so compatibility is
    /// re-checked on every call.
    fn ensure_bank_ready(&self) -> Result<(), AestheticError> {
        if !self.bank.is_initialized() {
            return Err(AestheticError::ModelUnavailable(
                "prompt bank not initialized".into(),
            ));
        }
        check_compatible(self.encoder.as_ref(), &self.bank)
    }

    /// Decodes an uploaded JPEG/PNG/WebP buffer, then [`evaluate`](Self::evaluate)s it.
    pub fn evaluate_bytes(
        &self,
        bytes: &[u8],
        category: &str,
    ) -> Result<ScoreBreakdown, AestheticError> {
        let image = decode_image(bytes)?;
        self.evaluate(&image, category)
    }

    /// Reads and decodes an image file, then [`evaluate`](Self::evaluate)s it.
    pub fn evaluate_path(
        &self,
        path: impl AsRef<Path>,
        category: &str,
    ) -> Result<ScoreBreakdown, AestheticError> {
        let bytes = std::fs::read(path.as_ref())?;
        self.evaluate_bytes(&bytes, category)
    }
}

/// An initialized bank must come from the same model and width as `encoder`,
/// otherwise image and prompt vectors live in different spaces.
fn check_compatible(encoder: &dyn ClipEncoder, bank: &PromptBank) -> Result<(), AestheticError> {
    if let Some(bank_model) = bank.model_name() {
        if bank_model != encoder.model_name() {
            return Err(AestheticError::InvalidConfig(format!(
                "prompt bank built with '{bank_model}' but encoder is '{}'",
                encoder.model_name()
            )));
        }
    }
    if let Some(dim) = bank.embedding_dim() {
        if dim != encoder.embedding_dim() {
            return Err(AestheticError::InvalidConfig(format!(
                "prompt bank holds {dim}-dim embeddings but encoder produces {}",
                encoder.embedding_dim()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubEncoder;
    use crate::types::EvaluationMethod;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub encoder that counts image encodes and can return a fixed embedding.
    struct RecordingEncoder {
        inner: StubEncoder,
        image: Option<Vec<f32>>,
        image_calls: AtomicUsize,
    }

    impl RecordingEncoder {
        fn new(image: Option<Vec<f32>>) -> Self {
            Self {
                inner: StubEncoder::new("stub", 64),
                image,
                image_calls: AtomicUsize::new(0),
            }
        }

        fn image_calls(&self) -> usize {
            self.image_calls.load(Ordering::SeqCst)
        }
    }

    impl ClipEncoder for RecordingEncoder {
        fn model_name(&self) -> &str {
            self.inner.model_name()
        }

        fn embedding_dim(&self) -> usize {
            self.inner.embedding_dim()
        }

        fn encode_image(&self, image: &DynamicImage) -> Result<Vec<f32>, AestheticError> {
            self.image_calls.fetch_add(1, Ordering::SeqCst);
            match &self.image {
                Some(fixed) => Ok(fixed.clone()),
                None => self.inner.encode_image(image),
            }
        }

        fn encode_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AestheticError> {
            self.inner.encode_texts(texts)
        }
    }

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    fn stub_scorer() -> AestheticScorer {
        AestheticScorer::with_encoder(Arc::new(StubEncoder::new("stub", 64))).unwrap()
    }

    #[test]
    fn uninitialized_bank_fails_before_encoding() {
        let scorer = AestheticScorer::new(
            Arc::new(StubEncoder::new("stub", 64)),
            Arc::new(PromptBank::new()),
        )
        .unwrap();
        assert!(!scorer.is_ready());
        let err = scorer.evaluate(&solid(4, 4, [1, 2, 3]), "landscape").unwrap_err();
        assert!(matches!(err, AestheticError::ModelUnavailable(_)));
    }

    #[test]
    fn uninitialized_bank_never_encodes_the_image() {
        let encoder = Arc::new(RecordingEncoder::new(None));
        let scorer = AestheticScorer::new(encoder.clone(), Arc::new(PromptBank::new())).unwrap();

        for _ in 0..3 {
            let err = scorer.evaluate(&solid(8, 8, [9, 9, 9]), "sunset").unwrap_err();
            assert!(matches!(err, AestheticError::ModelUnavailable(_)));
        }
        assert_eq!(encoder.image_calls(), 0);
    }

    #[test]
    fn each_evaluation_encodes_the_image_once() {
        let encoder = Arc::new(RecordingEncoder::new(None));
        let scorer = AestheticScorer::with_encoder(encoder.clone()).unwrap();

        scorer.evaluate(&solid(8, 8, [120, 60, 30]), "landscape").unwrap();
        assert_eq!(encoder.image_calls(), 1);
        scorer.evaluate(&solid(8, 8, [120, 60, 30]), "landscape").unwrap();
        assert_eq!(encoder.image_calls(), 2);
    }

    #[test]
    fn bank_filled_by_another_model_after_construction_is_rejected() {
        let bank = Arc::new(PromptBank::new());
        let encoder = Arc::new(RecordingEncoder::new(None));
        let scorer = AestheticScorer::new(encoder.clone(), bank.clone()).unwrap();

        bank.initialize(&StubEncoder::new("stub-other", 64)).unwrap();
        let err = scorer.evaluate(&solid(4, 4, [1, 2, 3]), "other").unwrap_err();
        assert!(matches!(err, AestheticError::InvalidConfig(_)), "{err:?}");
        assert_eq!(encoder.image_calls(), 0);

        let narrow = Arc::new(PromptBank::new());
        let scorer = AestheticScorer::new(encoder, narrow.clone()).unwrap();
        narrow.initialize(&StubEncoder::new("stub", 32)).unwrap();
        let err = scorer
            .evaluate_embedding(&[0.5; 64], Category::Other)
            .unwrap_err();
        assert!(matches!(err, AestheticError::InvalidConfig(_)), "{err:?}");
    }

    #[test]
    fn non_finite_embeddings_are_encoding_errors() {
        let scorer = stub_scorer();
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut embedding = vec![0.1f32; 64];
            embedding[17] = bad;
            let err = scorer
                .evaluate_embedding(&embedding, Category::Landscape)
                .unwrap_err();
            assert!(matches!(err, AestheticError::Encoding(_)), "{bad}: {err:?}");
        }

        let mut poisoned = vec![0.2f32; 64];
        poisoned[0] = f32::NAN;
        let scorer =
            AestheticScorer::with_encoder(Arc::new(RecordingEncoder::new(Some(poisoned)))).unwrap();
        let err = scorer.evaluate(&solid(6, 6, [5, 5, 5]), "night").unwrap_err();
        assert!(matches!(err, AestheticError::Encoding(_)));
        assert!(err.is_request_error());
    }

    #[test]
    fn mismatched_bank_is_rejected() {
        let bank = Arc::new(PromptBank::new());
        bank.initialize(&StubEncoder::new("stub-a", 64)).unwrap();

        let other_model = AestheticScorer::new(Arc::new(StubEncoder::new("stub-b", 64)), bank.clone());
        assert!(matches!(other_model, Err(AestheticError::InvalidConfig(_))));

        let other_dim = AestheticScorer::new(Arc::new(StubEncoder::new("stub-a", 32)), bank);
        assert!(matches!(other_dim, Err(AestheticError::InvalidConfig(_))));
    }

    #[test]
    fn score_is_in_range_and_tier_matches() {
        let scorer = stub_scorer();
        for rgb in [[0, 0, 0], [255, 255, 255], [12, 200, 90], [250, 120, 10]] {
            let breakdown = scorer.evaluate(&solid(32, 24, rgb), "sunset").unwrap();
            assert!((30.0..=98.0).contains(&breakdown.aesthetic_score));
            assert_eq!(
                breakdown.tier,
                crate::QualityTier::from_score(breakdown.aesthetic_score)
            );
            assert_eq!(breakdown.model_name, "stub");
            match breakdown.method {
                EvaluationMethod::Quick => assert!(breakdown.technical_raw.is_none()),
                EvaluationMethod::Detailed => assert!(breakdown.weighted_raw.is_some()),
            }
        }
    }

    #[test]
    fn evaluate_is_deterministic() {
        let scorer = stub_scorer();
        let image = solid(16, 16, [90, 60, 30]);
        let a = scorer.evaluate(&image, "night").unwrap();
        let b = scorer.evaluate(&image, "night").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_category_reports_fallback() {
        let scorer = stub_scorer();
        let breakdown = scorer.evaluate(&solid(8, 8, [5, 5, 5]), "underwater").unwrap();
        assert_eq!(breakdown.category, Category::Other);
        let wildlife = scorer.evaluate(&solid(8, 8, [5, 5, 5]), "wildlife").unwrap();
        assert_eq!(wildlife.category, Category::Other);
    }

    #[test]
    fn zero_size_image_is_encoding_error() {
        let scorer = stub_scorer();
        let err = scorer.evaluate(&solid(0, 5, [0, 0, 0]), "other").unwrap_err();
        assert!(matches!(err, AestheticError::Encoding(_)));
    }

    #[test]
    fn embedding_width_is_checked() {
        let scorer = stub_scorer();
        let err = scorer
            .evaluate_embedding(&[1.0, 0.0, 0.0], Category::Landscape)
            .unwrap_err();
        assert!(matches!(err, AestheticError::Encoding(_)));
    }

    #[test]
    fn evaluate_bytes_decodes_png() {
        let scorer = stub_scorer();
        let image = solid(10, 10, [40, 80, 120]);
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();

        let from_bytes = scorer.evaluate_bytes(buf.get_ref(), "cityscape").unwrap();
        let direct = scorer.evaluate(&image, "cityscape").unwrap();
        assert_eq!(from_bytes, direct);

        let err = scorer.evaluate_bytes(b"not an image", "cityscape").unwrap_err();
        assert!(matches!(err, AestheticError::Encoding(_)));
    }

    #[test]
    fn evaluate_path_reads_file() {
        let scorer = stub_scorer();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        solid(6, 9, [200, 10, 10]).save(&path).unwrap();

        let breakdown = scorer.evaluate_path(&path, "architecture").unwrap();
        assert_eq!(breakdown.category, Category::Architecture);

        let missing = scorer.evaluate_path(dir.path().join("nope.png"), "architecture");
        assert!(matches!(missing, Err(AestheticError::Io(_))));
    }
}
