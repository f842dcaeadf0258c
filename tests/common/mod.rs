//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use aesthetic::prompts::{category_prompts, dimension_prompts};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use shotspot::{
    AestheticError, AestheticScorer, Category, ClipEncoder, Dimension, DimensionSimilarities,
};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SCRIPTED_DIM: usize = 64;

const FIXED: [Dimension; 5] = [
    Dimension::Universal,
    Dimension::Technical,
    Dimension::Composition,
    Dimension::Lighting,
    Dimension::Negative,
];

/// Encoder whose image embedding has an exact, chosen cosine similarity with
/// every prompt of each dimension.
///
/// Images encode to `e0`. A prompt of dimension `d` encodes to
/// `s_d * e0 + sqrt(1 - s_d^2) * e_k`, where `k` is unique per prompt, so each
/// group's mean similarity is exactly `s_d`.
pub struct ScriptedEncoder {
    sims: DimensionSimilarities,
    vocabulary: Vec<&'static str>,
    image_calls: AtomicUsize,
}

impl ScriptedEncoder {
    pub fn new(sims: DimensionSimilarities) -> Self {
        let mut vocabulary: Vec<&'static str> = Vec::new();
        let fixed = FIXED
            .iter()
            .flat_map(|d| dimension_prompts(*d, Category::Other).iter().copied());
        let categories = Category::ALL
            .iter()
            .flat_map(|c| category_prompts(*c).iter().copied());
        for prompt in fixed.chain(categories) {
            if !vocabulary.contains(&prompt) {
                vocabulary.push(prompt);
            }
        }
        assert!(vocabulary.len() < SCRIPTED_DIM, "vocabulary too large");
        Self {
            sims,
            vocabulary,
            image_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `encode_image` calls so far.
    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    fn similarity_for(&self, text: &str) -> f64 {
        for dimension in FIXED {
            if dimension_prompts(dimension, Category::Other).contains(&text) {
                return match dimension {
                    Dimension::Universal => self.sims.universal,
                    Dimension::Technical => self.sims.technical,
                    Dimension::Composition => self.sims.composition,
                    Dimension::Lighting => self.sims.lighting,
                    _ => self.sims.negative,
                };
            }
        }
        self.sims.category
    }
}

impl ClipEncoder for ScriptedEncoder {
    fn model_name(&self) -> &str {
        "scripted-clip"
    }

    fn embedding_dim(&self) -> usize {
        SCRIPTED_DIM
    }

    fn encode_image(&self, image: &DynamicImage) -> Result<Vec<f32>, AestheticError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(AestheticError::Encoding("zero-size image".into()));
        }
        let mut v = vec![0f32; SCRIPTED_DIM];
        v[0] = 1.0;
        Ok(v)
    }

    fn encode_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AestheticError> {
        texts
            .iter()
            .map(|text| {
                let k = self
                    .vocabulary
                    .iter()
                    .position(|p| p == text)
                    .ok_or_else(|| AestheticError::Encoding(format!("unscripted prompt '{text}'")))?
                    + 1;
                let s = self.similarity_for(text);
                let mut v = vec![0f32; SCRIPTED_DIM];
                v[0] = s as f32;
                v[k] = (1.0 - s * s).max(0.0).sqrt() as f32;
                Ok(v)
            })
            .collect()
    }
}

/// Same similarity on every positive dimension, chosen negative similarity.
pub fn uniform(positive: f64, negative: f64) -> DimensionSimilarities {
    DimensionSimilarities {
        universal: positive,
        technical: positive,
        composition: positive,
        lighting: positive,
        category: positive,
        negative,
    }
}

pub fn scripted_scorer(sims: DimensionSimilarities) -> AestheticScorer {
    scripted_with_encoder(sims).1
}

/// Scripted scorer plus a handle on its encoder for call counting.
pub fn scripted_with_encoder(
    sims: DimensionSimilarities,
) -> (Arc<ScriptedEncoder>, AestheticScorer) {
    let encoder = Arc::new(ScriptedEncoder::new(sims));
    let scorer =
        AestheticScorer::with_encoder(encoder.clone()).expect("scripted scorer initializes");
    (encoder, scorer)
}

pub fn gradient_image(width: u32, height: u32, seed: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x as u8).wrapping_mul(3).wrapping_add(seed),
            (y as u8).wrapping_mul(5),
            seed,
        ])
    }))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).expect("encode test image");
    buf.into_inner()
}

pub fn png_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
    encode(&gradient_image(width, height, seed), ImageFormat::Png)
}
