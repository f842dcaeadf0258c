use fxhash::{hash64, FxHasher64};
use image::{DynamicImage, GenericImageView};
use std::hash::Hasher;

use crate::encoder::ClipEncoder;
use crate::similarity::l2_normalize_in_place;
use crate::AestheticError;

/// Deterministic stand-in for CLIP used in `"fast"` mode and tests.
/// Generates sinusoid values derived from a hash of the input so identical
/// text or pixels always yield identical unit vectors.
#[derive(Debug, Clone)]
pub struct StubEncoder {
    model_name: String,
    dim: usize,
}

impl StubEncoder {
    pub fn new(model_name: impl Into<String>, dim: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dim,
        }
    }

    fn vector_from_hash(&self, h: u64) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (idx, value) in v.iter_mut().enumerate() {
            *value = ((h >> (idx % 32)) as f32 * 0.0001).sin();
        }
        l2_normalize_in_place(&mut v);
        v
    }
}

impl ClipEncoder for StubEncoder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn encode_image(&self, image: &DynamicImage) -> Result<Vec<f32>, AestheticError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(AestheticError::Encoding(format!(
                "image has zero size ({width}x{height})"
            )));
        }
        let mut hasher = FxHasher64::default();
        hasher.write_u32(width);
        hasher.write_u32(height);
        hasher.write(image.to_rgb8().as_raw());
        Ok(self.vector_from_hash(hasher.finish()))
    }

    fn encode_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AestheticError> {
        Ok(texts
            .iter()
            .map(|text| self.vector_from_hash(hash64(text.as_bytes())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    #[test]
    fn stub_text_is_deterministic() {
        let encoder = StubEncoder::new("stub", 64);
        let a = encoder.encode_texts(&["sharp focus"]).unwrap();
        let b = encoder.encode_texts(&["sharp focus"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);
    }

    #[test]
    fn stub_text_differs_per_prompt() {
        let encoder = StubEncoder::new("stub", 64);
        let out = encoder.encode_texts(&["hello", "world"]).unwrap();
        assert_eq!(out.len(), 2);
        assert_ne!(out[0], out[1]);
    }

    #[test]
    fn stub_vectors_are_unit_length() {
        let encoder = StubEncoder::new("stub", 512);
        let v = encoder.encode_image(&solid(8, 8, [10, 20, 30])).unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm={norm}");
    }

    #[test]
    fn stub_image_depends_on_pixels() {
        let encoder = StubEncoder::new("stub", 32);
        let red = encoder.encode_image(&solid(4, 4, [255, 0, 0])).unwrap();
        let blue = encoder.encode_image(&solid(4, 4, [0, 0, 255])).unwrap();
        let red_again = encoder.encode_image(&solid(4, 4, [255, 0, 0])).unwrap();
        assert_ne!(red, blue);
        assert_eq!(red, red_again);
    }

    #[test]
    fn stub_rejects_zero_size_image() {
        let encoder = StubEncoder::new("stub", 32);
        let err = encoder.encode_image(&solid(0, 0, [0, 0, 0])).unwrap_err();
        assert!(matches!(err, AestheticError::Encoding(_)));
    }

    #[test]
    fn stub_empty_batch() {
        let encoder = StubEncoder::new("stub", 32);
        assert!(encoder.encode_texts(&[]).unwrap().is_empty());
    }
}
