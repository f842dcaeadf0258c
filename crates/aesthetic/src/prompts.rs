//! Static prompt taxonomy and the `PromptGroup` that pairs prompts with their
//! text embeddings.
//!
//! The wording is empirically tuned against CLIP ViT-B/32; changing a prompt
//! shifts the whole score distribution.

use crate::similarity::{l2_normalize_in_place, mean_similarity};
use crate::types::{Category, Dimension};
use crate::AestheticError;

pub const UNIVERSAL_PROMPTS: &[&str] = &[
    "a high quality professional photograph",
    "an aesthetically pleasing image with good composition",
];

pub const TECHNICAL_PROMPTS: &[&str] = &[
    "sharp focus and excellent exposure",
    "professional color grading and contrast",
];

pub const COMPOSITION_PROMPTS: &[&str] = &[
    "well-balanced composition with strong visual structure",
    "compelling framing following photographic principles",
];

pub const LIGHTING_PROMPTS: &[&str] = &[
    "beautiful natural lighting with great atmosphere",
    "dramatic light creating visual interest",
];

pub const NEGATIVE_PROMPTS: &[&str] = &[
    "a poorly composed photograph with bad framing",
    "a blurry low-quality image with poor exposure",
];

const LANDSCAPE_PROMPTS: &[&str] = &[
    "a stunning landscape photograph with dramatic scenery",
    "breathtaking natural vista with excellent depth",
];

const CITYSCAPE_PROMPTS: &[&str] = &[
    "an impressive urban photograph with compelling architecture",
    "striking city skyline with great composition",
];

const ARCHITECTURE_PROMPTS: &[&str] = &[
    "beautiful architectural photography with clean lines",
    "well-composed building photograph with strong geometry",
];

const NATURE_PROMPTS: &[&str] = &[
    "captivating nature photography with vibrant details",
    "beautiful natural scene with excellent clarity",
];

const SUNSET_PROMPTS: &[&str] = &[
    "breathtaking sunset photograph with stunning colors",
    "beautiful golden hour scene with dramatic sky",
];

const NIGHT_PROMPTS: &[&str] = &[
    "impressive night photography with excellent exposure",
    "stunning low-light photograph with great atmosphere",
];

const GENERIC_PROMPTS: &[&str] = &[
    "an interesting and well-executed photograph",
    "compelling photography with strong visual appeal",
];

/// Category-specific prompts. Categories without tuned prompts get the generic set.
pub fn category_prompts(category: Category) -> &'static [&'static str] {
    match category.prompt_category() {
        Category::Landscape => LANDSCAPE_PROMPTS,
        Category::Cityscape => CITYSCAPE_PROMPTS,
        Category::Architecture => ARCHITECTURE_PROMPTS,
        Category::Nature => NATURE_PROMPTS,
        Category::Sunset => SUNSET_PROMPTS,
        Category::Night => NIGHT_PROMPTS,
        Category::Wildlife | Category::Other => GENERIC_PROMPTS,
    }
}

/// Prompt text for `dimension`. `category` is only consulted for [`Dimension::Category`].
pub fn dimension_prompts(dimension: Dimension, category: Category) -> &'static [&'static str] {
    match dimension {
        Dimension::Universal => UNIVERSAL_PROMPTS,
        Dimension::Technical => TECHNICAL_PROMPTS,
        Dimension::Composition => COMPOSITION_PROMPTS,
        Dimension::Lighting => LIGHTING_PROMPTS,
        Dimension::Category => category_prompts(category),
        Dimension::Negative => NEGATIVE_PROMPTS,
    }
}

/// An immutable set of prompts for one dimension with one unit-length embedding per prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptGroup {
    dimension: Dimension,
    category: Option<Category>,
    prompts: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

impl PromptGroup {
    pub fn new(
        dimension: Dimension,
        category: Option<Category>,
        prompts: Vec<String>,
        mut embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, AestheticError> {
        if prompts.is_empty() {
            return Err(AestheticError::InvalidConfig(format!(
                "prompt group '{dimension}' has no prompts"
            )));
        }
        if prompts.len() != embeddings.len() {
            return Err(AestheticError::Inference(format!(
                "prompt group '{dimension}' has {} prompts but {} embeddings",
                prompts.len(),
                embeddings.len()
            )));
        }
        let dim = embeddings[0].len();
        if dim == 0 || embeddings.iter().any(|e| e.len() != dim) {
            return Err(AestheticError::Inference(format!(
                "prompt group '{dimension}' has inconsistent embedding widths"
            )));
        }
        for embedding in &mut embeddings {
            l2_normalize_in_place(embedding);
        }
        Ok(Self {
            dimension,
            category,
            prompts,
            embeddings,
        })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Set only for category-specific groups.
    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn embedding_dim(&self) -> usize {
        self.embeddings[0].len()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Mean cosine similarity of `image_embedding` against every prompt in the group.
    pub fn mean_similarity(&self, image_embedding: &[f32]) -> f64 {
        mean_similarity(image_embedding, &self.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_prompts() {
        for category in Category::ALL {
            let prompts = category_prompts(category);
            assert!(!prompts.is_empty(), "{category} has no prompts");
        }
    }

    #[test]
    fn unmapped_categories_share_generic_prompts() {
        assert_eq!(category_prompts(Category::Wildlife), GENERIC_PROMPTS);
        assert_eq!(category_prompts(Category::Other), GENERIC_PROMPTS);
        assert_ne!(category_prompts(Category::Landscape), GENERIC_PROMPTS);
    }

    #[test]
    fn dimension_prompts_ignore_category_for_fixed_dimensions() {
        assert_eq!(
            dimension_prompts(Dimension::Technical, Category::Night),
            dimension_prompts(Dimension::Technical, Category::Sunset)
        );
        assert_eq!(
            dimension_prompts(Dimension::Category, Category::Sunset)[0],
            "breathtaking sunset photograph with stunning colors"
        );
        assert_eq!(dimension_prompts(Dimension::Negative, Category::Other), NEGATIVE_PROMPTS);
    }

    #[test]
    fn group_normalizes_embeddings() {
        let group = PromptGroup::new(
            Dimension::Lighting,
            None,
            vec!["a".into(), "b".into()],
            vec![vec![3.0, 4.0], vec![0.0, 2.0]],
        )
        .unwrap();

        assert_eq!(group.len(), 2);
        assert_eq!(group.embedding_dim(), 2);
        for embedding in group.embeddings() {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn group_rejects_count_mismatch() {
        let err = PromptGroup::new(
            Dimension::Universal,
            None,
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 0.0]],
        )
        .unwrap_err();
        assert!(err.to_string().contains("2 prompts but 1 embeddings"));
    }

    #[test]
    fn group_rejects_ragged_embeddings() {
        let result = PromptGroup::new(
            Dimension::Universal,
            None,
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 0.0], vec![1.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn group_mean_similarity() {
        let group = PromptGroup::new(
            Dimension::Negative,
            None,
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
        assert!((group.mean_similarity(&[1.0, 0.0]) - 0.5).abs() < 1e-12);
    }
}
