use once_cell::sync::OnceCell;
use std::collections::HashMap;

use crate::encoder::ClipEncoder;
use crate::prompts::{dimension_prompts, PromptGroup};
use crate::types::{Category, Dimension};
use crate::AestheticError;

/// Process-wide store of prompt embeddings, built once from the CLIP text tower.
///
/// The bank is empty until [`initialize`](Self::initialize) succeeds. After that
/// every group is immutable and can be read from any thread without locking.
#[derive(Debug, Default)]
pub struct PromptBank {
    encoded: OnceCell<EncodedPrompts>,
}

#[derive(Debug)]
struct EncodedPrompts {
    model_name: String,
    embedding_dim: usize,
    fixed: HashMap<Dimension, PromptGroup>,
    categories: HashMap<Category, PromptGroup>,
}

const FIXED_DIMENSIONS: [Dimension; 5] = [
    Dimension::Universal,
    Dimension::Technical,
    Dimension::Composition,
    Dimension::Lighting,
    Dimension::Negative,
];

impl PromptBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes every prompt group with `encoder`.
    ///
    /// Only the first successful call does any work; later calls return
    /// immediately without touching the encoder. A failed call leaves the bank
    /// empty so startup can retry or abort.
    pub fn initialize(&self, encoder: &dyn ClipEncoder) -> Result<(), AestheticError> {
        if let Some(existing) = self.encoded.get() {
            if existing.model_name != encoder.model_name() {
                tracing::warn!(
                    bank_model = %existing.model_name,
                    encoder_model = encoder.model_name(),
                    "prompt bank already initialized with a different model"
                );
            }
            return Ok(());
        }

        self.encoded
            .get_or_try_init(|| EncodedPrompts::build(encoder))
            .map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.encoded.get().is_some()
    }

    /// The group for `dimension`. `category` only matters for [`Dimension::Category`];
    /// `None`, `wildlife` and any category without tuned prompts resolve to the generic group.
    pub fn prompts_for(
        &self,
        dimension: Dimension,
        category: Option<Category>,
    ) -> Result<&PromptGroup, AestheticError> {
        let encoded = self.encoded()?;
        let group = match dimension {
            Dimension::Category => {
                let key = category.unwrap_or(Category::Other).prompt_category();
                encoded
                    .categories
                    .get(&key)
                    .or_else(|| encoded.categories.get(&Category::Other))
            }
            fixed => encoded.fixed.get(&fixed),
        };
        group.ok_or_else(|| {
            AestheticError::ModelUnavailable(format!("prompt group '{dimension}' missing"))
        })
    }

    /// The contrastive prompts used for the penalty stage.
    pub fn negative_prompts(&self) -> Result<&PromptGroup, AestheticError> {
        self.prompts_for(Dimension::Negative, None)
    }

    /// All encoded groups: the fixed dimensions first, then one group per tuned category.
    pub fn groups(&self) -> Result<Vec<&PromptGroup>, AestheticError> {
        let encoded = self.encoded()?;
        let mut groups: Vec<&PromptGroup> = FIXED_DIMENSIONS
            .iter()
            .filter_map(|dimension| encoded.fixed.get(dimension))
            .collect();
        groups.extend(
            Category::ALL
                .iter()
                .filter_map(|category| encoded.categories.get(category)),
        );
        Ok(groups)
    }

    /// Name of the model that produced the embeddings, once initialized.
    pub fn model_name(&self) -> Option<&str> {
        self.encoded.get().map(|e| e.model_name.as_str())
    }

    pub fn embedding_dim(&self) -> Option<usize> {
        self.encoded.get().map(|e| e.embedding_dim)
    }

    fn encoded(&self) -> Result<&EncodedPrompts, AestheticError> {
        self.encoded.get().ok_or_else(|| {
            AestheticError::ModelUnavailable("prompt bank not initialized".into())
        })
    }
}

impl EncodedPrompts {
    fn build(encoder: &dyn ClipEncoder) -> Result<Self, AestheticError> {
        let mut fixed = HashMap::with_capacity(FIXED_DIMENSIONS.len());
        for dimension in FIXED_DIMENSIONS {
            let group = encode_group(encoder, dimension, None)?;
            fixed.insert(dimension, group);
        }

        let mut categories = HashMap::new();
        for category in Category::ALL {
            // Categories without tuned prompts share the generic group.
            if category.prompt_category() != category {
                continue;
            }
            let group = encode_group(encoder, Dimension::Category, Some(category))?;
            categories.insert(category, group);
        }

        let embedding_dim = fixed
            .get(&Dimension::Universal)
            .map(PromptGroup::embedding_dim)
            .unwrap_or_default();
        if embedding_dim != encoder.embedding_dim() {
            return Err(AestheticError::ModelUnavailable(format!(
                "text encoder produced {embedding_dim}-dim prompts, expected {}",
                encoder.embedding_dim()
            )));
        }

        let prompt_count: usize = fixed
            .values()
            .chain(categories.values())
            .map(PromptGroup::len)
            .sum();
        tracing::info!(
            model = encoder.model_name(),
            prompts = prompt_count,
            groups = fixed.len() + categories.len(),
            "prompt bank initialized"
        );

        Ok(Self {
            model_name: encoder.model_name().to_string(),
            embedding_dim,
            fixed,
            categories,
        })
    }
}

fn encode_group(
    encoder: &dyn ClipEncoder,
    dimension: Dimension,
    category: Option<Category>,
) -> Result<PromptGroup, AestheticError> {
    let texts = dimension_prompts(dimension, category.unwrap_or(Category::Other));
    let embeddings = encoder.encode_texts(texts).map_err(|e| match e {
        AestheticError::ModelUnavailable(_) => e,
        other => AestheticError::ModelUnavailable(format!(
            "failed to encode '{dimension}' prompts: {other}"
        )),
    })?;
    let prompts = texts.iter().map(|text| text.to_string()).collect();
    PromptGroup::new(dimension, category, prompts, embeddings)
        .map_err(|e| AestheticError::ModelUnavailable(e.to_string()))
}
