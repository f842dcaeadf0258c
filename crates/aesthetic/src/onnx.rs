use image::DynamicImage;
use onnxruntime::ndarray::{Array, Array2, Array4};
use onnxruntime::session::Session;
use std::cell::RefCell;
use tokenizers::Tokenizer;

use crate::assets::ModelAssets;
use crate::cache::get_or_load_clip;
use crate::encoder::ClipEncoder;
use crate::preprocess::clip_pixel_values;
use crate::similarity::ensure_finite;
use crate::AestheticError;

/// CLIP text context length; prompts are truncated and padded to it.
const CONTEXT_LENGTH: usize = 77;

/// CLIP encoder backed by two ONNX graphs (image tower and text tower).
///
/// Sessions live in a per-thread cache, so the first call on a worker thread
/// pays the load cost and later calls reuse that thread's handle.
#[derive(Debug)]
pub struct OnnxClipEncoder {
    assets: ModelAssets,
    model_name: String,
    dim: usize,
}

impl OnnxClipEncoder {
    pub(crate) fn load(
        assets: ModelAssets,
        model_name: &str,
        dim: usize,
    ) -> Result<Self, AestheticError> {
        // Load once on the calling thread so a broken model fails at startup.
        get_or_load_clip(&assets)?;
        tracing::info!(
            model = model_name,
            visual = %assets.visual_model_path.display(),
            textual = %assets.text_model_path.display(),
            "CLIP model loaded"
        );
        Ok(Self {
            assets,
            model_name: model_name.to_string(),
            dim,
        })
    }

    fn check_width(&self, vector: &[f32]) -> Result<(), AestheticError> {
        if vector.len() != self.dim {
            return Err(AestheticError::InvalidConfig(format!(
                "model produced {}-dim embeddings, config expects {}",
                vector.len(),
                self.dim
            )));
        }
        Ok(())
    }
}

impl ClipEncoder for OnnxClipEncoder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn encode_image(&self, image: &DynamicImage) -> Result<Vec<f32>, AestheticError> {
        let pixels = clip_pixel_values(image)?;
        let handle = get_or_load_clip(&self.assets)?;
        let vectors = run_visual(&handle.visual, pixels)?;
        let vector = single_image_embedding(vectors)?;
        self.check_width(&vector)?;
        Ok(vector)
    }

    fn encode_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AestheticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let handle = get_or_load_clip(&self.assets)?;
        let encoded = encode_prompts(&handle.tokenizer, texts)?;
        let (input_ids, attn_mask) = build_padded_arrays(encoded)?;
        let vectors = run_textual(&handle.textual, input_ids, attn_mask)?;
        if vectors.len() != texts.len() {
            return Err(AestheticError::Inference(format!(
                "text tower returned {} embeddings for {} prompts",
                vectors.len(),
                texts.len()
            )));
        }
        for vector in &vectors {
            self.check_width(vector)?;
        }
        Ok(vectors)
    }
}

struct EncodedPrompt {
    ids: Vec<i64>,
    mask: Vec<i64>,
}

fn encode_prompts(tokenizer: &Tokenizer, texts: &[&str]) -> Result<Vec<EncodedPrompt>, AestheticError> {
    let mut encoded = Vec::with_capacity(texts.len());
    for text in texts {
        let encoding = tokenizer
            .encode(*text, true)
            .map_err(|e| AestheticError::Inference(e.to_string()))?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        let mut mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| x as i64)
            .collect();

        // Keep the end-of-text token in the final slot; CLIP pools on it.
        if ids.len() > CONTEXT_LENGTH {
            let eot = ids[ids.len() - 1];
            ids.truncate(CONTEXT_LENGTH);
            mask.truncate(CONTEXT_LENGTH);
            ids[CONTEXT_LENGTH - 1] = eot;
        }
        encoded.push(EncodedPrompt { ids, mask });
    }
    Ok(encoded)
}

fn build_padded_arrays(
    encoded: Vec<EncodedPrompt>,
) -> Result<(Array2<i64>, Array2<i64>), AestheticError> {
    let batch = encoded.len();
    let mut id_storage = Vec::with_capacity(batch * CONTEXT_LENGTH);
    let mut mask_storage = Vec::with_capacity(batch * CONTEXT_LENGTH);

    for EncodedPrompt { ids, mask } in encoded {
        if ids.len() != mask.len() {
            return Err(AestheticError::Inference(
                "tokenizer produced mismatched id/mask lengths".into(),
            ));
        }
        let pad = CONTEXT_LENGTH.saturating_sub(ids.len());
        id_storage.extend(ids);
        mask_storage.extend(mask);
        id_storage.extend(std::iter::repeat_n(0, pad));
        mask_storage.extend(std::iter::repeat_n(0, pad));
    }

    let input_ids = Array::from_shape_vec((batch, CONTEXT_LENGTH), id_storage)
        .map_err(|e| AestheticError::Inference(e.to_string()))?;
    let attn_mask = Array::from_shape_vec((batch, CONTEXT_LENGTH), mask_storage)
        .map_err(|e| AestheticError::Inference(e.to_string()))?;
    Ok((input_ids, attn_mask))
}

/// Picks the pooled embedding output: by name first, then the first 2-D output.
fn embedding_output_index(session: &Session<'_>, preferred: &str) -> usize {
    session
        .outputs
        .iter()
        .position(|output| output.name == preferred)
        .or_else(|| {
            session
                .outputs
                .iter()
                .position(|output| output.dimensions.len() == 2)
        })
        .unwrap_or(0)
}

fn run_visual(
    session: &RefCell<Session<'static>>,
    pixels: Array4<f32>,
) -> Result<Vec<Vec<f32>>, AestheticError> {
    let mut guard = session.borrow_mut();
    let session_ref = &mut *guard;
    if session_ref.inputs.len() != 1 {
        return Err(AestheticError::InvalidConfig(format!(
            "image tower declares {} inputs, expected 1",
            session_ref.inputs.len()
        )));
    }
    let output_idx = embedding_output_index(session_ref, "image_embeds");

    let outputs = session_ref
        .run::<f32, f32, _>(vec![pixels.into_dyn()])
        .map_err(|e| AestheticError::Encoding(format!("image tower: {e}")))?;
    let tensor = outputs
        .into_iter()
        .nth(output_idx)
        .ok_or_else(|| AestheticError::Encoding("image tower returned no outputs".into()))?;
    let flat: Vec<f32> = tensor.iter().copied().collect();
    split_batch(flat, 1)
}

/// Takes the lone image embedding out of a batch-of-one result.
fn single_image_embedding(mut vectors: Vec<Vec<f32>>) -> Result<Vec<f32>, AestheticError> {
    let vector = vectors
        .pop()
        .ok_or_else(|| AestheticError::Encoding("image tower returned no outputs".into()))?;
    ensure_finite(&vector, "image embedding")?;
    Ok(vector)
}

fn run_textual(
    session: &RefCell<Session<'static>>,
    input_ids: Array2<i64>,
    attn_mask: Array2<i64>,
) -> Result<Vec<Vec<f32>>, AestheticError> {
    let (batch, _) = input_ids.dim();
    let mut guard = session.borrow_mut();
    let session_ref = &mut *guard;
    let mut runtime_inputs = Vec::with_capacity(session_ref.inputs.len());
    let mut input_ids_tensor = Some(input_ids);
    let mut attn_mask_tensor = Some(attn_mask);

    for input in &session_ref.inputs {
        match input.name.as_str() {
            "input_ids" => {
                let tensor = input_ids_tensor.take().ok_or_else(|| {
                    AestheticError::InvalidConfig(
                        "text tower requested `input_ids` multiple times".into(),
                    )
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "attention_mask" => {
                let tensor = attn_mask_tensor.take().ok_or_else(|| {
                    AestheticError::InvalidConfig(
                        "text tower requested `attention_mask` multiple times".into(),
                    )
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            other => {
                return Err(AestheticError::InvalidConfig(format!(
                    "unsupported text tower input '{other}'"
                )))
            }
        }
    }

    if runtime_inputs.is_empty() {
        return Err(AestheticError::InvalidConfig(
            "text tower did not declare any inputs".into(),
        ));
    }
    let output_idx = embedding_output_index(session_ref, "text_embeds");

    let outputs = session_ref
        .run::<i64, f32, _>(runtime_inputs)
        .map_err(|e| AestheticError::Inference(e.to_string()))?;
    let tensor = outputs
        .into_iter()
        .nth(output_idx)
        .ok_or_else(|| AestheticError::Inference("text tower returned no outputs".into()))?;
    let flat: Vec<f32> = tensor.iter().copied().collect();
    split_batch(flat, batch)
}

fn split_batch(flat: Vec<f32>, batch: usize) -> Result<Vec<Vec<f32>>, AestheticError> {
    if batch == 0 {
        return Ok(Vec::new());
    }
    if flat.is_empty() || !flat.len().is_multiple_of(batch) {
        return Err(AestheticError::Inference(format!(
            "model output of {} values cannot be split into {batch} embeddings",
            flat.len()
        )));
    }
    let width = flat.len() / batch;
    Ok(flat.chunks(width).map(<[f32]>::to_vec).collect())
}
