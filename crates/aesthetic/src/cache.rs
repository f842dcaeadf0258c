use once_cell::sync::OnceCell;
use onnxruntime::{environment::Environment, session::Session};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tokenizers::Tokenizer;

use crate::assets::ModelAssets;
use crate::AestheticError;

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

// ONNX sessions need `&mut` to run, so every worker thread keeps its own copy
// of the towers instead of contending on a shared handle.
thread_local! {
    static MODEL_CACHE: RefCell<HashMap<ModelAssets, Rc<CachedClip>>> =
        RefCell::new(HashMap::new());
}

pub(crate) struct CachedClip {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) visual: RefCell<Session<'static>>,
    pub(crate) textual: RefCell<Session<'static>>,
}

impl CachedClip {
    fn load(assets: &ModelAssets) -> Result<Self, AestheticError> {
        let tokenizer = Tokenizer::from_file(&assets.tokenizer_path)
            .map_err(|e| AestheticError::ModelUnavailable(format!("tokenizer: {e}")))?;

        let visual = new_session(assets.visual_model_path.clone())?;
        let textual = new_session(assets.text_model_path.clone())?;

        Ok(Self {
            tokenizer,
            visual: RefCell::new(visual),
            textual: RefCell::new(textual),
        })
    }
}

fn new_session(path: std::path::PathBuf) -> Result<Session<'static>, AestheticError> {
    let env = ort_environment()?;
    let display = path.display().to_string();
    env.new_session_builder()
        .map_err(|e| AestheticError::ModelUnavailable(e.to_string()))?
        .with_model_from_file(path)
        .map_err(|e| AestheticError::ModelUnavailable(format!("{display}: {e}")))
}

/// Returns this thread's handle for `assets`, loading it on first use.
pub(crate) fn get_or_load_clip(assets: &ModelAssets) -> Result<Rc<CachedClip>, AestheticError> {
    MODEL_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(handle) = cache.get(assets) {
            return Ok(handle.clone());
        }

        tracing::debug!(
            visual = %assets.visual_model_path.display(),
            "loading CLIP sessions for worker thread"
        );
        let handle = Rc::new(CachedClip::load(assets)?);
        cache.insert(assets.clone(), handle.clone());
        Ok(handle)
    })
}

fn ort_environment() -> Result<&'static Environment, AestheticError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("shotspot-aesthetic")
            .build()
            .map_err(|e| AestheticError::ModelUnavailable(e.to_string()))
    })
}
