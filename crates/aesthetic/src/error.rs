use std::io;
use thiserror::Error;

/// Errors surfaced by the prompt bank and the aesthetic scorer.
#[derive(Debug, Error)]
pub enum AestheticError {
    /// The vision-language model (or the prompt bank built from it) is not available.
    /// Fatal at startup; callers must not serve scoring traffic until it is resolved.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    /// The image could not be decoded or encoded (corrupt data, zero-size, unsupported format).
    /// Recoverable per request.
    #[error("image encoding failed: {0}")]
    Encoding(String),
    /// Configuration is inconsistent (unknown mode, dimension mismatch between bank and encoder).
    #[error("invalid scorer config: {0}")]
    InvalidConfig(String),
    /// Unable to download remote model assets.
    #[error("download failed: {0}")]
    Download(String),
    /// Low-level IO failures while touching the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// ONNX Runtime or tokenizer failures while running the model.
    #[error("inference failure: {0}")]
    Inference(String),
}

impl AestheticError {
    /// True for failures that are specific to one input image and should be reported
    /// back to the uploader rather than treated as a service outage.
    pub fn is_request_error(&self) -> bool {
        matches!(self, AestheticError::Encoding(_))
    }
}

impl Clone for AestheticError {
    fn clone(&self) -> Self {
        match self {
            AestheticError::ModelUnavailable(s) => AestheticError::ModelUnavailable(s.clone()),
            AestheticError::Encoding(s) => AestheticError::Encoding(s.clone()),
            AestheticError::InvalidConfig(s) => AestheticError::InvalidConfig(s.clone()),
            AestheticError::Download(s) => AestheticError::Download(s.clone()),
            AestheticError::Io(err) => AestheticError::Inference(format!("io error: {err}")),
            AestheticError::Inference(s) => AestheticError::Inference(s.clone()),
        }
    }
}
