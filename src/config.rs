//! YAML Configuration File Support for ShotSpot
//!
//! Loads the scorer and upload settings from a single YAML file so the demo
//! binary, tests and embedding services share one format.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # ShotSpot Configuration
//! version: "1.0"
//! name: "production"
//!
//! scorer:
//!   mode: "onnx"
//!   model_name: "clip-vit-b32"
//!   visual_model_path: "./models/clip-vit-b32/visual.onnx"
//!   text_model_path: "./models/clip-vit-b32/textual.onnx"
//!   tokenizer_path: "./models/clip-vit-b32/tokenizer.json"
//!   embedding_dim: 512
//!   device: "cpu"
//!
//! upload:
//!   max_bytes: 10485760
//!   min_dimension: 1
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DEFAULT_MAX_UPLOAD_BYTES, ScorerConfig, UploadConfig};

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ShotspotConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// CLIP model and encoder selection
    #[serde(default)]
    pub scorer: ScorerYamlConfig,

    /// Limits applied before scoring
    #[serde(default)]
    pub upload: UploadYamlConfig,
}

impl ShotspotConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: ShotspotConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.scorer.validate()?;
        self.upload.validate()?;
        Ok(())
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        self.scorer.to_scorer_config()
    }

    pub fn upload_config(&self) -> UploadConfig {
        self.upload.to_upload_config()
    }
}

impl Default for ShotspotConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            scorer: ScorerYamlConfig::default(),
            upload: UploadYamlConfig::default(),
        }
    }
}

/// Scorer YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerYamlConfig {
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default = "default_model_name")]
    pub model_name: String,

    #[serde(default = "default_visual_model_path")]
    pub visual_model_path: PathBuf,

    #[serde(default)]
    pub visual_model_url: Option<String>,

    #[serde(default = "default_text_model_path")]
    pub text_model_path: PathBuf,

    #[serde(default)]
    pub text_model_url: Option<String>,

    #[serde(default = "default_tokenizer_path")]
    pub tokenizer_path: PathBuf,

    #[serde(default)]
    pub tokenizer_url: Option<String>,

    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    #[serde(default = "default_device")]
    pub device: String,
}

impl ScorerYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.to_scorer_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("scorer: {e}")))
    }

    pub fn to_scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            mode: self.mode.clone(),
            model_name: self.model_name.clone(),
            visual_model_path: self.visual_model_path.clone(),
            visual_model_url: self.visual_model_url.clone(),
            text_model_path: self.text_model_path.clone(),
            text_model_url: self.text_model_url.clone(),
            tokenizer_path: self.tokenizer_path.clone(),
            tokenizer_url: self.tokenizer_url.clone(),
            embedding_dim: self.embedding_dim,
            device: self.device.clone(),
        }
    }
}

impl Default for ScorerYamlConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            model_name: default_model_name(),
            visual_model_path: default_visual_model_path(),
            visual_model_url: None,
            text_model_path: default_text_model_path(),
            text_model_url: None,
            tokenizer_path: default_tokenizer_path(),
            tokenizer_url: None,
            embedding_dim: default_embedding_dim(),
            device: default_device(),
        }
    }
}

/// Upload limits YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadYamlConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    #[serde(default = "default_min_dimension")]
    pub min_dimension: u32,
}

impl UploadYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.max_bytes == 0 {
            return Err(ConfigLoadError::Validation(
                "upload.max_bytes must be >= 1".to_string(),
            ));
        }
        if self.min_dimension == 0 {
            return Err(ConfigLoadError::Validation(
                "upload.min_dimension must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_upload_config(&self) -> UploadConfig {
        UploadConfig {
            max_bytes: self.max_bytes,
            min_dimension: self.min_dimension,
        }
    }
}

impl Default for UploadYamlConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            min_dimension: default_min_dimension(),
        }
    }
}

fn default_mode() -> String {
    "onnx".to_string()
}
fn default_model_name() -> String {
    "clip-vit-b32".to_string()
}
fn default_visual_model_path() -> PathBuf {
    PathBuf::from("./models/clip-vit-b32/visual.onnx")
}
fn default_text_model_path() -> PathBuf {
    PathBuf::from("./models/clip-vit-b32/textual.onnx")
}
fn default_tokenizer_path() -> PathBuf {
    PathBuf::from("./models/clip-vit-b32/tokenizer.json")
}
fn default_embedding_dim() -> usize {
    512
}
fn default_device() -> String {
    "cpu".to_string()
}
fn default_max_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}
fn default_min_dimension() -> u32 {
    1
}
