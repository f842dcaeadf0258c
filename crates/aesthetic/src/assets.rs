use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{AestheticError, ScorerConfig};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ModelAssets {
    pub(crate) visual_model_path: PathBuf,
    pub(crate) text_model_path: PathBuf,
    pub(crate) tokenizer_path: PathBuf,
}

/// Ensures the CLIP towers and tokenizer exist locally, downloading them when URLs are provided.
pub(crate) async fn resolve_model_assets(
    cfg: &ScorerConfig,
) -> Result<ModelAssets, AestheticError> {
    let visual_model_path =
        ensure_local_file(&cfg.visual_model_path, cfg.visual_model_url.as_deref()).await?;
    let text_model_path =
        ensure_local_file(&cfg.text_model_path, cfg.text_model_url.as_deref()).await?;
    let tokenizer_path =
        ensure_local_file(&cfg.tokenizer_path, cfg.tokenizer_url.as_deref()).await?;

    Ok(ModelAssets {
        visual_model_path,
        text_model_path,
        tokenizer_path,
    })
}

/// Returns `target` if it already exists, otherwise attempts to download `remote_url`.
async fn ensure_local_file(
    target: &Path,
    remote_url: Option<&str>,
) -> Result<PathBuf, AestheticError> {
    if target.exists() {
        return Ok(target.to_path_buf());
    }

    if let Some(url) = remote_url {
        tracing::info!(url, target = %target.display(), "downloading model asset");
        download_to_path(target, url).await?;
        return Ok(target.to_path_buf());
    }

    Err(AestheticError::ModelUnavailable(format!(
        "missing model asset {}",
        target.display()
    )))
}

/// Downloads `url` into `target`, creating parent directories as needed.
async fn download_to_path(target: &Path, url: &str) -> Result<(), AestheticError> {
    if let Some(parent) = target.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let response = reqwest::get(url)
        .await
        .map_err(|e| AestheticError::Download(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AestheticError::Download(format!(
            "unexpected status {status} while fetching {url}"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AestheticError::Download(e.to_string()))?;

    fs::write(target, &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn existing_files_resolve_without_download() {
        let dir = tempdir().unwrap();
        let visual = dir.path().join("visual.onnx");
        let textual = dir.path().join("textual.onnx");
        let tokenizer = dir.path().join("tokenizer.json");
        for path in [&visual, &textual, &tokenizer] {
            fs::write(path, b"stub").unwrap();
        }

        let cfg = ScorerConfig {
            visual_model_path: visual.clone(),
            text_model_path: textual.clone(),
            tokenizer_path: tokenizer.clone(),
            ..Default::default()
        };

        let assets = resolve_model_assets(&cfg).await.unwrap();
        assert_eq!(assets.visual_model_path, visual);
        assert_eq!(assets.text_model_path, textual);
        assert_eq!(assets.tokenizer_path, tokenizer);
    }

    #[tokio::test]
    async fn missing_file_without_url_is_model_unavailable() {
        let dir = tempdir().unwrap();
        let visual = dir.path().join("visual.onnx");
        fs::write(&visual, b"stub").unwrap();

        let cfg = ScorerConfig {
            visual_model_path: visual,
            text_model_path: dir.path().join("nope.onnx"),
            tokenizer_path: dir.path().join("tokenizer.json"),
            ..Default::default()
        };

        let err = resolve_model_assets(&cfg).await.unwrap_err();
        assert!(matches!(err, AestheticError::ModelUnavailable(_)));
        assert!(err.to_string().contains("nope.onnx"));
    }
}
