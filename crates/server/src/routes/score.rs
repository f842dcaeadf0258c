use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use crate::telemetry::record_scoring_timeout;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use shotspot::{process_upload, RawUpload, ScoredUpload};
use std::sync::Arc;

/// Query parameters for `POST /api/v1/score`
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ScoreQuery {
    /// Photo category (landscape, cityscape, sunset, ...). Defaults to `other`.
    #[serde(default)]
    pub category: Option<String>,

    /// Caller-supplied upload id (optional, will be generated if not provided)
    #[serde(default)]
    pub id: Option<String>,
}

/// Score one uploaded image.
///
/// The request body is the raw image (JPEG, PNG or WebP). Scoring runs on a
/// blocking worker under the configured scoring timeout; a timeout is reported
/// as `503 scoring failed, please retry`, never as a default score.
///
/// # Example
/// ```text
/// curl -X POST 'http://localhost:8080/api/v1/score?category=sunset' \
///      -H 'X-API-Key: demo-key-12345' \
///      -H 'Content-Type: image/jpeg' \
///      --data-binary @dusk.jpg
/// ```
pub async fn score_image(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ScoreQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<impl IntoResponse> {
    let raw = RawUpload {
        id: query
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        category: query.category.unwrap_or_else(|| "other".to_string()),
        content_type: declared_content_type(&headers),
        bytes: body.to_vec(),
    };

    let scored = run_scoring(state, raw).await?;
    Ok(Json(scored))
}

/// Content type the client declared, ignoring the generic binary type.
fn declared_content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.starts_with("application/octet-stream"))
        .map(str::to_string)
}

/// Runs [`process_upload`] off the async executor, bounded by the scoring timeout.
///
/// At most `scoring_workers` uploads score at once; the rest wait for a slot,
/// and the wait counts against the same timeout. A timed-out job keeps its
/// slot until the blocking worker actually returns.
pub async fn run_scoring(state: Arc<ServerState>, raw: RawUpload) -> ServerResult<ScoredUpload> {
    let budget = state.config.scoring_timeout();
    let worker_state = state.clone();
    let job = async move {
        if worker_state.scoring_slots.available_permits() == 0 {
            tracing::debug!(upload_id = %raw.id, "all scoring workers busy, queueing");
        }
        let permit = worker_state
            .scoring_slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ServerError::Internal(format!("scoring slots closed: {e}")))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            process_upload(raw, &worker_state.scorer, worker_state.upload_config())
        })
        .await
        .map_err(|join_err| ServerError::Internal(format!("scoring task failed: {join_err}")))
    };

    match tokio::time::timeout(budget, job).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(err)) => Err(err),
        Err(_) => {
            tracing::warn!(
                timeout_secs = state.config.scoring_timeout_secs,
                "scoring exceeded timeout"
            );
            record_scoring_timeout();
            Err(ServerError::ScoringTimeout)
        }
    }
}
