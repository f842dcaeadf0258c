use crate::error::ServerResult;
use crate::state::ServerState;
use aesthetic::scoring::{
    BAND_AVERAGE, BAND_EXCELLENT, BAND_FLOOR, BAND_GOOD, NEGATIVE_PENALTY_SCALE,
    NEGATIVE_THRESHOLD, QUICK_THRESHOLD, SCORE_MAX, SCORE_MIN,
};
use aesthetic::{Category, Dimension, DimensionWeights, WEIGHTS};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// One prompt group as exposed over the API
#[derive(Debug, Serialize)]
pub struct PromptGroupView {
    pub dimension: Dimension,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub prompts: Vec<String>,
}

/// Scoring constants so clients can interpret a breakdown
#[derive(Debug, Serialize)]
pub struct ScoringParameters {
    pub weights: DimensionWeights,
    pub quick_threshold: f64,
    pub band_breakpoints: [f64; 4],
    pub negative_threshold: f64,
    pub negative_penalty_scale: f64,
    pub score_range: [f64; 2],
}

/// Prompt taxonomy response
#[derive(Debug, Serialize)]
pub struct PromptsResponse {
    pub model_name: String,
    pub groups: Vec<PromptGroupView>,
    pub scoring: ScoringParameters,
}

/// List the prompt groups the scorer compares images against
pub async fn list_prompts(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let groups = state
        .scorer
        .bank()
        .groups()?
        .into_iter()
        .map(|group| PromptGroupView {
            dimension: group.dimension(),
            category: group.category(),
            prompts: group.prompts().to_vec(),
        })
        .collect();

    Ok(Json(PromptsResponse {
        model_name: state.scorer.model_name().to_string(),
        groups,
        scoring: ScoringParameters {
            weights: WEIGHTS,
            quick_threshold: QUICK_THRESHOLD,
            band_breakpoints: [BAND_FLOOR, BAND_AVERAGE, BAND_GOOD, BAND_EXCELLENT],
            negative_threshold: NEGATIVE_THRESHOLD,
            negative_penalty_scale: NEGATIVE_PENALTY_SCALE,
            score_range: [SCORE_MIN, SCORE_MAX],
        },
    }))
}
