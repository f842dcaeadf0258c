//! Request middleware: API key checks, request ids and per-request spans.

use crate::error::ServerError;
use crate::routes::score::ScoreQuery;
use crate::state::ServerState;
use crate::telemetry::{record_auth_rejection, record_http_request};
use axum::extract::{MatchedPath, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue, Uri};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";
const API_KEY_HEADER: &str = "x-api-key";
const MAX_REQUEST_ID_LEN: usize = 128;
const SCORE_ROUTE: &str = "/api/v1/score";

/// Correlation id for one request, stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Key from `X-API-Key`, or from `Authorization: Bearer <key>` when that is absent.
fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    let key = match headers.get(API_KEY_HEADER) {
        Some(value) => value.to_str().ok()?,
        None => {
            let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
            value.strip_prefix("Bearer ").unwrap_or(value)
        }
    };
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

/// Rejects unknown keys and keys over their per-minute quota before any
/// upload body reaches the scorer.
pub async fn api_key_auth(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(key) = extract_api_key(request.headers()) else {
        record_auth_rejection("missing_key");
        return Err(ServerError::Authentication(
            "API key required. Provide it in 'X-API-Key' or 'Authorization: Bearer <key>' header"
                .to_string(),
        ));
    };

    if !state.is_valid_api_key(key) {
        record_auth_rejection("invalid_key");
        return Err(ServerError::Authentication("Invalid API key".to_string()));
    }
    if !state.check_rate_limit(key) {
        record_auth_rejection("rate_limited");
        return Err(ServerError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}

/// Client ids are echoed back in a header, so only short printable ASCII is kept.
fn accepted_request_id(headers: &HeaderMap) -> Option<String> {
    let id = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let printable = id.bytes().all(|b| b.is_ascii_graphic());
    (!id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN && printable).then(|| id.to_string())
}

/// Reuses the caller's `X-Request-Id` or mints a UUID, and echoes it on the response.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = accepted_request_id(request.headers())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Upload id and category from a score request's query string, if any.
fn upload_fields(route: &str, uri: &Uri) -> (Option<String>, Option<String>) {
    if route != SCORE_ROUTE {
        return (None, None);
    }
    match Query::<ScoreQuery>::try_from_uri(uri) {
        Ok(Query(query)) => (query.id, query.category),
        Err(_) => (None, None),
    }
}

/// Runs the request inside a span carrying the request id, the matched route
/// and, for uploads, the upload id and category, then records the HTTP metrics.
pub async fn trace_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    // Unmatched paths share one label to keep metric cardinality bounded.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let (upload_id, category) = upload_fields(&route, request.uri());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        route = %route,
        upload_id = tracing::field::Empty,
        category = tracing::field::Empty,
    );
    if let Some(upload_id) = &upload_id {
        span.record("upload_id", upload_id.as_str());
    }
    if let Some(category) = &category {
        span.record("category", category.as_str());
    }

    let response = next.run(request).instrument(span.clone()).await;
    let latency = start.elapsed();
    let status = response.status();

    let latency_ms = latency.as_millis() as u64;
    span.in_scope(|| {
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), latency_ms, "request failed");
        } else {
            tracing::info!(status = status.as_u16(), latency_ms, "request completed");
        }
    });
    record_http_request(method.as_str(), &route, status.as_u16(), latency);

    response
}
