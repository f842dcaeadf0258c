use aesthetic::AestheticError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shotspot::{PipelineError, UploadError};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("scoring failed, please retry")]
    ScoringTimeout,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),

    #[error("Scoring error: {0}")]
    Scoring(#[from] AestheticError),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::ScoringTimeout | ServerError::Unavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Upload(UploadError::PayloadTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ServerError::Upload(UploadError::UnsupportedContentType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ServerError::Upload(UploadError::EmptyPayload) => StatusCode::BAD_REQUEST,
            ServerError::Upload(UploadError::ImageTooSmall { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::Scoring(err) => match err {
                AestheticError::Encoding(_) => StatusCode::BAD_REQUEST,
                AestheticError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::ScoringTimeout => "SCORING_TIMEOUT",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Upload(UploadError::PayloadTooLarge { .. }) => "PAYLOAD_TOO_LARGE",
            ServerError::Upload(_) => "UPLOAD_REJECTED",
            ServerError::Scoring(AestheticError::Encoding(_)) => "INVALID_IMAGE",
            ServerError::Scoring(AestheticError::ModelUnavailable(_)) => "MODEL_UNAVAILABLE",
            ServerError::Scoring(_) => "SCORING_ERROR",
            ServerError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = %error_code, error = %message, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Upload(err) => ServerError::Upload(err),
            PipelineError::Aesthetic(err) => ServerError::Scoring(err),
        }
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Internal(format!("JSON encode error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
