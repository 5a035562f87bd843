//! WebServer-specific error types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::{ErrorBody, SharedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error("Invalid request: {details}")]
    InvalidRequest { details: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Authentication rejected: {message}")]
    AuthRejected { message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Upstream request failed: {message}")]
    UpstreamError { message: String },

    #[error("Upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Upstream did not respond within {seconds}s")]
    UpstreamTimeout { seconds: u64 },

    #[error("Upstream stream ended without a completion signal")]
    UpstreamTruncated,

    #[error("Image generation is not configured")]
    ImageUnavailable,

    #[error("Backend request failed with HTTP {status}: {message}")]
    BackendError { status: u16, message: String },

    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WebServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    pub fn invalid(details: impl Into<String>) -> Self {
        Self::InvalidRequest { details: details.into() }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamError { message: message.into() }
    }

    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } | Self::SharedError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::AuthRejected { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BackendError { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebServerError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.to_string() };
        (self.status_code(), Json(body)).into_response()
    }
}

pub type WebServerResult<T> = Result<T, WebServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(WebServerError::invalid("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(WebServerError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(WebServerError::NotFound("p".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            WebServerError::BackendError { status: 500, message: "x".into() }.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            WebServerError::upstream("dns").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WebServerError::UpstreamTimeout { seconds: 3 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
