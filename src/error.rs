//! Unified error handling for my-claude.
//!
//! `RelayError` is what request handlers return; `RateFetchError` never leaves
//! the currency module.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Error type for chat and catalog operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayError {
    /// Requested model is not in the catalog.
    UnknownModel(String),
    /// Request body is malformed or semantically invalid.
    InvalidRequest(String),
    /// No Anthropic API key configured.
    ApiKeyMissing,
    /// Upstream answered with a non-success status.
    UpstreamStatus { status: u16, body: String },
    /// Upstream could not be reached (connection failure, timeout).
    UpstreamTransport(String),
    /// Upstream answered 2xx but the payload lacks the expected shape.
    ParseError(String),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownModel(model) => write!(
                f,
                "Unknown model: {}. Use the /models endpoint to list available models.",
                model
            ),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::ApiKeyMissing => write!(f, "No Anthropic API key configured"),
            Self::UpstreamStatus { status, body } => {
                write!(f, "Upstream returned {}: {}", status, body)
            }
            Self::UpstreamTransport(msg) => write!(f, "Upstream request failed: {}", msg),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {}

/// Error response structure for JSON serialization.
#[derive(Serialize)]
struct ErrorResponseBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    message: String,
    r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
}

impl RelayError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownModel(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ApiKeyMissing => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            Self::UpstreamTransport(_) => StatusCode::BAD_GATEWAY,
            Self::ParseError(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownModel(_) => "invalid_request",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ApiKeyMissing => "configuration_error",
            Self::UpstreamStatus { .. } => "upstream_error",
            Self::UpstreamTransport(_) => "upstream_error",
            Self::ParseError(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let upstream_status = match &self {
            Self::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        };
        let body = ErrorResponseBody {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
                upstream_status,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Failure while refreshing the USD→EUR rate. Recovered inside the rate cache.
#[derive(Debug)]
pub enum RateFetchError {
    Transport(reqwest::Error),
    Status(u16),
    Malformed(String),
}

impl fmt::Display for RateFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "rate source unreachable: {}", e),
            Self::Status(status) => write!(f, "rate source returned status {}", status),
            Self::Malformed(msg) => write!(f, "unexpected rate payload: {}", msg),
        }
    }
}

impl std::error::Error for RateFetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RateFetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_is_bad_request() {
        let err = RelayError::UnknownModel("gpt-4".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "invalid_request");
        assert!(err.to_string().contains("gpt-4"));
    }

    #[test]
    fn invalid_request_is_bad_request() {
        let err = RelayError::InvalidRequest("message is required".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_status_is_bad_gateway_and_echoes_body() {
        let err = RelayError::UpstreamStatus {
            status: 529,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("529"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn transport_and_parse_errors_are_upstream_errors() {
        let transport = RelayError::UpstreamTransport("timed out".to_string());
        let parse = RelayError::ParseError("missing content".to_string());
        assert_eq!(transport.error_type(), "upstream_error");
        assert_eq!(parse.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn api_key_missing_is_service_unavailable() {
        let err = RelayError::ApiKeyMissing;
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_type(), "configuration_error");
    }

    #[test]
    fn internal_is_server_error() {
        let err = RelayError::Internal("boom".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn into_response_keeps_status() {
        let response = RelayError::UpstreamStatus {
            status: 401,
            body: "invalid x-api-key".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn rate_fetch_error_describes_status() {
        let err = RateFetchError::Status(503);
        assert_eq!(err.to_string(), "rate source returned status 503");
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<RelayError>();
        assert_error::<RateFetchError>();
    }
}
