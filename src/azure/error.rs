//! ARM API error types

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Result alias for ARM client calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors raised by the ARM transport layer
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API request failed: {status} ({code}): {message}")]
    Status {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("long-running operation failed ({code}): {message}")]
    OperationFailed {
        status: String,
        code: String,
        message: String,
    },

    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    /// True when the server answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// HTTP status, when the error came from a response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a status error from a non-success response body.
    ///
    /// ARM wraps failures as `{"error": {"code": ..., "message": ...}}`; bodies
    /// that do not follow that shape keep the canonical reason phrase.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => (
                status.canonical_reason().unwrap_or("Unknown").to_string(),
                String::new(),
            ),
        };

        Self::Status {
            status,
            code,
            message,
        }
    }
}

/// ARM error envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_parses_arm_envelope() {
        let body = r#"{"error":{"code":"ResourceNotFound","message":"The Resource was not found."}}"#;
        let err = ApiError::from_response(StatusCode::NOT_FOUND, body);

        assert!(err.is_not_found());
        match err {
            ApiError::Status { code, message, .. } => {
                assert_eq!(code, "ResourceNotFound");
                assert!(message.contains("not found"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_response_falls_back_to_reason() {
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert!(err.to_string().contains("Bad Gateway"));
    }
}
