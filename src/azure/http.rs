//! HTTP utilities for ARM REST API calls

use super::error::{ApiError, ApiResult};
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the status-monitor URL of an ARM long-running operation
pub const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Header used to correlate a request with ARM-side logs
const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// Sanitize response body for logging
/// Truncates long responses and masks potentially sensitive patterns
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// A successful ARM response along with the headers that drive polling
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
    pub async_operation: Option<String>,
    pub location: Option<String>,
    pub retry_after: Option<Duration>,
}

impl ApiResponse {
    fn from_parts(status: StatusCode, headers: &HeaderMap, body: Value) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        Self {
            status,
            body,
            async_operation: header(AZURE_ASYNC_OPERATION),
            location: header(LOCATION.as_str()),
            retry_after: header(RETRY_AFTER.as_str())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone)]
pub struct AzureHttpClient {
    client: Client,
}

impl AzureHttpClient {
    /// Create a new HTTP client
    pub fn new() -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("azdisk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// The underlying reqwest client (shared with the token endpoint)
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Make a GET request to an ARM API
    pub async fn get(&self, url: &str, token: &str) -> ApiResult<ApiResponse> {
        self.send(Method::GET, url, token, None).await
    }

    /// Make a PUT request to an ARM API
    pub async fn put(&self, url: &str, token: &str, body: &Value) -> ApiResult<ApiResponse> {
        self.send(Method::PUT, url, token, Some(body)).await
    }

    /// Make a DELETE request to an ARM API
    pub async fn delete(&self, url: &str, token: &str) -> ApiResult<ApiResponse> {
        self.send(Method::DELETE, url, token, None).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> ApiResult<ApiResponse> {
        let request_id = Uuid::new_v4();
        tracing::debug!("{} {} [{}]", method, url, request_id);

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header(CLIENT_REQUEST_ID, request_id.to_string());

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            return Err(ApiError::from_response(status, &text));
        }

        // Handle empty response
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok(ApiResponse::from_parts(status, &headers, body))
    }
}

/// Format an ARM API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_api_error(error: &ApiError) -> String {
    if let Some(status) = error.status() {
        let message = match status.as_u16() {
            401 => "Authentication failed. Check ARM_CLIENT_ID / ARM_CLIENT_SECRET or ARM_ACCESS_TOKEN.",
            403 => "Permission denied. Check the role assignments of your principal.",
            404 => "Resource not found.",
            409 => "Resource conflict. The resource may already exist or be in use.",
            429 => "Rate limit exceeded. Please try again later.",
            400 => "Invalid request. Check your parameters.",
            500 | 503 => "Azure service temporarily unavailable. Please try again.",
            _ => "Request failed. Check your network connection and try again.",
        };
        return message.to_string();
    }

    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let logged = sanitize_for_log(&body);
        assert!(logged.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(logged.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }

    #[test]
    fn test_format_api_error_maps_status() {
        let err = ApiError::from_response(StatusCode::FORBIDDEN, "{}");
        assert!(format_api_error(&err).starts_with("Permission denied"));

        let err = ApiError::Auth("token endpoint returned 400".to_string());
        assert!(format_api_error(&err).contains("authentication failed"));
    }
}
