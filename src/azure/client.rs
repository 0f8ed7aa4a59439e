//! Azure Client
//!
//! Main client for interacting with the Azure Resource Manager, combining
//! authentication and HTTP functionality.

use super::auth::AzureCredentials;
use super::error::ApiResult;
use super::http::{ApiResponse, AzureHttpClient};
use serde_json::Value;
use url::Url;

/// Default public-cloud Resource Manager endpoint
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Main ARM client
#[derive(Clone)]
pub struct AzureClient {
    pub credentials: AzureCredentials,
    pub http: AzureHttpClient,
    pub subscription_id: String,
    endpoint: Url,
}

impl AzureClient {
    /// Create a new ARM client for `subscription_id` against `endpoint`
    pub fn new(
        credentials: AzureCredentials,
        http: AzureHttpClient,
        subscription_id: &str,
        endpoint: &str,
    ) -> ApiResult<Self> {
        let endpoint = Url::parse(endpoint)?;

        Ok(Self {
            credentials,
            http,
            subscription_id: subscription_id.to_string(),
            endpoint,
        })
    }

    /// The Resource Manager endpoint this client talks to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the current access token
    pub async fn get_token(&self) -> ApiResult<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to an ARM API
    pub async fn get(&self, url: &str) -> ApiResult<ApiResponse> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a PUT request to an ARM API
    pub async fn put(&self, url: &str, body: &Value) -> ApiResult<ApiResponse> {
        let token = self.get_token().await?;
        self.http.put(url, &token, body).await
    }

    /// Make a DELETE request to an ARM API
    pub async fn delete(&self, url: &str) -> ApiResult<ApiResponse> {
        let token = self.get_token().await?;
        self.http.delete(url, &token).await
    }

    // =========================================================================
    // Resource Manager URL helpers
    // =========================================================================

    /// Build a subscription-scoped ARM URL
    pub fn subscription_url(&self, path: &str, api_version: &str) -> ApiResult<String> {
        let path = format!(
            "subscriptions/{}/{}",
            urlencoding::encode(&self.subscription_id),
            path.trim_start_matches('/')
        );
        let mut url = self.endpoint.join(&path)?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url.to_string())
    }

    /// Build the URL of a resource inside a resource group
    pub fn resource_url(
        &self,
        resource_group: &str,
        namespace: &str,
        resource_type: &str,
        name: &str,
        api_version: &str,
    ) -> ApiResult<String> {
        self.subscription_url(
            &format!(
                "resourceGroups/{}/providers/{}/{}/{}",
                urlencoding::encode(resource_group),
                namespace,
                resource_type,
                urlencoding::encode(name)
            ),
            api_version,
        )
    }

    /// Resolve a polling URL handed out by ARM (may be relative)
    pub fn resolve_url(&self, url: &str) -> ApiResult<String> {
        Ok(self.endpoint.join(url)?.to_string())
    }
}
