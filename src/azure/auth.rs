//! Azure Authentication
//!
//! Handles bearer tokens for ARM, either pre-issued (`ARM_ACCESS_TOKEN`, e.g.
//! from `az account get-access-token`) or obtained through the Azure AD
//! client-credentials flow.

use super::error::{ApiError, ApiResult};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default Azure AD authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

enum TokenSource {
    Static(String),
    ClientSecret {
        http: reqwest::Client,
        authority: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
        scope: String,
    },
}

/// Azure credentials holder with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    source: Arc<TokenSource>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds; AAD v1 endpoints send this as a string
    #[serde(default)]
    expires_in: Value,
}

impl TokenResponse {
    fn ttl(&self) -> Duration {
        let secs = match &self.expires_in {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        secs.map(Duration::from_secs).unwrap_or(DEFAULT_TOKEN_TTL)
    }
}

impl AzureCredentials {
    /// Use a pre-issued bearer token as-is
    pub fn from_static(token: impl Into<String>) -> Self {
        Self {
            source: Arc::new(TokenSource::Static(token.into())),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Use the client-credentials flow against `authority` for `resource`
    /// (the ARM endpoint, e.g. `https://management.azure.com`)
    pub fn client_secret(
        http: reqwest::Client,
        authority: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        resource: &str,
    ) -> Self {
        Self {
            source: Arc::new(TokenSource::ClientSecret {
                http,
                authority: authority.trim_end_matches('/').to_string(),
                tenant_id: tenant_id.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                scope: format!("{}/.default", resource.trim_end_matches('/')),
            }),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for API calls
    /// Security: Checks token expiry before returning cached token
    pub async fn get_token(&self) -> ApiResult<String> {
        match self.source.as_ref() {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ClientSecret {
                http,
                authority,
                tenant_id,
                client_id,
                client_secret,
                scope,
            } => {
                let url = format!("{}/{}/oauth2/v2.0/token", authority, tenant_id);
                let form = [
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("scope", scope.as_str()),
                ];
                self.cached_or_fetch(http, &url, &form).await
            },
        }
    }

    async fn cached_or_fetch(
        &self,
        http: &reqwest::Client,
        url: &str,
        form: &[(&str, &str)],
    ) -> ApiResult<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let response = http.post(url).form(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Auth(format!("token endpoint returned {}", status)));
        }

        let token: TokenResponse = response.json().await?;
        let ttl = token.ttl().saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.access_token.clone(),
                expires_at: Instant::now() + ttl,
            });
        }

        tracing::debug!("New token cached, expires in ~{} minutes", ttl.as_secs() / 60);

        Ok(token.access_token)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> ApiResult<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }

        self.get_token().await
    }
}
