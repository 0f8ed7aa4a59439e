//! Configuration Management
//!
//! Handles persistent configuration storage for azdisk and resolves the
//! effective connection settings: CLI flag > environment > config file >
//! built-in default.

use crate::azure::auth::DEFAULT_AUTHORITY;
use crate::azure::client::DEFAULT_ENDPOINT;
use crate::azure::{AzureClient, AzureCredentials, AzureHttpClient};
use crate::resource::{DiskResourceHandler, Features, Timeouts};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";
pub const ENV_TENANT_ID: &str = "ARM_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "ARM_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ARM_CLIENT_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "ARM_ACCESS_TOKEN";
pub const ENV_ENDPOINT: &str = "ARM_ENDPOINT";

/// Provider feature switches
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FeaturesConfig {
    /// Fail when creating a disk whose name is already in use (default: on)
    #[serde(default)]
    pub import_existing_check: Option<bool>,
}

/// Per-operation timeout overrides, in minutes
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TimeoutsConfig {
    #[serde(default)]
    pub create_minutes: Option<u64>,
    #[serde(default)]
    pub read_minutes: Option<u64>,
    #[serde(default)]
    pub update_minutes: Option<u64>,
    #[serde(default)]
    pub delete_minutes: Option<u64>,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    /// Resource Manager endpoint, for sovereign clouds
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

/// Settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub subscription_id: Option<String>,
    pub endpoint: Option<String>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// First non-empty value in precedence order
fn first_set(candidates: [Option<String>; 3]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("azdisk").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file {:?}: {:#}", path, e);
                Self::default()
            },
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Effective subscription (CLI > env > config)
    fn effective_subscription_with(
        &self,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        first_set([
            overrides.subscription_id.clone(),
            env(ENV_SUBSCRIPTION_ID),
            self.subscription_id.clone(),
        ])
    }

    /// Effective endpoint (CLI > env > config > public cloud)
    fn effective_endpoint_with(
        &self,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> String {
        first_set([overrides.endpoint.clone(), env(ENV_ENDPOINT), self.endpoint.clone()])
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    pub fn features(&self) -> Features {
        let defaults = Features::default();
        Features {
            import_existing_check: self
                .features
                .import_existing_check
                .unwrap_or(defaults.import_existing_check),
        }
    }

    /// Overlay configured timeouts on `defaults`
    pub fn timeouts(&self, defaults: Timeouts) -> Timeouts {
        let minutes = |m: Option<u64>, default: Duration| {
            m.map(|m| Duration::from_secs(m * 60)).unwrap_or(default)
        };
        Timeouts {
            create: minutes(self.timeouts.create_minutes, defaults.create),
            read: minutes(self.timeouts.read_minutes, defaults.read),
            update: minutes(self.timeouts.update_minutes, defaults.update),
            delete: minutes(self.timeouts.delete_minutes, defaults.delete),
        }
    }

    /// Build credentials: a pre-issued token wins over client credentials
    fn credentials_with(
        &self,
        http: &AzureHttpClient,
        endpoint: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<AzureCredentials> {
        if let Some(token) = first_set([env(ENV_ACCESS_TOKEN), None, None]) {
            tracing::info!("Using pre-issued access token from {}", ENV_ACCESS_TOKEN);
            return Ok(AzureCredentials::from_static(token));
        }

        let tenant_id = first_set([env(ENV_TENANT_ID), self.tenant_id.clone(), None]);
        let client_id = first_set([env(ENV_CLIENT_ID), self.client_id.clone(), None]);
        let client_secret = first_set([env(ENV_CLIENT_SECRET), None, None]);

        match (tenant_id, client_id, client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                tracing::info!("Using client credentials for client {}", client_id);
                Ok(AzureCredentials::client_secret(
                    http.inner().clone(),
                    DEFAULT_AUTHORITY,
                    &tenant_id,
                    &client_id,
                    &client_secret,
                    endpoint,
                ))
            },
            _ => bail!(
                "no Azure credentials: set {} or {}, {} and {}",
                ENV_ACCESS_TOKEN,
                ENV_TENANT_ID,
                ENV_CLIENT_ID,
                ENV_CLIENT_SECRET
            ),
        }
    }

    /// Build an authenticated ARM client from the effective settings
    pub fn build_client(&self, overrides: &Overrides) -> Result<AzureClient> {
        self.build_client_with(overrides, env_var)
    }

    fn build_client_with(
        &self,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String> + Copy,
    ) -> Result<AzureClient> {
        let subscription_id = self
            .effective_subscription_with(overrides, env)
            .with_context(|| {
                format!(
                    "no subscription configured: pass --subscription or set {}",
                    ENV_SUBSCRIPTION_ID
                )
            })?;
        let endpoint = self.effective_endpoint_with(overrides, env);

        let http = AzureHttpClient::new().context("failed to create HTTP client")?;
        let credentials = self.credentials_with(&http, &endpoint, env)?;

        tracing::info!(
            "Using subscription {} against {}",
            subscription_id,
            endpoint
        );

        AzureClient::new(credentials, http, &subscription_id, &endpoint)
            .with_context(|| format!("invalid endpoint {:?}", endpoint))
    }

    /// Build the disk handler with configured features and timeouts
    pub fn build_handler(&self, overrides: &Overrides) -> Result<DiskResourceHandler> {
        let client = self.build_client(overrides)?;
        let handler = DiskResourceHandler::new(client);
        let timeouts = self.timeouts(handler.timeouts());
        Ok(handler.with_features(self.features()).with_timeouts(timeouts))
    }
}
