//! Azure Resource Manager interaction module
//!
//! This module provides the core functionality for talking to the Azure
//! Resource Manager (ARM) REST API: authentication, the HTTP client, typed
//! errors and long-running-operation polling.
//!
//! # Module Structure
//!
//! - [`auth`] - Bearer tokens (pre-issued or client credentials) with caching
//! - [`client`] - Main ARM client: URL building plus authenticated requests
//! - [`error`] - Transport and API error types
//! - [`http`] - HTTP utilities for REST API calls
//! - [`operation`] - Polling of long-running operations until terminal
//!
//! # Example
//!
//! ```ignore
//! use azdisk::azure::{AzureClient, AzureCredentials, AzureHttpClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = AzureClient::new(
//!         AzureCredentials::from_static(std::env::var("ARM_ACCESS_TOKEN")?),
//!         AzureHttpClient::new()?,
//!         "00000000-0000-0000-0000-000000000000",
//!         azdisk::azure::client::DEFAULT_ENDPOINT,
//!     )?;
//!     let url = client.resource_url("rg", "Microsoft.Compute", "disks", "data", "2019-07-01")?;
//!     let disk = client.get(&url).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod operation;

pub use auth::AzureCredentials;
pub use client::AzureClient;
pub use error::{ApiError, ApiResult};
pub use http::{ApiResponse, AzureHttpClient};
pub use operation::{LongRunningOperation, OperationStatus, PollOptions};
