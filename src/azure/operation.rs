//! Long-running operations
//!
//! ARM mutations answer before the work is finished. The initial response
//! tells us how to track progress: an `Azure-AsyncOperation` status monitor,
//! a `Location` URL that answers 202 until the work is done, or the resource's
//! own `provisioningState`. [`LongRunningOperation::wait`] polls whichever one
//! applies until the operation is terminal, backing off between polls.
//!
//! The wait has no deadline of its own; callers wrap it in
//! `tokio::time::timeout`, and dropping the future stops polling.

use super::client::AzureClient;
use super::error::{ApiError, ApiResult};
use super::http::ApiResponse;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Backoff settings for polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

/// Status of a tracked operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Running,
    Done,
    Failed {
        status: String,
        code: String,
        message: String,
    },
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Map an ARM status string (`status` or `provisioningState`)
    fn from_arm(status: &str, error: Option<&Value>) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Done,
            "failed" | "canceled" | "cancelled" => {
                let field = |key: &str| {
                    error
                        .and_then(|e| e.get(key))
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string()
                };
                Self::Failed {
                    status: status.to_string(),
                    code: field("code"),
                    message: field("message"),
                }
            },
            "inprogress" | "accepted" | "creating" | "updating" | "deleting" | "running" => {
                Self::Running
            },
            other => {
                tracing::warn!("Unknown operation status: {}", other);
                Self::Running
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Monitor {
    AsyncOperation(String),
    Location(String),
    ProvisioningState(String),
    Completed,
}

/// A submitted ARM mutation that may still be running server-side
pub struct LongRunningOperation<'a> {
    client: &'a AzureClient,
    monitor: Monitor,
    options: PollOptions,
    next_interval: Duration,
    retry_after: Option<Duration>,
}

impl<'a> LongRunningOperation<'a> {
    /// Decide how to track the operation started by `response`.
    ///
    /// `resource_url` is polled for `provisioningState` when ARM gives no
    /// monitor headers (PUT bodies that are still `Creating`/`Updating`).
    pub fn from_response(
        client: &'a AzureClient,
        resource_url: &str,
        response: &ApiResponse,
        options: PollOptions,
    ) -> ApiResult<Self> {
        let monitor = if let Some(url) = &response.async_operation {
            Monitor::AsyncOperation(client.resolve_url(url)?)
        } else if let Some(url) = response
            .location
            .as_ref()
            .filter(|_| response.status == StatusCode::ACCEPTED)
        {
            Monitor::Location(client.resolve_url(url)?)
        } else {
            match provisioning_status(&response.body) {
                Some(OperationStatus::Running) => {
                    Monitor::ProvisioningState(resource_url.to_string())
                },
                Some(OperationStatus::Failed {
                    status,
                    code,
                    message,
                }) => {
                    return Err(ApiError::OperationFailed {
                        status,
                        code,
                        message,
                    })
                },
                _ => Monitor::Completed,
            }
        };

        Ok(Self {
            client,
            monitor,
            options,
            next_interval: options.initial_interval,
            retry_after: response.retry_after,
        })
    }

    /// True when nothing remains to poll
    pub fn is_done(&self) -> bool {
        self.monitor == Monitor::Completed
    }

    /// Poll until the operation is terminal
    pub async fn wait(mut self) -> ApiResult<()> {
        let mut polls = 0u32;

        while !self.is_done() {
            tokio::time::sleep(self.next_delay()).await;
            polls += 1;

            match self.poll_once().await? {
                OperationStatus::Running => {
                    tracing::debug!("Operation still running after {} polls", polls);
                },
                OperationStatus::Done => {
                    tracing::debug!("Operation completed after {} polls", polls);
                    self.monitor = Monitor::Completed;
                },
                OperationStatus::Failed {
                    status,
                    code,
                    message,
                } => {
                    return Err(ApiError::OperationFailed {
                        status,
                        code,
                        message,
                    })
                },
            }
        }

        Ok(())
    }

    async fn poll_once(&mut self) -> ApiResult<OperationStatus> {
        let status = match self.monitor.clone() {
            Monitor::AsyncOperation(url) => {
                let response = self.client.get(&url).await?;
                self.retry_after = response.retry_after;
                let status = response
                    .body
                    .get("status")
                    .and_then(|v| v.as_str())
                    .unwrap_or("InProgress");
                OperationStatus::from_arm(status, response.body.get("error"))
            },
            Monitor::Location(url) => {
                let response = self.client.get(&url).await?;
                self.retry_after = response.retry_after;
                if response.status == StatusCode::ACCEPTED {
                    OperationStatus::Running
                } else {
                    OperationStatus::Done
                }
            },
            Monitor::ProvisioningState(url) => {
                let response = self.client.get(&url).await?;
                self.retry_after = response.retry_after;
                provisioning_status(&response.body).unwrap_or(OperationStatus::Done)
            },
            Monitor::Completed => OperationStatus::Done,
        };

        Ok(status)
    }

    /// Server-requested delay wins over backoff; both are capped
    fn next_delay(&mut self) -> Duration {
        if let Some(retry_after) = self.retry_after.take() {
            return retry_after.min(self.options.max_interval);
        }

        let delay = self.next_interval.min(self.options.max_interval);
        self.next_interval = delay
            .saturating_mul(self.options.multiplier.max(1))
            .min(self.options.max_interval);
        delay
    }
}

/// Status carried by `properties.provisioningState`, if any
fn provisioning_status(body: &Value) -> Option<OperationStatus> {
    let state = body
        .get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(|v| v.as_str())?;

    Some(OperationStatus::from_arm(state, body.get("error")))
}
