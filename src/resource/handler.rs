//! Managed Disk Resource Handler
//!
//! Create/read/update/delete of `Microsoft.Compute/disks`. Every operation
//! returns only once the remote side is terminal: mutations are submitted,
//! their long-running operation is polled to completion, and the disk is
//! re-fetched so callers always see canonical server state.

use super::disk::{DiskSpec, DiskState};
use super::error::{DiskError, Result};
use super::id::ResourceId;
use super::model::Disk;
use super::registry::{managed_disk_schema, ResourceSchema, Timeouts, MANAGED_DISK};
use crate::azure::{ApiError, ApiResult, AzureClient, LongRunningOperation, PollOptions};
use std::future::Future;
use std::time::Duration;

/// Provider-level switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Refuse to create a disk whose name is already taken by an unmanaged one
    pub import_existing_check: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            import_existing_check: true,
        }
    }
}

/// Handler for the managed disk resource
#[derive(Clone)]
pub struct DiskResourceHandler {
    client: AzureClient,
    schema: &'static ResourceSchema,
    timeouts: Timeouts,
    poll: PollOptions,
    features: Features,
}

impl DiskResourceHandler {
    pub fn new(client: AzureClient) -> Self {
        let schema = managed_disk_schema();
        Self {
            client,
            schema,
            timeouts: schema.default_timeouts(),
            poll: PollOptions::default(),
            features: Features::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    /// Create the disk, or update it in place when it already exists.
    ///
    /// `is_new` marks a resource the caller does not track yet; only then is
    /// the name checked for an existing, unmanaged disk.
    pub async fn create_or_update(&self, spec: &DiskSpec, is_new: bool) -> Result<DiskState> {
        spec.validate()?;

        let (action, deadline) = if is_new {
            ("creating", self.timeouts.create)
        } else {
            ("updating", self.timeouts.update)
        };

        with_deadline(
            deadline,
            action,
            &spec.name,
            &spec.resource_group_name,
            self.apply(spec, is_new),
        )
        .await
    }

    async fn apply(&self, spec: &DiskSpec, is_new: bool) -> Result<DiskState> {
        let name = spec.name.as_str();
        let resource_group = spec.resource_group_name.as_str();
        let api = |action: &'static str| api_error(action, name, resource_group);

        let url = self.disk_url(resource_group, name).map_err(api("addressing"))?;

        if is_new && self.features.import_existing_check {
            match self.fetch(&url).await {
                Ok(existing) => {
                    if let Some(id) = existing.id.filter(|id| !id.is_empty()) {
                        return Err(DiskError::AlreadyExists {
                            resource_type: MANAGED_DISK.to_string(),
                            id,
                        });
                    }
                },
                Err(e) if e.is_not_found() => {},
                Err(e) => return Err(api("checking for presence of existing")(e)),
            }
        }

        tracing::info!(
            "Preparing arguments for Managed Disk {:?} (Resource Group {:?}, create option {})",
            name,
            resource_group,
            spec.create_option()
        );

        let body = serde_json::to_value(Disk::from(spec))
            .map_err(|e| api("creating/updating")(e.into()))?;

        let response = self
            .client
            .put(&url, &body)
            .await
            .map_err(api("creating/updating"))?;

        LongRunningOperation::from_response(&self.client, &url, &response, self.poll)
            .map_err(api("waiting for create/update of"))?
            .wait()
            .await
            .map_err(api("waiting for create/update of"))?;

        let disk = self.fetch(&url).await.map_err(api("retrieving"))?;
        if disk.id.as_deref().map_or(true, str::is_empty) {
            return Err(DiskError::MissingId {
                name: name.to_string(),
                resource_group: resource_group.to_string(),
            });
        }

        let state = DiskState::from_disk(disk, resource_group);
        tracing::info!("Managed Disk {} is ready", state.id);
        Ok(state)
    }

    /// Refresh the disk behind `id`; `None` means it no longer exists and
    /// should be dropped from tracked state
    pub async fn read(&self, id: &str) -> Result<Option<DiskState>> {
        let (resource_group, name) = parse_disk_id(id)?;

        with_deadline(
            self.timeouts.read,
            "reading",
            &name,
            &resource_group,
            self.read_inner(id, &resource_group, &name),
        )
        .await
    }

    async fn read_inner(
        &self,
        id: &str,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<DiskState>> {
        let api = |action: &'static str| api_error(action, name, resource_group);
        let url = self.disk_url(resource_group, name).map_err(api("addressing"))?;

        match self.fetch(&url).await {
            Ok(disk) => Ok(Some(DiskState::from_disk(disk, resource_group))),
            Err(e) if e.is_not_found() => {
                tracing::info!("Disk {:?} does not exist - removing from state", id);
                Ok(None)
            },
            Err(e) => Err(api("making Read request on")(e)),
        }
    }

    /// Adopt an existing disk; unlike [`read`](Self::read) a missing disk is
    /// an error
    pub async fn import(&self, id: &str) -> Result<DiskState> {
        self.read(id).await?.ok_or_else(|| DiskError::NotFound { id: id.to_string() })
    }

    /// Delete the disk behind `id`. A disk that is already gone, before or
    /// during deletion, counts as deleted.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let (resource_group, name) = parse_disk_id(id)?;

        with_deadline(
            self.timeouts.delete,
            "deleting",
            &name,
            &resource_group,
            self.delete_inner(&resource_group, &name),
        )
        .await
    }

    async fn delete_inner(&self, resource_group: &str, name: &str) -> Result<()> {
        let api = |action: &'static str| api_error(action, name, resource_group);
        let url = self.disk_url(resource_group, name).map_err(api("addressing"))?;

        let response = match self.client.delete(&url).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Managed Disk {:?} was already deleted", name);
                return Ok(());
            },
            Err(e) => return Err(api("deleting")(e)),
        };

        let operation =
            LongRunningOperation::from_response(&self.client, &url, &response, self.poll);
        let waited = match operation {
            Ok(operation) => operation.wait().await,
            Err(e) => Err(e),
        };

        match waited {
            Ok(()) => {
                tracing::info!(
                    "Managed Disk {:?} (Resource Group {:?}) deleted",
                    name,
                    resource_group
                );
                Ok(())
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!("Managed Disk {:?} disappeared while waiting for deletion", name);
                Ok(())
            },
            Err(e) => Err(api("waiting for deletion of")(e)),
        }
    }

    fn disk_url(&self, resource_group: &str, name: &str) -> ApiResult<String> {
        self.client.resource_url(
            resource_group,
            &self.schema.namespace,
            &self.schema.resource_type,
            name,
            &self.schema.api_version,
        )
    }

    async fn fetch(&self, url: &str) -> ApiResult<Disk> {
        let response = self.client.get(url).await?;
        Ok(serde_json::from_value(response.body)?)
    }
}

/// Resource group and disk name addressed by `id`
fn parse_disk_id(id: &str) -> Result<(String, String)> {
    let parsed = ResourceId::parse(id)?;
    let name = parsed.element("disks")?.to_string();
    Ok((parsed.resource_group, name))
}

fn api_error<'a>(
    action: &'static str,
    name: &'a str,
    resource_group: &'a str,
) -> impl Fn(ApiError) -> DiskError + 'a {
    move |source| DiskError::Api {
        action,
        name: name.to_string(),
        resource_group: resource_group.to_string(),
        source,
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    action: &'static str,
    name: &str,
    resource_group: &str,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                "Timed out after {:?} {} Managed Disk {:?} (Resource Group {:?})",
                deadline,
                action,
                name,
                resource_group
            );
            Err(DiskError::Timeout {
                action,
                name: name.to_string(),
                resource_group: resource_group.to_string(),
                after: deadline,
            })
        },
    }
}
