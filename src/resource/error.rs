//! Error types for disk operations

use super::id::ResourceIdError;
use crate::azure::ApiError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`DiskError`]
pub type Result<T> = std::result::Result<T, DiskError>;

/// Errors surfaced by the managed disk handler
#[derive(Error, Debug)]
pub enum DiskError {
    /// Configuration rejected before any request was sent
    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error(transparent)]
    InvalidResourceId(#[from] ResourceIdError),

    /// An unmanaged resource already occupies the name
    #[error(
        "a resource with the ID {id:?} already exists - to be managed via this tool it needs to be imported into the state ({resource_type})"
    )]
    AlreadyExists { resource_type: String, id: String },

    #[error("error {action} Managed Disk {name:?} (Resource Group {resource_group:?}): {source}")]
    Api {
        action: &'static str,
        name: String,
        resource_group: String,
        #[source]
        source: ApiError,
    },

    #[error("timed out after {after:?} {action} Managed Disk {name:?} (Resource Group {resource_group:?})")]
    Timeout {
        action: &'static str,
        name: String,
        resource_group: String,
        after: Duration,
    },

    #[error("error reading Managed Disk {name:?} (Resource Group {resource_group:?}): ID was nil")]
    MissingId { name: String, resource_group: String },

    #[error("cannot import non-existent Managed Disk {id:?}")]
    NotFound { id: String },
}

impl DiskError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for errors raised before any request was sent
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidResourceId(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The underlying API error, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { source, .. } => Some(source),
            _ => None,
        }
    }
}
