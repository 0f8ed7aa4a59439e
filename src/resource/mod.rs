//! Managed disk resource
//!
//! This module implements the `azurerm_managed_disk` resource on top of the
//! [`crate::azure`] transport layer. The resource schema (attribute flags,
//! ARM coordinates, default timeouts) is loaded from embedded JSON.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource schemas from embedded JSON
//! - [`attributes`] - Flat attribute record read from config and written to state
//! - [`disk`] - Validated desired state ([`DiskSpec`]) and observed state ([`DiskState`])
//! - [`model`] - ARM wire representation of `Microsoft.Compute/disks`
//! - [`id`] - ARM resource ID parsing
//! - [`plan`] - Change detection between stored and desired attributes
//! - [`handler`] - Create/update, read, import and delete against ARM
//!
//! # Example
//!
//! ```ignore
//! use azdisk::resource::{DiskConfig, DiskResourceHandler, DiskSpec};
//!
//! async fn apply(handler: &DiskResourceHandler, config: DiskConfig) -> anyhow::Result<()> {
//!     let spec = DiskSpec::try_from(&config)?;
//!     let state = handler.create_or_update(&spec, config.id.is_none()).await?;
//!     println!("{}", state.id);
//!     Ok(())
//! }
//! ```

pub mod attributes;
pub mod disk;
pub mod error;
pub mod handler;
pub mod id;
pub mod model;
pub mod plan;
pub mod registry;

pub use attributes::DiskConfig;
pub use disk::{
    CreateOption, CreateSource, DiskEncryption, DiskSpec, DiskState, EncryptionSettings, OsType,
    Performance, StorageAccountType,
};
pub use error::{DiskError, Result};
pub use handler::{DiskResourceHandler, Features};
pub use id::{ResourceId, ResourceIdError};
pub use plan::{plan, Plan};
pub use registry::{get_schema, managed_disk_schema, ResourceSchema, Timeouts, MANAGED_DISK};
