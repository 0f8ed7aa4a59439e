//! Managed disk resource handler for the Azure Resource Manager.
//!
//! - [`azure`] - ARM transport: credentials, HTTP, long-running operations
//! - [`resource`] - The `azurerm_managed_disk` resource and its handler
//! - [`config`] - Persistent configuration and client construction

pub mod azure;
pub mod config;
pub mod resource;

/// Version injected at compile time via AZDISK_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("AZDISK_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
