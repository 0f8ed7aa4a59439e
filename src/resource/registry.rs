//! Schema Registry - Load resource schemas from JSON
//!
//! This module loads the resource schemas from embedded JSON files and
//! provides lookup functions for the rest of the crate: attribute flags
//! (required, computed, ForceNew, case-insensitive comparison), the ARM
//! coordinates of the resource type and its default operation timeouts.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

/// Embedded schema JSON files (compiled into the binary)
const SCHEMA_FILES: &[&str] = &[include_str!("../resources/managed_disk.json")];

/// Registry key of the managed disk resource
pub const MANAGED_DISK: &str = "azurerm_managed_disk";

/// Value kind of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    String,
    Int,
    Bool,
    List,
    Map,
    Block,
}

/// Attribute definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeDef {
    pub kind: AttributeKind,
    #[serde(default)]
    pub required: bool,
    /// Server may fill the value when the user leaves it unset
    #[serde(default)]
    pub computed: bool,
    /// Changing the value destroys and recreates the resource
    #[serde(default)]
    pub force_new: bool,
    /// Values differing only in case are the same value
    #[serde(default)]
    pub case_insensitive: bool,
}

/// Default operation timeouts from JSON, in minutes
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeoutsDef {
    pub create_minutes: u64,
    pub read_minutes: u64,
    pub update_minutes: u64,
    pub delete_minutes: u64,
}

/// Per-operation deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl From<TimeoutsDef> for Timeouts {
    fn from(def: TimeoutsDef) -> Self {
        let minutes = |m: u64| Duration::from_secs(m * 60);
        Self {
            create: minutes(def.create_minutes),
            read: minutes(def.read_minutes),
            update: minutes(def.update_minutes),
            delete: minutes(def.delete_minutes),
        }
    }
}

/// Resource schema from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSchema {
    pub display_name: String,
    pub namespace: String,
    pub resource_type: String,
    pub api_version: String,
    pub timeouts: TimeoutsDef,
    pub attributes: BTreeMap<String, AttributeDef>,
}

impl ResourceSchema {
    /// Attribute definition by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.get(name)
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(_, def)| def.force_new)
            .map(|(name, _)| name.as_str())
    }

    /// Default deadlines for each operation
    pub fn default_timeouts(&self) -> Timeouts {
        self.timeouts.into()
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceSchema>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<SchemaConfig> = OnceLock::new();

/// Get the schema registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static SchemaConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = SchemaConfig {
            resources: BTreeMap::new(),
        };

        for content in SCHEMA_FILES {
            let partial: SchemaConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded schema JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        final_config
    })
}

/// Get a resource schema by key
pub fn get_schema(key: &str) -> Option<&'static ResourceSchema> {
    get_registry().resources.get(key)
}

/// The managed disk schema
pub fn managed_disk_schema() -> &'static ResourceSchema {
    get_schema(MANAGED_DISK).unwrap_or_else(|| panic!("{} schema is not embedded", MANAGED_DISK))
}
