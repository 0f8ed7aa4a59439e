//! Flat attribute record exchanged with the host
//!
//! [`DiskConfig`] mirrors the resource schema one attribute per field and is
//! the only (de)serialized form of a disk: configuration files come in as a
//! `DiskConfig`, and state goes out as one. Conversion into [`DiskSpec`]
//! validates; conversion from [`DiskState`] never fails.

use super::disk::{
    CreateOption, CreateSource, DiskEncryption, DiskSpec, DiskState, EncryptionSettings, OsType,
    Performance, StorageAccountType,
};
use super::error::{DiskError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Set once the disk exists; the persistent key of the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub storage_account_type: String,
    pub create_option: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_iops_read_write: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_mbps_read_write: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_encryption_set_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_settings: Option<EncryptionSettings>,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Treat empty strings as unset
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl DiskConfig {
    /// Companion attributes of the create-option union, in schema order
    fn companions(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("source_uri", non_empty(&self.source_uri)),
            ("storage_account_id", non_empty(&self.storage_account_id)),
            ("source_resource_id", non_empty(&self.source_resource_id)),
            ("image_reference_id", non_empty(&self.image_reference_id)),
        ]
    }

    fn create_source(&self, option: CreateOption) -> Result<CreateSource> {
        let allowed: &[&str] = match option {
            CreateOption::Empty => &[],
            CreateOption::Copy | CreateOption::Restore => &["source_resource_id"],
            CreateOption::Import => &["source_uri", "storage_account_id"],
            CreateOption::FromImage => &["image_reference_id"],
        };

        for (field, value) in self.companions() {
            if value.is_some() && !allowed.contains(&field) {
                return Err(DiskError::validation(format!(
                    "`{}` cannot be set when `create_option` is set to `{}`",
                    field, option
                )));
            }
        }

        let take = |value: Option<&str>| value.unwrap_or_default().to_string();

        Ok(match option {
            CreateOption::Empty => CreateSource::Empty,
            CreateOption::Copy => CreateSource::Copy {
                source_resource_id: take(non_empty(&self.source_resource_id)),
            },
            CreateOption::Restore => CreateSource::Restore {
                source_resource_id: take(non_empty(&self.source_resource_id)),
            },
            CreateOption::Import => CreateSource::Import {
                source_uri: take(non_empty(&self.source_uri)),
                storage_account_id: take(non_empty(&self.storage_account_id)),
            },
            CreateOption::FromImage => CreateSource::FromImage {
                image_reference_id: take(non_empty(&self.image_reference_id)),
            },
        })
    }
}

impl TryFrom<&DiskConfig> for DiskSpec {
    type Error = DiskError;

    fn try_from(config: &DiskConfig) -> Result<Self> {
        let storage_account_type: StorageAccountType = config.storage_account_type.parse()?;
        let create_option: CreateOption = config.create_option.parse()?;
        let source = config.create_source(create_option)?;

        if config.zones.len() > 1 {
            return Err(DiskError::validation(format!(
                "`zones` can contain at most one zone, got {}",
                config.zones.len()
            )));
        }

        let os_type = non_empty(&config.os_type).map(str::parse::<OsType>).transpose()?;

        let spec = DiskSpec {
            name: config.name.clone(),
            resource_group_name: config.resource_group_name.clone(),
            location: config.location.clone(),
            storage_account_type,
            source,
            // 0 is how older configurations leave the size to the server
            disk_size_gb: config.disk_size_gb.filter(|size| *size != 0),
            performance: Performance {
                iops_read_write: config.disk_iops_read_write,
                mbps_read_write: config.disk_mbps_read_write,
            },
            os_type,
            encryption: DiskEncryption::from_disk_encryption_set(
                config.disk_encryption_set_id.as_deref(),
            ),
            encryption_settings: config.encryption_settings.clone(),
            zone: config.zones.first().cloned(),
            tags: config.tags.clone(),
        };

        spec.validate()?;
        Ok(spec)
    }
}

impl TryFrom<DiskConfig> for DiskSpec {
    type Error = DiskError;

    fn try_from(config: DiskConfig) -> Result<Self> {
        DiskSpec::try_from(&config)
    }
}

impl From<&DiskState> for DiskConfig {
    fn from(state: &DiskState) -> Self {
        let non_empty_owned = |value: &Option<String>| non_empty(value).map(String::from);

        // ARM reports IOPS/MBps for every SKU; only Ultra disks accept them back
        let tunable = state
            .storage_account_type
            .parse::<StorageAccountType>()
            .is_ok_and(|sku| sku.supports_performance_tuning());

        DiskConfig {
            id: Some(state.id.clone()).filter(|id| !id.is_empty()),
            name: state.name.clone(),
            resource_group_name: state.resource_group_name.clone(),
            location: state.location.clone(),
            storage_account_type: state.storage_account_type.clone(),
            create_option: state.create_option.clone(),
            source_uri: non_empty_owned(&state.source_uri),
            source_resource_id: non_empty_owned(&state.source_resource_id),
            storage_account_id: non_empty_owned(&state.storage_account_id),
            image_reference_id: non_empty_owned(&state.image_reference_id),
            os_type: non_empty_owned(&state.os_type),
            disk_size_gb: state.disk_size_gb,
            disk_iops_read_write: state.disk_iops_read_write.filter(|_| tunable),
            disk_mbps_read_write: state.disk_mbps_read_write.filter(|_| tunable),
            disk_encryption_set_id: non_empty_owned(&state.disk_encryption_set_id),
            encryption_settings: state.encryption_settings.clone(),
            zones: state.zones.clone(),
            tags: state.tags.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT_ID: &str =
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/snapshots/snap";

    fn config(create_option: &str) -> DiskConfig {
        DiskConfig {
            name: "disk".to_string(),
            resource_group_name: "rg".to_string(),
            location: "West Europe".to_string(),
            storage_account_type: "premium_lrs".to_string(),
            create_option: create_option.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_yaml_config_parses() {
        let yaml = r#"
name: data-1
resource_group_name: rg
location: westeurope
storage_account_type: UltraSSD_LRS
create_option: Empty
disk_size_gb: 256
disk_iops_read_write: 500
zones: ["1"]
tags:
  env: prod
"#;
        let config: DiskConfig = serde_yaml::from_str(yaml).unwrap();
        let spec = DiskSpec::try_from(&config).unwrap();

        assert_eq!(spec.storage_account_type, StorageAccountType::UltraSsdLrs);
        assert_eq!(spec.performance.iops_read_write, Some(500));
        assert_eq!(spec.zone.as_deref(), Some("1"));
        assert_eq!(spec.tags.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_foreign_companion_is_rejected() {
        let mut c = config("Empty");
        c.source_uri = Some("https://x/y.vhd".to_string());
        let err = DiskSpec::try_from(&c).unwrap_err();
        assert!(err.to_string().contains("`source_uri` cannot be set"));

        let mut c = config("Copy");
        c.source_resource_id = Some(SNAPSHOT_ID.to_string());
        c.image_reference_id = Some("/img".to_string());
        assert!(DiskSpec::try_from(&c).is_err());
    }

    #[test]
    fn test_empty_strings_count_as_unset() {
        let mut c = config("Empty");
        c.source_uri = Some(String::new());
        c.disk_encryption_set_id = Some(String::new());
        c.os_type = Some(String::new());
        let spec = DiskSpec::try_from(&c).unwrap();
        assert_eq!(spec.encryption, DiskEncryption::PlatformKey);
        assert_eq!(spec.os_type, None);
    }

    #[test]
    fn test_restore_uses_source_resource_id() {
        let mut c = config("restore");
        c.source_resource_id = Some(SNAPSHOT_ID.to_string());
        let spec = DiskSpec::try_from(&c).unwrap();
        assert!(matches!(spec.source, CreateSource::Restore { .. }));
    }

    #[test]
    fn test_multiple_zones_rejected() {
        let mut c = config("Empty");
        c.zones = vec!["1".to_string(), "2".to_string()];
        assert!(DiskSpec::try_from(&c).unwrap_err().is_validation());
    }

    #[test]
    fn test_state_flattens_to_config() {
        let state = DiskState {
            id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/disk"
                .to_string(),
            name: "disk".to_string(),
            resource_group_name: "rg".to_string(),
            location: "westeurope".to_string(),
            storage_account_type: "Premium_LRS".to_string(),
            create_option: "Empty".to_string(),
            source_uri: Some(String::new()),
            disk_size_gb: Some(32),
            ..Default::default()
        };

        let config = DiskConfig::from(&state);
        assert_eq!(config.id.as_deref(), Some(state.id.as_str()));
        assert_eq!(config.source_uri, None);
        assert_eq!(config.disk_size_gb, Some(32));

        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("source_uri").is_none());
        assert_eq!(json["zones"], serde_json::json!([]));

        assert!(DiskSpec::try_from(&config).is_ok());
    }

    #[test]
    fn test_server_reported_performance_dropped_for_premium_state() {
        let state = DiskState {
            id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/disk"
                .to_string(),
            name: "disk".to_string(),
            resource_group_name: "rg".to_string(),
            location: "westeurope".to_string(),
            storage_account_type: "Premium_LRS".to_string(),
            create_option: "Empty".to_string(),
            disk_size_gb: Some(32),
            disk_iops_read_write: Some(500),
            disk_mbps_read_write: Some(100),
            ..Default::default()
        };

        let config = DiskConfig::from(&state);
        assert_eq!(config.disk_iops_read_write, None);
        assert_eq!(config.disk_mbps_read_write, None);

        let spec = DiskSpec::try_from(&config).unwrap();
        assert!(!spec.performance.is_set());
    }

    #[test]
    fn test_server_reported_performance_kept_for_ultra_state() {
        let state = DiskState {
            name: "disk".to_string(),
            resource_group_name: "rg".to_string(),
            location: "westeurope".to_string(),
            storage_account_type: "UltraSSD_LRS".to_string(),
            create_option: "Empty".to_string(),
            disk_size_gb: Some(4),
            disk_iops_read_write: Some(500),
            disk_mbps_read_write: Some(100),
            ..Default::default()
        };

        let spec = DiskSpec::try_from(&DiskConfig::from(&state)).unwrap();
        assert_eq!(spec.performance.iops_read_write, Some(500));
        assert_eq!(spec.performance.mbps_read_write, Some(100));
    }

    #[test]
    fn test_zero_disk_size_means_unset() {
        let mut c = config("Copy");
        c.source_resource_id = Some(SNAPSHOT_ID.to_string());
        c.disk_size_gb = Some(0);

        let spec = DiskSpec::try_from(&c).unwrap();
        assert_eq!(spec.disk_size_gb, None);
    }
}
