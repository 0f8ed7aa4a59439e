//! ARM wire format for `Microsoft.Compute/disks` (api-version 2019-07-01)
//!
//! Every nested structure is optional: ARM omits what is unset, and a missing
//! block maps to unset fields in [`DiskState`], never to an error.

use super::disk::{
    normalize_location, CreateSource, DiskEncryptionKey, DiskSpec, DiskState, EncryptionSettings,
    KeyEncryptionKey,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<DiskSku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<DiskProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskSku {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_data: Option<CreationData>,
    #[serde(rename = "diskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<u32>,
    #[serde(rename = "diskIOPSReadWrite", default, skip_serializing_if = "Option::is_none")]
    pub disk_iops_read_write: Option<u64>,
    #[serde(rename = "diskMBpsReadWrite", default, skip_serializing_if = "Option::is_none")]
    pub disk_mbps_read_write: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<Encryption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_settings_collection: Option<EncryptionSettingsCollection>,
    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
    #[serde(default, skip_serializing)]
    pub time_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationData {
    #[serde(default)]
    pub create_option: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<ImageDiskReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageDiskReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encryption {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_encryption_set_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSettingsCollection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_settings: Option<Vec<EncryptionSettingsElement>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSettingsElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_encryption_key: Option<KeyVaultAndSecretReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_encryption_key: Option<KeyVaultAndKeyReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultAndSecretReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_vault: Option<SourceVault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultAndKeyReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_vault: Option<SourceVault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceVault {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SourceVault {
    fn new(id: &str) -> Option<Self> {
        Some(Self {
            id: Some(id.to_string()),
        })
    }
}

// =============================================================================
// Expand: spec -> request body
// =============================================================================

impl From<&CreateSource> for CreationData {
    fn from(source: &CreateSource) -> Self {
        let mut data = CreationData {
            create_option: source.create_option().as_str().to_string(),
            ..Default::default()
        };

        match source {
            CreateSource::Empty => {},
            CreateSource::Copy { source_resource_id }
            | CreateSource::Restore { source_resource_id } => {
                data.source_resource_id = Some(source_resource_id.clone());
            },
            CreateSource::Import {
                source_uri,
                storage_account_id,
            } => {
                data.source_uri = Some(source_uri.clone());
                data.storage_account_id = Some(storage_account_id.clone());
            },
            CreateSource::FromImage { image_reference_id } => {
                data.image_reference = Some(ImageDiskReference {
                    id: Some(image_reference_id.clone()),
                });
            },
        }

        data
    }
}

impl From<&EncryptionSettings> for EncryptionSettingsCollection {
    fn from(settings: &EncryptionSettings) -> Self {
        let element = EncryptionSettingsElement {
            disk_encryption_key: settings.disk_encryption_key.as_ref().map(|key| {
                KeyVaultAndSecretReference {
                    source_vault: SourceVault::new(&key.source_vault_id),
                    secret_url: Some(key.secret_url.clone()),
                }
            }),
            key_encryption_key: settings.key_encryption_key.as_ref().map(|key| {
                KeyVaultAndKeyReference {
                    source_vault: SourceVault::new(&key.source_vault_id),
                    key_url: Some(key.key_url.clone()),
                }
            }),
        };

        let has_keys =
            element.disk_encryption_key.is_some() || element.key_encryption_key.is_some();

        EncryptionSettingsCollection {
            enabled: settings.enabled,
            encryption_settings: has_keys.then(|| vec![element]),
        }
    }
}

impl From<&DiskSpec> for Disk {
    fn from(spec: &DiskSpec) -> Self {
        let performance = if spec.storage_account_type.supports_performance_tuning() {
            spec.performance
        } else {
            Default::default()
        };

        let properties = DiskProperties {
            creation_data: Some(CreationData::from(&spec.source)),
            disk_size_gb: spec.disk_size_gb,
            disk_iops_read_write: performance.iops_read_write,
            disk_mbps_read_write: performance.mbps_read_write,
            os_type: spec.os_type.map(|os| os.as_str().to_string()),
            encryption: Some(Encryption {
                kind: Some(spec.encryption.arm_type().to_string()),
                disk_encryption_set_id: spec.encryption.disk_encryption_set_id().map(String::from),
            }),
            encryption_settings_collection: spec
                .encryption_settings
                .as_ref()
                .map(EncryptionSettingsCollection::from),
            provisioning_state: None,
            time_created: None,
        };

        Disk {
            id: None,
            name: Some(spec.name.clone()),
            location: Some(normalize_location(&spec.location)),
            sku: Some(DiskSku {
                name: spec.storage_account_type.as_str().to_string(),
            }),
            zones: spec.zone.clone().map(|zone| vec![zone]),
            tags: Some(spec.tags.clone()),
            properties: Some(properties),
        }
    }
}

// =============================================================================
// Flatten: response body -> state
// =============================================================================

fn flatten_encryption_settings(collection: &EncryptionSettingsCollection) -> EncryptionSettings {
    let first = collection
        .encryption_settings
        .as_ref()
        .and_then(|settings| settings.first());

    EncryptionSettings {
        enabled: collection.enabled,
        disk_encryption_key: first
            .and_then(|e| e.disk_encryption_key.as_ref())
            .map(|key| DiskEncryptionKey {
                secret_url: key.secret_url.clone().unwrap_or_default(),
                source_vault_id: key
                    .source_vault
                    .as_ref()
                    .and_then(|v| v.id.clone())
                    .unwrap_or_default(),
            }),
        key_encryption_key: first
            .and_then(|e| e.key_encryption_key.as_ref())
            .map(|key| KeyEncryptionKey {
                key_url: key.key_url.clone().unwrap_or_default(),
                source_vault_id: key
                    .source_vault
                    .as_ref()
                    .and_then(|v| v.id.clone())
                    .unwrap_or_default(),
            }),
    }
}

impl DiskState {
    /// Flatten an ARM response; `resource_group_name` comes from the id the
    /// caller addressed, as ARM does not echo it back as a field
    pub fn from_disk(disk: Disk, resource_group_name: &str) -> Self {
        let properties = disk.properties.unwrap_or_default();
        let creation = properties.creation_data.unwrap_or_default();
        let encryption = properties.encryption.unwrap_or_default();

        DiskState {
            id: disk.id.unwrap_or_default(),
            name: disk.name.unwrap_or_default(),
            resource_group_name: resource_group_name.to_string(),
            location: disk.location.as_deref().map(normalize_location).unwrap_or_default(),
            storage_account_type: disk.sku.map(|sku| sku.name).unwrap_or_default(),
            create_option: creation.create_option,
            source_uri: creation.source_uri,
            source_resource_id: creation.source_resource_id,
            storage_account_id: creation.storage_account_id,
            image_reference_id: creation.image_reference.and_then(|r| r.id),
            disk_size_gb: properties.disk_size_gb,
            disk_iops_read_write: properties.disk_iops_read_write,
            disk_mbps_read_write: properties.disk_mbps_read_write,
            os_type: properties.os_type.filter(|s| !s.is_empty()),
            encryption_type: encryption.kind,
            disk_encryption_set_id: encryption.disk_encryption_set_id,
            encryption_settings: properties
                .encryption_settings_collection
                .as_ref()
                .map(flatten_encryption_settings),
            zones: disk.zones.unwrap_or_default(),
            tags: disk.tags.unwrap_or_default(),
            provisioning_state: properties.provisioning_state,
            time_created: properties.time_created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::disk::{DiskEncryption, OsType, StorageAccountType};
    use serde_json::json;

    #[test]
    fn test_expand_import_request_body() {
        let mut spec = DiskSpec::new(
            "data",
            "rg",
            "West Europe",
            StorageAccountType::StandardLrs,
            CreateSource::Import {
                source_uri: "https://x/y.vhd".to_string(),
                storage_account_id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct".to_string(),
            },
        );
        spec.os_type = Some(OsType::Linux);
        spec.zone = Some("1".to_string());

        let body = serde_json::to_value(Disk::from(&spec)).unwrap();

        assert_eq!(body["location"], "westeurope");
        assert_eq!(body["sku"]["name"], "Standard_LRS");
        assert_eq!(body["zones"], json!(["1"]));
        assert_eq!(body["properties"]["creationData"]["createOption"], "Import");
        assert_eq!(body["properties"]["creationData"]["sourceUri"], "https://x/y.vhd");
        assert!(body["properties"]["creationData"]["storageAccountId"]
            .as_str()
            .unwrap()
            .ends_with("/acct"));
        assert!(body["properties"]["creationData"].get("imageReference").is_none());
        assert_eq!(body["properties"]["osType"], "Linux");
        assert_eq!(
            body["properties"]["encryption"]["type"],
            "EncryptionAtRestWithPlatformKey"
        );
        assert!(body["properties"].get("diskSizeGB").is_none());
        assert!(body["properties"].get("provisioningState").is_none());
    }

    #[test]
    fn test_expand_customer_key_and_ultra_performance() {
        let mut spec = DiskSpec::new(
            "ultra",
            "rg",
            "eastus",
            StorageAccountType::UltraSsdLrs,
            CreateSource::FromImage {
                image_reference_id: "/subscriptions/s/providers/Microsoft.Compute/locations/eastus/publishers/p/artifactTypes/VMImage/offers/o/skus/k/versions/1".to_string(),
            },
        );
        spec.disk_size_gb = Some(64);
        spec.performance.iops_read_write = Some(500);
        spec.performance.mbps_read_write = Some(0);
        spec.encryption = DiskEncryption::CustomerKey {
            disk_encryption_set_id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/diskEncryptionSets/des".to_string(),
        };

        let body = serde_json::to_value(Disk::from(&spec)).unwrap();
        let props = &body["properties"];

        assert_eq!(props["diskSizeGB"], 64);
        assert_eq!(props["diskIOPSReadWrite"], 500);
        assert_eq!(props["diskMBpsReadWrite"], 0);
        assert_eq!(props["encryption"]["type"], "EncryptionAtRestWithCustomerKey");
        assert!(props["encryption"]["diskEncryptionSetId"]
            .as_str()
            .unwrap()
            .ends_with("/des"));
        assert!(props["creationData"]["imageReference"]["id"].is_string());
    }

    #[test]
    fn test_flatten_tolerates_missing_blocks() {
        let disk: Disk = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/d",
            "name": "d"
        }))
        .unwrap();

        let state = DiskState::from_disk(disk, "rg");
        assert_eq!(state.name, "d");
        assert_eq!(state.resource_group_name, "rg");
        assert_eq!(state.create_option, "");
        assert_eq!(state.disk_size_gb, None);
        assert!(state.zones.is_empty());
        assert!(state.tags.is_empty());
        assert!(state.encryption_settings.is_none());
    }

    #[test]
    fn test_flatten_full_response() {
        let disk: Disk = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/d",
            "name": "d",
            "location": "West Europe",
            "sku": {"name": "Premium_LRS", "tier": "Premium"},
            "zones": ["2"],
            "tags": {"env": "prod"},
            "properties": {
                "creationData": {
                    "createOption": "Copy",
                    "sourceResourceId": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/src"
                },
                "diskSizeGB": 128,
                "encryption": {"type": "EncryptionAtRestWithPlatformKey"},
                "encryptionSettingsCollection": {
                    "enabled": true,
                    "encryptionSettings": [{
                        "diskEncryptionKey": {
                            "secretUrl": "https://vault.vault.azure.net/secrets/s/1",
                            "sourceVault": {"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/vault"}
                        }
                    }]
                },
                "provisioningState": "Succeeded",
                "timeCreated": "2020-01-02T03:04:05.6789012+00:00",
                "diskState": "Unattached"
            }
        }))
        .unwrap();

        let state = DiskState::from_disk(disk, "rg");
        assert_eq!(state.location, "westeurope");
        assert_eq!(state.storage_account_type, "Premium_LRS");
        assert_eq!(state.create_option, "Copy");
        assert!(state.source_resource_id.as_deref().unwrap().ends_with("/src"));
        assert_eq!(state.disk_size_gb, Some(128));
        assert_eq!(state.zones, vec!["2".to_string()]);
        assert_eq!(state.tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(state.provisioning_state.as_deref(), Some("Succeeded"));
        assert!(state.time_created.is_some());

        let settings = state.encryption_settings.unwrap();
        assert!(settings.enabled);
        assert!(settings.key_encryption_key.is_none());
        assert_eq!(
            settings.disk_encryption_key.unwrap().secret_url,
            "https://vault.vault.azure.net/secrets/s/1"
        );
    }
}
