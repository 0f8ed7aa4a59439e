//! Managed disk domain types
//!
//! [`DiskSpec`] is what the user declares, validated before any request is
//! sent. [`DiskState`] is the canonical server-side view fetched after every
//! mutation and on refresh.

use super::error::{DiskError, Result};
use super::id::validate_resource_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Largest disk ARM accepts, in GB
pub const MAX_DISK_SIZE_GB: u32 = 32767;

const MAX_TAG_COUNT: usize = 50;
const MAX_TAG_KEY_LENGTH: usize = 512;
const MAX_TAG_VALUE_LENGTH: usize = 256;

/// Find the variant whose canonical name equals `value` ignoring case
fn match_ignore_case<T: Copy>(value: &str, candidates: &[(T, &str)]) -> Option<T> {
    candidates
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(value.trim()))
        .map(|(v, _)| *v)
}

/// Storage class (the disk SKU)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageAccountType {
    StandardLrs,
    PremiumLrs,
    StandardSsdLrs,
    UltraSsdLrs,
}

impl StorageAccountType {
    pub const ALL: [StorageAccountType; 4] = [
        Self::StandardLrs,
        Self::PremiumLrs,
        Self::StandardSsdLrs,
        Self::UltraSsdLrs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StandardLrs => "Standard_LRS",
            Self::PremiumLrs => "Premium_LRS",
            Self::StandardSsdLrs => "StandardSSD_LRS",
            Self::UltraSsdLrs => "UltraSSD_LRS",
        }
    }

    /// IOPS and throughput can only be provisioned on Ultra disks
    pub fn supports_performance_tuning(&self) -> bool {
        matches!(self, Self::UltraSsdLrs)
    }
}

impl FromStr for StorageAccountType {
    type Err = DiskError;

    /// Case-insensitive: historical configurations use mixed case
    fn from_str(s: &str) -> Result<Self> {
        let candidates = Self::ALL.map(|v| (v, v.as_str()));
        match_ignore_case(s, &candidates).ok_or_else(|| {
            DiskError::validation(format!(
                "`storage_account_type` must be one of Standard_LRS, Premium_LRS, StandardSSD_LRS, UltraSSD_LRS, got {:?}",
                s
            ))
        })
    }
}

impl fmt::Display for StorageAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance mode of a new disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreateOption {
    Copy,
    Empty,
    FromImage,
    Import,
    Restore,
}

impl CreateOption {
    pub const ALL: [CreateOption; 5] = [
        Self::Copy,
        Self::Empty,
        Self::FromImage,
        Self::Import,
        Self::Restore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "Copy",
            Self::Empty => "Empty",
            Self::FromImage => "FromImage",
            Self::Import => "Import",
            Self::Restore => "Restore",
        }
    }
}

impl FromStr for CreateOption {
    type Err = DiskError;

    fn from_str(s: &str) -> Result<Self> {
        let candidates = Self::ALL.map(|v| (v, v.as_str()));
        match_ignore_case(s, &candidates).ok_or_else(|| {
            DiskError::validation(format!(
                "`create_option` must be one of Copy, Empty, FromImage, Import, Restore, got {:?}",
                s
            ))
        })
    }
}

impl fmt::Display for CreateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the disk's initial content comes from; each variant carries exactly
/// the references its create option needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateSource {
    Empty,
    Copy { source_resource_id: String },
    Restore { source_resource_id: String },
    Import {
        source_uri: String,
        storage_account_id: String,
    },
    FromImage { image_reference_id: String },
}

impl CreateSource {
    pub fn create_option(&self) -> CreateOption {
        match self {
            Self::Empty => CreateOption::Empty,
            Self::Copy { .. } => CreateOption::Copy,
            Self::Restore { .. } => CreateOption::Restore,
            Self::Import { .. } => CreateOption::Import,
            Self::FromImage { .. } => CreateOption::FromImage,
        }
    }

    fn validate(&self) -> Result<()> {
        let require = |field: &str, value: &str, options: &str| {
            if value.trim().is_empty() {
                Err(DiskError::validation(format!(
                    "`{}` must be specified when `create_option` is set to `{}`",
                    field, options
                )))
            } else {
                Ok(())
            }
        };

        match self {
            Self::Empty => Ok(()),
            Self::Copy { source_resource_id } | Self::Restore { source_resource_id } => {
                require("source_resource_id", source_resource_id, "Copy` or `Restore")
            },
            Self::Import {
                source_uri,
                storage_account_id,
            } => {
                require("source_uri", source_uri, "Import")?;
                require("storage_account_id", storage_account_id, "Import")?;
                validate_resource_id("storage_account_id", storage_account_id)
                    .map_err(DiskError::Validation)
            },
            Self::FromImage { image_reference_id } => {
                require("image_reference_id", image_reference_id, "FromImage")
            },
        }
    }
}

/// Operating system hint for OS disks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Windows,
    Linux,
}

impl OsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
        }
    }
}

impl FromStr for OsType {
    type Err = DiskError;

    fn from_str(s: &str) -> Result<Self> {
        match_ignore_case(s, &[(Self::Windows, "Windows"), (Self::Linux, "Linux")]).ok_or_else(
            || DiskError::validation(format!("`os_type` must be Windows or Linux, got {:?}", s)),
        )
    }
}

/// Provisioned performance, only meaningful on Ultra disks.
///
/// `None` means unset and is never sent; `Some(0)` is an explicit value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Performance {
    pub iops_read_write: Option<u64>,
    pub mbps_read_write: Option<u32>,
}

impl Performance {
    pub fn is_set(&self) -> bool {
        self.iops_read_write.is_some() || self.mbps_read_write.is_some()
    }
}

/// Encryption at rest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DiskEncryption {
    #[default]
    PlatformKey,
    CustomerKey { disk_encryption_set_id: String },
}

impl DiskEncryption {
    pub const PLATFORM_KEY: &'static str = "EncryptionAtRestWithPlatformKey";
    pub const CUSTOMER_KEY: &'static str = "EncryptionAtRestWithCustomerKey";

    /// Customer-managed only when a disk encryption set is referenced
    pub fn from_disk_encryption_set(id: Option<&str>) -> Self {
        match id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Self::CustomerKey {
                disk_encryption_set_id: id.to_string(),
            },
            None => Self::PlatformKey,
        }
    }

    pub fn arm_type(&self) -> &'static str {
        match self {
            Self::PlatformKey => Self::PLATFORM_KEY,
            Self::CustomerKey { .. } => Self::CUSTOMER_KEY,
        }
    }

    pub fn disk_encryption_set_id(&self) -> Option<&str> {
        match self {
            Self::PlatformKey => None,
            Self::CustomerKey {
                disk_encryption_set_id,
            } => Some(disk_encryption_set_id),
        }
    }
}

/// Key Vault secret holding the disk encryption key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskEncryptionKey {
    pub secret_url: String,
    pub source_vault_id: String,
}

/// Key Vault key wrapping the disk encryption key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEncryptionKey {
    pub key_url: String,
    pub source_vault_id: String,
}

/// Legacy Azure Disk Encryption settings block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_encryption_key: Option<DiskEncryptionKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_encryption_key: Option<KeyEncryptionKey>,
}

impl EncryptionSettings {
    fn validate(&self) -> Result<()> {
        if let Some(key) = &self.disk_encryption_key {
            if key.secret_url.trim().is_empty() {
                return Err(DiskError::validation(
                    "`encryption_settings.disk_encryption_key.secret_url` must not be empty",
                ));
            }
            validate_resource_id(
                "encryption_settings.disk_encryption_key.source_vault_id",
                &key.source_vault_id,
            )
            .map_err(DiskError::Validation)?;
        }
        if let Some(key) = &self.key_encryption_key {
            if key.key_url.trim().is_empty() {
                return Err(DiskError::validation(
                    "`encryption_settings.key_encryption_key.key_url` must not be empty",
                ));
            }
            validate_resource_id(
                "encryption_settings.key_encryption_key.source_vault_id",
                &key.source_vault_id,
            )
            .map_err(DiskError::Validation)?;
        }
        Ok(())
    }
}

/// Lowercase with spaces removed: "West Europe" -> "westeurope"
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// User-declared managed disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskSpec {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub storage_account_type: StorageAccountType,
    pub source: CreateSource,
    pub disk_size_gb: Option<u32>,
    pub performance: Performance,
    pub os_type: Option<OsType>,
    pub encryption: DiskEncryption,
    pub encryption_settings: Option<EncryptionSettings>,
    pub zone: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl DiskSpec {
    /// A minimal empty disk; the remaining fields default to unset
    pub fn new(
        name: &str,
        resource_group_name: &str,
        location: &str,
        storage_account_type: StorageAccountType,
        source: CreateSource,
    ) -> Self {
        Self {
            name: name.to_string(),
            resource_group_name: resource_group_name.to_string(),
            location: location.to_string(),
            storage_account_type,
            source,
            disk_size_gb: None,
            performance: Performance::default(),
            os_type: None,
            encryption: DiskEncryption::PlatformKey,
            encryption_settings: None,
            zone: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn create_option(&self) -> CreateOption {
        self.source.create_option()
    }

    /// Checks that need no network access
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("resource_group_name", &self.resource_group_name),
            ("location", &self.location),
        ] {
            if value.trim().is_empty() {
                return Err(DiskError::validation(format!("`{}` must not be empty", field)));
            }
        }

        if let Some(size) = self.disk_size_gb {
            if !(1..=MAX_DISK_SIZE_GB).contains(&size) {
                return Err(DiskError::validation(format!(
                    "`disk_size_gb` can only be between 1 and {}, got {}",
                    MAX_DISK_SIZE_GB, size
                )));
            }
        }

        if self.performance.is_set() && !self.storage_account_type.supports_performance_tuning() {
            return Err(DiskError::validation(
                "`disk_iops_read_write` and `disk_mbps_read_write` are only available for UltraSSD disks",
            ));
        }

        self.source.validate()?;

        if let Some(id) = self.encryption.disk_encryption_set_id() {
            validate_resource_id("disk_encryption_set_id", id).map_err(DiskError::Validation)?;
        }

        if let Some(settings) = &self.encryption_settings {
            settings.validate()?;
        }

        if let Some(zone) = &self.zone {
            if zone.trim().is_empty() {
                return Err(DiskError::validation("`zones` must not contain an empty zone"));
            }
        }

        validate_tags(&self.tags)
    }
}

fn validate_tags(tags: &BTreeMap<String, String>) -> Result<()> {
    if tags.len() > MAX_TAG_COUNT {
        return Err(DiskError::validation(format!(
            "a maximum of {} tags can be applied to each resource, got {}",
            MAX_TAG_COUNT,
            tags.len()
        )));
    }

    for (key, value) in tags {
        if key.len() > MAX_TAG_KEY_LENGTH {
            return Err(DiskError::validation(format!(
                "the maximum length for a tag key is {} characters: {:?} is {} characters",
                MAX_TAG_KEY_LENGTH,
                key,
                key.len()
            )));
        }
        if value.len() > MAX_TAG_VALUE_LENGTH {
            return Err(DiskError::validation(format!(
                "the maximum length for a tag value is {} characters: the value for {:?} is {} characters",
                MAX_TAG_VALUE_LENGTH,
                key,
                value.len()
            )));
        }
    }

    Ok(())
}

/// Canonical server-side view of a managed disk.
///
/// Absent nested structures in the ARM response leave the matching fields
/// unset; they are never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskState {
    pub id: String,
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub storage_account_type: String,
    pub create_option: String,
    pub source_uri: Option<String>,
    pub source_resource_id: Option<String>,
    pub storage_account_id: Option<String>,
    pub image_reference_id: Option<String>,
    pub disk_size_gb: Option<u32>,
    pub disk_iops_read_write: Option<u64>,
    pub disk_mbps_read_write: Option<u32>,
    pub os_type: Option<String>,
    pub encryption_type: Option<String>,
    pub disk_encryption_set_id: Option<String>,
    pub encryption_settings: Option<EncryptionSettings>,
    pub zones: Vec<String>,
    pub tags: BTreeMap<String, String>,
    pub provisioning_state: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT_ID: &str =
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct";

    fn spec(sku: StorageAccountType, source: CreateSource) -> DiskSpec {
        DiskSpec::new("disk", "rg", "westeurope", sku, source)
    }

    #[test]
    fn test_storage_account_type_is_case_insensitive() {
        assert_eq!(
            "Premium_LRS".parse::<StorageAccountType>().unwrap(),
            StorageAccountType::PremiumLrs
        );
        assert_eq!(
            "premium_lrs".parse::<StorageAccountType>().unwrap(),
            StorageAccountType::PremiumLrs
        );
        assert_eq!(
            "ULTRASSD_LRS".parse::<StorageAccountType>().unwrap(),
            StorageAccountType::UltraSsdLrs
        );
        assert!("Premium_ZRS".parse::<StorageAccountType>().unwrap_err().is_validation());
    }

    #[test]
    fn test_create_option_parse() {
        assert_eq!("fromimage".parse::<CreateOption>().unwrap(), CreateOption::FromImage);
        assert!("Attach".parse::<CreateOption>().is_err());
    }

    #[test]
    fn test_performance_requires_ultra() {
        let mut disk = spec(StorageAccountType::PremiumLrs, CreateSource::Empty);
        disk.performance.iops_read_write = Some(500);
        assert!(disk.validate().unwrap_err().is_validation());

        disk.performance = Performance {
            iops_read_write: None,
            mbps_read_write: Some(0),
        };
        assert!(disk.validate().is_err(), "explicit zero still counts as set");

        disk.storage_account_type = StorageAccountType::UltraSsdLrs;
        disk.performance.iops_read_write = Some(500);
        assert!(disk.validate().is_ok());
    }

    #[test]
    fn test_companion_fields() {
        let import = CreateSource::Import {
            source_uri: "https://x/y.vhd".to_string(),
            storage_account_id: ACCOUNT_ID.to_string(),
        };
        assert!(spec(StorageAccountType::StandardLrs, import).validate().is_ok());

        let import_without_account = CreateSource::Import {
            source_uri: "https://x/y.vhd".to_string(),
            storage_account_id: String::new(),
        };
        let err = spec(StorageAccountType::StandardLrs, import_without_account)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("storage_account_id"));

        let bad_account = CreateSource::Import {
            source_uri: "https://x/y.vhd".to_string(),
            storage_account_id: "acct".to_string(),
        };
        assert!(spec(StorageAccountType::StandardLrs, bad_account).validate().is_err());

        let copy = CreateSource::Copy {
            source_resource_id: " ".to_string(),
        };
        assert!(spec(StorageAccountType::StandardLrs, copy).validate().is_err());

        let image = CreateSource::FromImage {
            image_reference_id: String::new(),
        };
        let err = spec(StorageAccountType::StandardLrs, image).validate().unwrap_err();
        assert!(err.to_string().contains("image_reference_id"));
    }

    #[test]
    fn test_disk_size_bounds() {
        let mut disk = spec(StorageAccountType::StandardLrs, CreateSource::Empty);
        disk.disk_size_gb = Some(0);
        assert!(disk.validate().is_err());
        disk.disk_size_gb = Some(MAX_DISK_SIZE_GB + 1);
        assert!(disk.validate().is_err());
        disk.disk_size_gb = Some(MAX_DISK_SIZE_GB);
        assert!(disk.validate().is_ok());
    }

    #[test]
    fn test_encryption_defaults_to_platform_key() {
        assert_eq!(DiskEncryption::from_disk_encryption_set(None), DiskEncryption::PlatformKey);
        assert_eq!(DiskEncryption::from_disk_encryption_set(Some("")), DiskEncryption::PlatformKey);

        let des_id =
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/diskEncryptionSets/des";
        let cmk = DiskEncryption::from_disk_encryption_set(Some(des_id));
        assert_eq!(cmk.arm_type(), DiskEncryption::CUSTOMER_KEY);
        assert!(cmk.disk_encryption_set_id().unwrap().ends_with("/des"));
    }

    #[test]
    fn test_tag_limits() {
        let mut disk = spec(StorageAccountType::StandardLrs, CreateSource::Empty);
        disk.tags = (0..51).map(|i| (format!("k{}", i), "v".to_string())).collect();
        assert!(disk.validate().is_err());

        disk.tags = BTreeMap::from([("env".to_string(), "x".repeat(257))]);
        assert!(disk.validate().is_err());

        disk.tags = BTreeMap::from([("env".to_string(), "prod".to_string())]);
        assert!(disk.validate().is_ok());
    }

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("eastus2"), "eastus2");
    }
}
