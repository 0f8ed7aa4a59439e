//! ARM resource identifiers
//!
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A parsed ARM resource id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: Option<String>,
    /// Remaining `key/value` pairs, e.g. `disks -> my-disk`
    pub path: BTreeMap<String, String>,
}

/// Why an id could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceIdError {
    #[error("cannot parse Azure ID: {0:?}")]
    Unparseable(String),
    #[error("the number of path segments is not divisible by 2 in {0:?}")]
    OddSegments(String),
    #[error("key/value pair with an empty segment in {0:?}")]
    EmptySegment(String),
    #[error("no subscription ID found in: {0:?}")]
    MissingSubscription(String),
    #[error("no resource group name found in: {0:?}")]
    MissingResourceGroup(String),
    #[error("ID {id:?} was missing the `{key}` element")]
    MissingElement { id: String, key: String },
}

impl ResourceId {
    /// Parse an ARM id into its components
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let trimmed = id.trim().trim_matches('/');
        if trimmed.is_empty() || trimmed.contains("://") {
            return Err(ResourceIdError::Unparseable(id.to_string()));
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.len() % 2 != 0 {
            return Err(ResourceIdError::OddSegments(id.to_string()));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = BTreeMap::new();

        for pair in segments.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(ResourceIdError::EmptySegment(id.to_string()));
            }

            match key {
                "subscriptions" => subscription_id = Some(value.to_string()),
                "resourceGroups" | "resourcegroups" => resource_group = Some(value.to_string()),
                "providers" => provider = Some(value.to_string()),
                _ => {
                    path.insert(key.to_string(), value.to_string());
                },
            }
        }

        Ok(Self {
            subscription_id: subscription_id
                .ok_or_else(|| ResourceIdError::MissingSubscription(id.to_string()))?,
            resource_group: resource_group
                .ok_or_else(|| ResourceIdError::MissingResourceGroup(id.to_string()))?,
            provider,
            path,
        })
    }

    /// Build the id of a resource inside a resource group
    pub fn new(
        subscription_id: &str,
        resource_group: &str,
        namespace: &str,
        resource_type: &str,
        name: &str,
    ) -> Self {
        let mut path = BTreeMap::new();
        path.insert(resource_type.to_string(), name.to_string());

        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            provider: Some(namespace.to_string()),
            path,
        }
    }

    /// Value of a `key/value` path element, e.g. `disks`
    pub fn element(&self, key: &str) -> Result<&str, ResourceIdError> {
        self.path
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| ResourceIdError::MissingElement {
                id: self.to_string(),
                key: key.to_string(),
            })
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )?;
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (key, value) in &self.path {
            write!(f, "/{}/{}", key, value)?;
        }
        Ok(())
    }
}

/// Check that `value` is a parseable ARM id (used for reference attributes)
pub fn validate_resource_id(attribute: &str, value: &str) -> Result<(), String> {
    ResourceId::parse(value)
        .map(|_| ())
        .map_err(|e| format!("`{}` must be a valid Azure resource ID: {}", attribute, e))
}
