//! Change detection between stored and desired attributes

use super::attributes::DiskConfig;
use super::disk::normalize_location;
use super::registry::ResourceSchema;
use serde_json::Value;

/// What applying `desired` over `prior` would do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Attributes whose value changes
    pub changed: Vec<String>,
    /// Subset of `changed` that can only be applied by recreating the disk
    pub replace: Vec<String>,
}

impl Plan {
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn requires_replacement(&self) -> bool {
        !self.replace.is_empty()
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn same_value(name: &str, case_insensitive: bool, prior: &Value, desired: &Value) -> bool {
    if is_unset(prior) && is_unset(desired) {
        return true;
    }

    match (prior, desired) {
        (Value::String(a), Value::String(b)) if name == "location" => {
            normalize_location(a) == normalize_location(b)
        },
        (Value::String(a), Value::String(b)) if case_insensitive => a.eq_ignore_ascii_case(b),
        _ => prior == desired,
    }
}

/// Compare two attribute records under `schema`.
///
/// Computed attributes left unset in `desired` keep the server's value and
/// do not count as a change.
pub fn plan(schema: &ResourceSchema, prior: &DiskConfig, desired: &DiskConfig) -> Plan {
    let as_map = |config: &DiskConfig| match serde_json::to_value(config) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    let prior = as_map(prior);
    let desired = as_map(desired);

    let mut result = Plan::default();

    for (name, def) in &schema.attributes {
        let before = prior.get(name).unwrap_or(&Value::Null);
        let after = desired.get(name).unwrap_or(&Value::Null);

        if def.computed && is_unset(after) {
            continue;
        }
        if same_value(name, def.case_insensitive, before, after) {
            continue;
        }

        result.changed.push(name.clone());
        if def.force_new {
            result.replace.push(name.clone());
        }
    }

    if !result.is_noop() {
        tracing::debug!(
            "Planned changes: {:?} (replace: {:?})",
            result.changed,
            result.replace
        );
    }

    result
}
