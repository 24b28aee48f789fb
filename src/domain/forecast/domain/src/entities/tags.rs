// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Tag keys owned by the reconciliation engine itself. User configuration
/// must never set these - they encode the cross-invocation state.
pub const TAG_SOLUTION_ID: &str = "SolutionId";
pub const TAG_SOLUTION_ETAG: &str = "SolutionETag";
pub const TAG_LATEST_DATASET_UPDATE_ETAG: &str = "LatestDatasetUpdateETag";
pub const TAG_LATEST_DATASET_UPDATE_NAME: &str = "LatestDatasetUpdateName";

pub const RESERVED_TAGS: [&str; 4] = [
    TAG_SOLUTION_ID,
    TAG_SOLUTION_ETAG,
    TAG_LATEST_DATASET_UPDATE_ETAG,
    TAG_LATEST_DATASET_UPDATE_NAME,
];

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagState {
    Present,
    Absent,
}

/// A desired tag: present with a value, or explicitly absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSpec {
    pub key: String,
    pub value: String,
    pub state: TagState,
}

impl TagSpec {
    pub fn present(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            state: TagState::Present,
        }
    }

    pub fn absent(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: String::new(),
            state: TagState::Absent,
        }
    }
}

/// A tag as it exists on a remote resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTag {
    pub key: String,
    pub value: String,
}

impl ResourceTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TagError {
    #[error("tags must be a list")]
    NotAList,

    #[error("each tag must be a mapping containing Key, Value, and optionally State")]
    NotAMapping,

    #[error("each tag may only contain the fields Key, Value, and State (found '{0}')")]
    UnknownField(String),

    #[error("each Present tag must have a Key")]
    MissingKey,

    #[error("tag Key, Value, and State must all be strings")]
    NotAString,

    #[error("tag State must be either 'Present' or 'Absent' (found '{0}')")]
    InvalidState(String),

    #[error("duplicate tag name {0}")]
    DuplicateKey(String),

    #[error("the following tags are solution-managed and cannot be set: {}", RESERVED_TAGS.join(", "))]
    ReservedKey(String),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Parse a raw configuration value (a YAML/JSON list of tag mappings) into
/// tag specs, validating structure as we go
pub fn parse_tag_specs(value: &serde_json::Value) -> Result<Vec<TagSpec>, TagError> {
    let items = value.as_array().ok_or(TagError::NotAList)?;

    let mut specs = Vec::with_capacity(items.len());
    for item in items {
        let map = item.as_object().ok_or(TagError::NotAMapping)?;

        for field in map.keys() {
            if field != "Key" && field != "Value" && field != "State" {
                return Err(TagError::UnknownField(field.clone()));
            }
        }

        let as_string = |field: &str| -> Result<Option<String>, TagError> {
            match map.get(field) {
                None => Ok(None),
                Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(TagError::NotAString),
            }
        };

        let key = as_string("Key")?;
        let value = as_string("Value")?.unwrap_or_default();
        let state = match as_string("State")?.as_deref() {
            None | Some("Present") => TagState::Present,
            Some("Absent") => TagState::Absent,
            Some(other) => return Err(TagError::InvalidState(other.to_string())),
        };

        let key = match key {
            Some(k) if !k.is_empty() => k,
            _ if state == TagState::Present => return Err(TagError::MissingKey),
            _ => key.unwrap_or_default(),
        };

        specs.push(TagSpec { key, value, state });
    }

    validate_tag_specs(&specs)?;
    Ok(specs)
}

/// Check a tag spec list for duplicate and solution-reserved keys
pub fn validate_tag_specs(specs: &[TagSpec]) -> Result<(), TagError> {
    let mut seen = Vec::with_capacity(specs.len());
    for spec in specs {
        if seen.contains(&spec.key.as_str()) {
            return Err(TagError::DuplicateKey(spec.key.clone()));
        }
        if RESERVED_TAGS.contains(&spec.key.as_str()) {
            return Err(TagError::ReservedKey(spec.key.clone()));
        }
        seen.push(spec.key.as_str());
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Compute the tags that should be added or updated on a resource: the
/// union of global and resource-level Present tags (resource wins on
/// conflict), minus any tag already active with the same value
pub fn tags_to_apply(
    resource_tags: &[TagSpec],
    global_tags: &[TagSpec],
    active_tags: &[ResourceTag],
) -> Result<Vec<ResourceTag>, TagError> {
    validate_tag_specs(resource_tags)?;
    validate_tag_specs(global_tags)?;

    let mut desired: Vec<(&str, &str)> = Vec::new();
    for spec in global_tags.iter().chain(resource_tags) {
        if spec.state != TagState::Present {
            continue;
        }
        match desired.iter_mut().find(|(k, _)| *k == spec.key) {
            Some(entry) => entry.1 = &spec.value,
            None => desired.push((&spec.key, &spec.value)),
        }
    }

    Ok(desired
        .into_iter()
        .filter(|(key, value)| {
            active_tags
                .iter()
                .find(|active| active.key == *key)
                .is_none_or(|active| active.value != *value)
        })
        .map(|(key, value)| ResourceTag::new(key, value))
        .collect())
}

/// Compute the tag keys that should be removed from a resource: active
/// keys marked Absent at either scope, unless the resource scope marks
/// them Present
pub fn tag_keys_to_remove(
    resource_tags: &[TagSpec],
    global_tags: &[TagSpec],
    active_tags: &[ResourceTag],
) -> Result<Vec<String>, TagError> {
    validate_tag_specs(resource_tags)?;
    validate_tag_specs(global_tags)?;

    let resource_present: Vec<&str> = resource_tags
        .iter()
        .filter(|t| t.state == TagState::Present)
        .map(|t| t.key.as_str())
        .collect();

    let absent = |key: &str| {
        resource_tags
            .iter()
            .any(|t| t.state == TagState::Absent && t.key == key)
            || (global_tags
                .iter()
                .any(|t| t.state == TagState::Absent && t.key == key)
                && !resource_present.contains(&key))
    };

    Ok(active_tags
        .iter()
        .filter(|active| absent(&active.key))
        .map(|active| active.key.clone())
        .collect())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
