// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use super::DatasetType;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// An uploaded input object that triggered a reconciliation pass.
/// A pure value type: fetching the content fingerprint and modification
/// time of the underlying object is the `ObjectStorage` boundary's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub bucket: String,
    pub key: String,
    pub data_type: DatasetType,
}

impl DatasetFile {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        let data_type = DatasetType::from_key(&key);
        Self {
            bucket: bucket.into(),
            key,
            data_type,
        }
    }

    /// Reinterpret this file as holding a different dataset type. Used when
    /// expanding the set of datasets a group requires from a single trigger.
    pub fn with_data_type(&self, data_type: DatasetType) -> Self {
        Self {
            data_type,
            ..self.clone()
        }
    }

    /// File name without any leading path
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Logical dataset name, including the `_related`/`_metadata` suffix
    /// for non-target dataset types
    pub fn name(&self) -> String {
        format!("{}{}", self.prefix(), self.data_type.name_suffix())
    }

    /// Logical dataset group name: the file stem before the first dot
    pub fn prefix(&self) -> &str {
        self.filename().split('.').next().unwrap_or("")
    }

    pub fn s3_url(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
