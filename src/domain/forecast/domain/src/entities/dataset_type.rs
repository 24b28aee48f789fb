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

/// The kind of data a dataset holds within its group
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetType {
    TargetTimeSeries,
    RelatedTimeSeries,
    ItemMetadata,
}

impl DatasetType {
    /// Infer the dataset type from an uploaded file name. Anything that is
    /// not explicitly related or metadata is target time series data.
    pub fn from_key(key: &str) -> Self {
        if key.ends_with(".related.csv") {
            DatasetType::RelatedTimeSeries
        } else if key.ends_with(".metadata.csv") {
            DatasetType::ItemMetadata
        } else {
            DatasetType::TargetTimeSeries
        }
    }

    /// File suffix conventionally carried by uploads of this type
    pub fn file_suffix(self) -> &'static str {
        match self {
            DatasetType::TargetTimeSeries => ".csv",
            DatasetType::RelatedTimeSeries => ".related.csv",
            DatasetType::ItemMetadata => ".metadata.csv",
        }
    }

    /// Suffix appended to the logical dataset name for non-target types
    pub fn name_suffix(self) -> &'static str {
        match self {
            DatasetType::TargetTimeSeries => "",
            DatasetType::RelatedTimeSeries => "_related",
            DatasetType::ItemMetadata => "_metadata",
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DatasetType::TargetTimeSeries => "TARGET_TIME_SERIES",
            DatasetType::RelatedTimeSeries => "RELATED_TIME_SERIES",
            DatasetType::ItemMetadata => "ITEM_METADATA",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
#[error("'{0}' is not a valid dataset type")]
pub struct DatasetTypeParseError(pub String);

impl std::str::FromStr for DatasetType {
    type Err = DatasetTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TARGET_TIME_SERIES" => Ok(DatasetType::TargetTimeSeries),
            "RELATED_TIME_SERIES" => Ok(DatasetType::RelatedTimeSeries),
            "ITEM_METADATA" => Ok(DatasetType::ItemMetadata),
            _ => Err(DatasetTypeParseError(s.to_string())),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
