// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{
    DataFrequency,
    DatasetDomain,
    DatasetFile,
    DatasetGroupName,
    DatasetName,
    DatasetType,
    TagSpec,
    TimestampFormat,
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// User-configured tags at both scopes that apply to one resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserTags {
    pub resource_tags: Vec<TagSpec>,
    pub global_tags: Vec<TagSpec>,
}

impl UserTags {
    pub fn is_empty(&self) -> bool {
        self.resource_tags.is_empty() && self.global_tags.is_empty()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Desired state of a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetParams {
    pub name: DatasetName,
    pub dataset_type: DatasetType,
    pub domain: DatasetDomain,
    pub schema: serde_json::Value,
    /// Not applicable to item metadata datasets
    pub frequency: Option<DataFrequency>,
    pub user_tags: UserTags,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Desired state of a dataset group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetGroupParams {
    pub name: DatasetGroupName,
    pub domain: DatasetDomain,
    pub user_tags: UserTags,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Desired state of a dataset import job for one uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJobParams {
    pub dataset_file: DatasetFile,
    pub dataset_arn: String,
    pub timestamp_format: Option<TimestampFormat>,
    pub geolocation_format: Option<String>,
    pub time_zone: Option<String>,
    pub use_geolocation_for_time_zone: Option<bool>,
    pub user_tags: UserTags,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const DEFAULT_PREDICTOR_MAX_AGE_SECONDS: i64 = 604_800; // one week

/// Desired state of a predictor scoped to one dataset group
#[derive(Debug, Clone)]
pub struct PredictorParams {
    pub dataset_group: DatasetGroupParams,
    /// Whether this is an auto predictor (AutoML service side)
    pub auto: bool,
    /// A predictor older than this is regenerated when newer data exists
    pub max_age: Duration,
    /// Creation configuration passed through to the service, minus the
    /// input data section which the reconciler completes with the dataset
    /// group ARN
    pub config: serde_json::Map<String, serde_json::Value>,
    pub user_tags: UserTags,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Desired state of a forecast generated from a predictor
#[derive(Debug, Clone)]
pub struct ForecastParams {
    pub dataset_group: DatasetGroupParams,
    pub predictor_arn: String,
    pub config: serde_json::Map<String, serde_json::Value>,
    pub user_tags: UserTags,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Identifies the account/region scope the engine reconciles resources in.
/// Used to derive deterministic resource ARNs without extra service calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceScope {
    pub partition: String,
    pub region: String,
    pub account_id: String,
}

impl ServiceScope {
    pub fn new(
        partition: impl Into<String>,
        region: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            partition: partition.into(),
            region: region.into(),
            account_id: account_id.into(),
        }
    }

    pub fn dataset_arn(&self, name: &DatasetName) -> String {
        self.arn("dataset", name.as_str())
    }

    pub fn dataset_group_arn(&self, name: &DatasetGroupName) -> String {
        self.arn("dataset-group", name.as_str())
    }

    fn arn(&self, resource: &str, name: &str) -> String {
        format!(
            "arn:{}:forecast:{}:{}:{}/{}",
            self.partition, self.region, self.account_id, resource, name
        )
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Runtime settings the engine needs when issuing create calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Value of the solution identification tag stamped on every resource
    pub solution_id: String,
    /// Role the forecasting service assumes to read/write blob storage
    pub forecast_role_arn: Option<String>,
    /// When set together with the role, creates are encrypted with this key
    pub kms_key_arn: Option<String>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
