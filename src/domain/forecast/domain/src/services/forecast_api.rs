// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::{DateTime, Utc};
use internal_error::InternalError;
use thiserror::Error;

use crate::entities::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Boundary with the remote forecasting service. One unified error
/// vocabulary: callers above this trait never see the service's own
/// exception types.
#[async_trait::async_trait]
pub trait ForecastApi: Send + Sync {
    async fn describe_dataset(&self, arn: &str) -> Result<DatasetDescription, ApiError>;

    async fn create_dataset(&self, request: CreateDataset) -> Result<(), ApiError>;

    async fn describe_dataset_group(&self, arn: &str)
        -> Result<DatasetGroupDescription, ApiError>;

    async fn create_dataset_group(&self, request: CreateDatasetGroup) -> Result<(), ApiError>;

    /// Replaces the set of datasets assigned to the group
    async fn update_dataset_group(
        &self,
        arn: &str,
        dataset_arns: Vec<String>,
    ) -> Result<(), ApiError>;

    /// Import jobs for a dataset, newest first by last modification time
    async fn list_dataset_import_jobs(
        &self,
        dataset_arn: &str,
        status: Option<Status>,
    ) -> Result<Vec<ImportJobSummary>, ApiError>;

    async fn describe_dataset_import_job(
        &self,
        arn: &str,
    ) -> Result<ImportJobDescription, ApiError>;

    async fn create_dataset_import_job(&self, request: CreateImportJob)
        -> Result<(), ApiError>;

    /// Predictors of the given flavor, newest first by creation time
    async fn list_predictors(
        &self,
        dataset_group_arn: Option<&str>,
        status: Option<Status>,
        auto: bool,
    ) -> Result<Vec<PredictorSummary>, ApiError>;

    async fn describe_predictor(
        &self,
        arn: &str,
        auto: bool,
    ) -> Result<PredictorDescription, ApiError>;

    async fn create_predictor(&self, request: CreatePredictor) -> Result<(), ApiError>;

    /// Forecasts for a dataset group, newest first by creation time
    async fn list_forecasts(&self, dataset_group_arn: &str)
        -> Result<Vec<ForecastSummary>, ApiError>;

    async fn describe_forecast(&self, arn: &str) -> Result<ForecastDescription, ApiError>;

    async fn create_forecast(&self, request: CreateForecast) -> Result<(), ApiError>;

    async fn describe_export(
        &self,
        kind: ExportKind,
        arn: &str,
    ) -> Result<ExportDescription, ApiError>;

    async fn create_export(&self, request: CreateExport) -> Result<(), ApiError>;

    async fn list_tags(&self, arn: &str) -> Result<Vec<ResourceTag>, ApiError>;

    async fn tag_resource(&self, arn: &str, tags: Vec<ResourceTag>) -> Result<(), ApiError>;

    async fn untag_resource(&self, arn: &str, keys: Vec<String>) -> Result<(), ApiError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    #[error("resource already exists: {message}")]
    AlreadyExists { message: String },

    #[error("resource in use: {message}")]
    InUse { message: String },

    #[error("limit exceeded: {message}")]
    LimitExceeded { message: String },

    #[error("invalid request: {message}")]
    Validation { message: String },

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ApiError {
    /// Whether a limit-exceeded error is transient concurrency/quota
    /// pressure rather than a hard ceiling that needs operator action.
    ///
    /// The service exposes no structured code for this, so the message
    /// text is pattern-matched; e.g. "Quota limit of N dataset import
    /// jobs has been reached".
    pub fn is_transient_limit(&self) -> bool {
        match self {
            ApiError::LimitExceeded { message } => {
                message.contains("concurrently") || message.contains("dataset import jobs")
            }
            _ => false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Descriptions
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescription {
    pub arn: String,
    pub name: DatasetName,
    pub dataset_type: DatasetType,
    pub domain: DatasetDomain,
    pub schema: serde_json::Value,
    pub data_frequency: Option<DataFrequency>,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub last_modification_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetGroupDescription {
    pub arn: String,
    pub name: DatasetGroupName,
    pub domain: DatasetDomain,
    pub dataset_arns: Vec<String>,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub last_modification_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJobSummary {
    pub arn: String,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub last_modification_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJobDescription {
    pub arn: String,
    pub dataset_arn: String,
    pub source_url: String,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub last_modification_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorSummary {
    pub arn: String,
    pub dataset_group_arn: String,
    pub is_auto: bool,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub last_modification_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorDescription {
    pub arn: String,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub last_modification_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastSummary {
    pub arn: String,
    pub predictor_arn: String,
    pub dataset_group_arn: String,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub last_modification_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastDescription {
    pub arn: String,
    pub predictor_arn: String,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub last_modification_time: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExportKind {
    ForecastExport,
    PredictorBacktest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDescription {
    pub arn: String,
    pub status: Status,
    pub destination_url: String,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Create requests
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDataset {
    pub name: DatasetName,
    pub dataset_type: DatasetType,
    pub domain: DatasetDomain,
    pub schema: serde_json::Value,
    pub data_frequency: Option<DataFrequency>,
    pub encryption: Option<EncryptionConfig>,
    pub tags: Vec<ResourceTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatasetGroup {
    pub name: DatasetGroupName,
    pub domain: DatasetDomain,
    pub tags: Vec<ResourceTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateImportJob {
    pub name: String,
    pub dataset_arn: String,
    pub source_url: String,
    pub role_arn: Option<String>,
    pub timestamp_format: Option<TimestampFormat>,
    pub geolocation_format: Option<String>,
    pub time_zone: Option<String>,
    pub use_geolocation_for_time_zone: Option<bool>,
    pub tags: Vec<ResourceTag>,
}

#[derive(Debug, Clone)]
pub struct CreatePredictor {
    pub name: String,
    pub dataset_group_arn: String,
    pub auto: bool,
    /// When upgrading a legacy predictor to an auto predictor, the service
    /// accepts the previous predictor instead of a full configuration
    pub reference_predictor_arn: Option<String>,
    pub config: serde_json::Map<String, serde_json::Value>,
    pub encryption: Option<EncryptionConfig>,
    pub tags: Vec<ResourceTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionConfig {
    pub role_arn: String,
    pub kms_key_arn: String,
}

#[derive(Debug, Clone)]
pub struct CreateForecast {
    pub name: String,
    pub predictor_arn: String,
    pub config: serde_json::Map<String, serde_json::Value>,
    pub tags: Vec<ResourceTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateExport {
    pub kind: ExportKind,
    pub name: String,
    pub source_arn: String,
    pub destination_url: String,
    pub role_arn: Option<String>,
    pub tags: Vec<ResourceTag>,
}
