// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use dill::component;
use internal_error::{ErrorIntoInternal, InternalError, ResultIntoInternal};
use nimbus_forecast::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ConfigError,
    ConfigResolver,
    DatasetGroupReconciler,
    DatasetReconciler,
    ForecastReconciler,
    ImportJobReconciler,
    PredictorReconciler,
    ReconcileError,
};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// One orchestrator invocation: which file triggered the pass, which group
/// is being reconciled (where applicable), and the configuration document
/// the whole execution was pinned to at trigger time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    pub bucket: String,
    pub dataset_file: String,
    #[serde(default)]
    pub dataset_group_name: Option<String>,
    pub config: serde_json::Value,
}

impl StepRequest {
    pub fn file(&self) -> DatasetFile {
        DatasetFile::new(&self.bucket, &self.dataset_file)
    }

    pub fn resolver(&self) -> Result<ConfigResolver, ConfigError> {
        ConfigResolver::from_value(self.config.clone(), "request config")
    }

    fn group_name(&self) -> Result<&str, StepError> {
        self.dataset_group_name.as_deref().ok_or_else(|| {
            StepError::Config(ConfigError::Invalid(
                "this step requires a dataset_group_name".to_string(),
            ))
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// How a step ended when it did not return an output. The orchestrator
/// retries `Pending` with backoff and treats everything else as terminal
/// for the execution.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("resource is still pending")]
    Pending,

    #[error("resource failed with status {status}")]
    Failed { status: Status },

    /// Unreachable as long as status predicates partition the enum
    #[error("this should not happen: status is {status}")]
    Invalid { status: Status },

    #[error("a newer upload supersedes the file that triggered this step ({triggered_by})")]
    Superseded {
        triggered_by: String,
        latest: Option<String>,
    },

    #[error("one or more datasets are still importing:\n{details}")]
    DatasetsImporting { details: String },

    #[error("resource configuration does not match the existing resource:\n{}", mismatches.join("\n"))]
    Mismatch { mismatches: Vec<String> },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(ApiError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<ReconcileError> for StepError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Mismatch { mismatches } => StepError::Mismatch { mismatches },
            ReconcileError::DatasetsImporting { details } => {
                StepError::DatasetsImporting { details }
            }
            ReconcileError::Invalid(message) => StepError::Config(ConfigError::Invalid(message)),
            ReconcileError::Api(e) => StepError::from_api(e),
            ReconcileError::Storage(e) => StepError::Internal(e.int_err()),
            ReconcileError::Internal(e) => StepError::Internal(e),
        }
    }
}

impl StepError {
    /// An in-use resource and transient concurrency/quota pressure both
    /// resolve by waiting; any other service error surfaces to the operator
    fn from_api(e: ApiError) -> Self {
        match e {
            ApiError::InUse { message } => {
                tracing::info!(%message, "resource is currently updating");
                StepError::Pending
            }
            e if e.is_transient_limit() => {
                tracing::info!(error = %e, "transient service limit reached - will retry");
                StepError::Pending
            }
            e => StepError::Api(e),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Map what a status probe found into the step outcome contract.
///
/// `Missing` and `Stale` reach this point only after a create was issued
/// for them, so both poll as pending.
pub fn classify_poll(state: &ResourceState) -> Result<(), StepError> {
    match state {
        ResourceState::Missing | ResourceState::Stale { .. } => Err(StepError::Pending),
        ResourceState::Exists(status) => classify_status(*status),
    }
}

fn classify_status(status: Status) -> Result<(), StepError> {
    if status.failed() {
        Err(StepError::Failed { status })
    } else if status.updating() {
        Err(StepError::Pending)
    } else if status.finalized() {
        Ok(())
    } else {
        tracing::error!(%status, "invalid resource status detected");
        Err(StepError::Invalid { status })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Entry points the orchestrator invokes, one per pipeline stage. Each is
/// idempotent: probe the resource, create it if needed, and report
/// pending/failed/done through `StepError`.
#[component(pub)]
pub struct StepRunner {
    storage: Arc<dyn ObjectStorage>,
    scope: Arc<ServiceScope>,
    dataset_reconciler: Arc<DatasetReconciler>,
    group_reconciler: Arc<DatasetGroupReconciler>,
    import_job_reconciler: Arc<ImportJobReconciler>,
    predictor_reconciler: Arc<PredictorReconciler>,
    forecast_reconciler: Arc<ForecastReconciler>,
}

impl StepRunner {
    /// Returns the dataset's ARN once it is ACTIVE. The create is issued on
    /// every pass so that a configuration drifting away from the existing
    /// dataset is caught even after the dataset went ACTIVE.
    #[tracing::instrument(level = "info", skip_all, fields(dataset_file = %request.dataset_file))]
    pub async fn create_dataset(&self, request: &StepRequest) -> Result<String, StepError> {
        let file = request.file();
        let params = request.resolver()?.dataset(&file)?;

        let state = self.dataset_reconciler.status(&params).await?;
        self.dataset_reconciler.create(&params).await?;

        classify_poll(&state)?;
        Ok(self.dataset_reconciler.arn(&params))
    }

    /// Creates or updates every dataset group that depends on the uploaded
    /// file and assigns the required datasets to each. Returns the group
    /// names. Group creation and update are synchronous on the service
    /// side, so a single pass settles all of them.
    #[tracing::instrument(level = "info", skip_all, fields(dataset_file = %request.dataset_file))]
    pub async fn create_dataset_group(
        &self,
        request: &StepRequest,
    ) -> Result<Vec<String>, StepError> {
        let file = request.file();
        let resolver = request.resolver()?;
        let groups = resolver.dataset_groups(&file)?;
        let datasets = resolver.datasets(&file)?;
        let etag = self
            .storage
            .content_md5(&file.bucket, &file.key)
            .await
            .int_err()?;

        for group in &groups {
            self.group_reconciler.create(group).await?;

            match self.group_reconciler.status(group).await? {
                ResourceState::Exists(status) if status.finalized() => {}
                state => {
                    return Err(StepError::Config(ConfigError::Invalid(format!(
                        "Dataset group {} is {}, expected ACTIVE",
                        group.name,
                        state_str(&state)
                    ))));
                }
            }

            self.group_reconciler
                .update(group, &datasets, &file, &etag)
                .await?;
        }

        Ok(groups.into_iter().map(|g| g.name.into_string()).collect())
    }

    /// Returns the latest import job ARN for the file's dataset once the
    /// file's current content is imported
    #[tracing::instrument(level = "info", skip_all, fields(dataset_file = %request.dataset_file))]
    pub async fn create_dataset_import_job(
        &self,
        request: &StepRequest,
    ) -> Result<Option<String>, StepError> {
        let file = request.file();
        let params = request.resolver()?.dataset_import_job(&file, &self.scope)?;

        let state = self.import_job_reconciler.status(&params).await?;
        if state.needs_creation() {
            self.import_job_reconciler.create(&params).await?;
        }

        classify_poll(&state)?;
        Ok(self.import_job_reconciler.latest_arn(&params).await?)
    }

    /// Returns the predictor ARN once an up-to-date predictor is ACTIVE
    #[tracing::instrument(level = "info", skip_all, fields(dataset_file = %request.dataset_file))]
    pub async fn create_predictor(&self, request: &StepRequest) -> Result<String, StepError> {
        let file = request.file();
        let group_name = request.group_name()?;
        let params = request.resolver()?.predictor(&file, group_name)?;

        match self.predictor_reconciler.assess(&params, &file).await? {
            PredictorAssessment::Superseded {
                triggered_by,
                latest,
            } => Err(StepError::Superseded {
                triggered_by,
                latest,
            }),
            PredictorAssessment::DatasetsImporting { details } => {
                Err(StepError::DatasetsImporting { details })
            }
            PredictorAssessment::Missing | PredictorAssessment::Stale => {
                tracing::info!(dataset_group = %group_name, "creating predictor");
                self.predictor_reconciler.create(&params).await?;
                Err(StepError::Pending)
            }
            PredictorAssessment::Exists(status) => {
                classify_status(status)?;
                self.predictor_reconciler
                    .latest_arn(&params)
                    .await?
                    .ok_or_else(|| {
                        "predictor disappeared between assessment and lookup"
                            .int_err()
                            .into()
                    })
            }
        }
    }

    /// Returns the forecast ARN once a forecast generated from the current
    /// predictor is ACTIVE
    #[tracing::instrument(level = "info", skip_all, fields(dataset_file = %request.dataset_file))]
    pub async fn create_forecast(&self, request: &StepRequest) -> Result<String, StepError> {
        let file = request.file();
        let group_name = request.group_name()?;
        let params = self.forecast_params(request, &file, group_name).await?;

        let state = self.forecast_reconciler.status(&params).await?;
        if state.needs_creation() {
            tracing::info!(dataset_group = %group_name, "creating forecast");
            self.forecast_reconciler.create(&params).await?;
        }

        classify_poll(&state)?;
        self.forecast_arn(&params).await
    }

    /// Exports the ACTIVE forecast to the data bucket and stages its output
    /// under a stable key; returns the forecast ARN once the export completes
    #[tracing::instrument(level = "info", skip_all, fields(dataset_file = %request.dataset_file))]
    pub async fn export_forecast(&self, request: &StepRequest) -> Result<String, StepError> {
        let file = request.file();
        let group_name = request.group_name()?;
        let params = self.forecast_params(request, &file, group_name).await?;

        let state = self.forecast_reconciler.export(&params, &file).await?;
        classify_poll(&state)?;

        let forecast_arn = self.forecast_arn(&params).await?;
        let forecast_name = forecast_arn.rsplit('/').next().unwrap_or(&forecast_arn);
        let staged = self
            .stage_export_output(&file.bucket, &format!("export_{forecast_name}"))
            .await?;
        tracing::info!(%staged, "forecast export output staged");

        Ok(forecast_arn)
    }

    /// The export job shards its output into part files under the export's
    /// destination prefix. Locate the first non-empty CSV part and copy it
    /// next to the prefix under a stable name downstream consumers can rely
    /// on.
    async fn stage_export_output(
        &self,
        bucket: &str,
        export_name: &str,
    ) -> Result<String, StepError> {
        let prefix = format!("exports/{export_name}");
        let objects = self.storage.list_objects(bucket, &prefix).await.int_err()?;
        let Some(found) = objects
            .iter()
            .find(|o| o.key.ends_with(".csv") && o.size > 0)
        else {
            return Err(format!("could not find forecast output at s3://{bucket}/{prefix}")
                .int_err()
                .into());
        };

        let dest = format!("exports/{export_name}.csv");
        self.storage
            .copy_object(bucket, &found.key, &dest)
            .await
            .int_err()?;
        Ok(dest)
    }

    /// Exports the latest predictor's backtest results; returns the
    /// predictor ARN once the export completes
    #[tracing::instrument(level = "info", skip_all, fields(dataset_file = %request.dataset_file))]
    pub async fn export_predictor_backtest(
        &self,
        request: &StepRequest,
    ) -> Result<String, StepError> {
        let file = request.file();
        let group_name = request.group_name()?;
        let params = request.resolver()?.predictor(&file, group_name)?;

        let state = self
            .predictor_reconciler
            .export_backtest(&params, &file)
            .await?;
        classify_poll(&state)?;
        self.predictor_reconciler
            .latest_arn(&params)
            .await?
            .ok_or_else(|| "predictor disappeared during backtest export".int_err().into())
    }

    async fn forecast_params(
        &self,
        request: &StepRequest,
        file: &DatasetFile,
        group_name: &str,
    ) -> Result<ForecastParams, StepError> {
        let resolver = request.resolver()?;
        let predictor_params = resolver.predictor(file, group_name)?;
        let predictor_arn = self
            .predictor_reconciler
            .latest_arn(&predictor_params)
            .await?
            .ok_or_else(|| {
                StepError::Config(ConfigError::Invalid(format!(
                    "no predictor exists for {group_name} - cannot create a forecast"
                )))
            })?;

        Ok(resolver.forecast(file, group_name, &predictor_arn)?)
    }

    async fn forecast_arn(&self, params: &ForecastParams) -> Result<String, StepError> {
        self.forecast_reconciler
            .latest_for_predictor(params)
            .await
            .map_err(StepError::from)?
            .map(|summary| summary.arn)
            .ok_or_else(|| "forecast disappeared between poll and lookup".int_err().into())
    }
}

fn state_str(state: &ResourceState) -> String {
    match state {
        ResourceState::Missing => "DOES_NOT_EXIST".to_string(),
        ResourceState::Stale { .. } => "STALE".to_string(),
        ResourceState::Exists(status) => status.to_string(),
    }
}
