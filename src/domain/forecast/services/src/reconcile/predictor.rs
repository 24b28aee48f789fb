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
use nimbus_forecast::*;
use time_source::{format_resource_suffix, SystemTimeSource};

use super::{encryption_config, solution_tags, DatasetGroupReconciler, ReconcileError};
use crate::TagApplier;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[component(pub)]
pub struct PredictorReconciler {
    api: Arc<dyn ForecastApi>,
    scope: Arc<ServiceScope>,
    runtime: Arc<RuntimeConfig>,
    tag_applier: Arc<TagApplier>,
    group_reconciler: Arc<DatasetGroupReconciler>,
    time_source: Arc<dyn SystemTimeSource>,
}

impl PredictorReconciler {
    /// ARN of the newest predictor of the configured flavor trained on the
    /// group, regardless of its state
    pub async fn latest_arn(
        &self,
        params: &PredictorParams,
    ) -> Result<Option<String>, ReconcileError> {
        let dsg_arn = self.scope.dataset_group_arn(&params.dataset_group.name);
        let predictors = self
            .api
            .list_predictors(Some(&dsg_arn), None, params.auto)
            .await?;
        Ok(predictors.into_iter().next().map(|p| p.arn))
    }

    /// Determine what, if anything, needs to happen to the predictor.
    ///
    /// Stages, in order: only the most recently uploaded file may drive
    /// predictor work (anything else is superseded); every dataset of the
    /// group must be fully imported; a usable (non-failed) past predictor
    /// must exist; and an existing predictor is only kept while it is
    /// younger than its max age or no newer data has arrived.
    #[tracing::instrument(level = "info", skip_all, fields(dataset_group = %params.dataset_group.name))]
    pub async fn assess(
        &self,
        params: &PredictorParams,
        dataset_file: &DatasetFile,
    ) -> Result<PredictorAssessment, ReconcileError> {
        let dsg_arn = self.scope.dataset_group_arn(&params.dataset_group.name);

        let latest_update = self
            .tag_applier
            .get(&dsg_arn, TAG_LATEST_DATASET_UPDATE_NAME)
            .await?;
        tracing::debug!(
            triggered_by = %dataset_file.filename(),
            latest = ?latest_update,
            "checking whether this invocation still owns predictor generation",
        );
        if latest_update.as_deref() != Some(dataset_file.filename()) {
            return Ok(PredictorAssessment::Superseded {
                triggered_by: dataset_file.filename().to_string(),
                latest: latest_update,
            });
        }

        match self.group_reconciler.ensure_ready(&params.dataset_group).await {
            Ok(()) => {
                tracing::info!("all datasets have been successfully imported");
            }
            Err(ReconcileError::DatasetsImporting { details }) => {
                return Ok(PredictorAssessment::DatasetsImporting { details });
            }
            Err(e) => return Err(e),
        }

        let Some(latest_arn) = self.latest_arn(params).await? else {
            tracing::debug!("no past predictors found");
            return Ok(PredictorAssessment::Missing);
        };
        let last = self.api.describe_predictor(&latest_arn, params.auto).await?;
        if last.status.failed() {
            tracing::info!("previous predictor has failed status - attempting to recreate");
            return Ok(PredictorAssessment::Missing);
        }

        if self.too_old(params, &last).await? {
            return Ok(PredictorAssessment::Stale);
        }

        tracing::info!(status = %last.status, "predictor status");
        self.tag_applier.sync(&last.arn, &params.user_tags).await?;
        Ok(PredictorAssessment::Exists(last.status))
    }

    /// A predictor is too old only when both newer data exists and the
    /// predictor has fallen out of its max-age window. Fresh data alone
    /// does not retrain a young predictor; age alone does not retrain
    /// without new data.
    async fn too_old(
        &self,
        params: &PredictorParams,
        last: &PredictorDescription,
    ) -> Result<bool, ReconcileError> {
        let datasets = self
            .group_reconciler
            .described_datasets(&params.dataset_group)
            .await?;
        let datasets_updated = datasets
            .iter()
            .any(|d| d.last_modification_time > last.last_modification_time);
        if !datasets_updated {
            tracing::warn!(
                "no relevant dataset updates detected - did you mean to add new data?"
            );
            return Ok(false);
        }

        let cutoff = self.time_source.now() - params.max_age;
        if last.last_modification_time < cutoff {
            tracing::info!(
                max_age_seconds = params.max_age.num_seconds(),
                "predictor has surpassed its max allowed age",
            );
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Train a predictor named after the group and its latest data update.
    /// An auto predictor with a usable predecessor is created as an upgrade
    /// referencing it instead of from the full configuration.
    #[tracing::instrument(level = "info", skip_all, fields(dataset_group = %params.dataset_group.name))]
    pub async fn create(&self, params: &PredictorParams) -> Result<(), ReconcileError> {
        let dsg_name = &params.dataset_group.name;
        let dsg_arn = self.scope.dataset_group_arn(dsg_name);
        let latest_update = self
            .group_reconciler
            .latest_timestamp(&params.dataset_group)
            .await?;
        let suffix = format_resource_suffix(&latest_update);

        let name = if params.auto {
            format!("{dsg_name}_auto_{suffix}")
        } else {
            format!("{dsg_name}_{suffix}")
        };

        let reference_predictor_arn = if params.auto {
            self.latest_arn(params).await?
        } else {
            None
        };

        let request = CreatePredictor {
            name: name.clone(),
            dataset_group_arn: dsg_arn,
            auto: params.auto,
            reference_predictor_arn,
            config: params.config.clone(),
            encryption: encryption_config(&self.runtime),
            tags: solution_tags(&self.runtime),
        };
        match self.api.create_predictor(request).await {
            Ok(()) => Ok(()),
            Err(ApiError::AlreadyExists { .. }) => {
                tracing::debug!(%name, "predictor is already creating, or already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Export the latest predictor's backtest results to the data bucket,
    /// or report on an export already under way
    #[tracing::instrument(level = "info", skip_all, fields(dataset_group = %params.dataset_group.name))]
    pub async fn export_backtest(
        &self,
        params: &PredictorParams,
        dataset_file: &DatasetFile,
    ) -> Result<ResourceState, ReconcileError> {
        let Some(predictor_arn) = self.latest_arn(params).await? else {
            return Err(ReconcileError::Invalid(
                "predictor does not yet exist - cannot perform backtest export".to_string(),
            ));
        };
        let created = self
            .api
            .describe_predictor(&predictor_arn, params.auto)
            .await?
            .creation_time;

        let infix = if params.auto { "_auto" } else { "" };
        let name = format!(
            "export_{}{infix}_{}",
            params.dataset_group.name,
            format_resource_suffix(&created)
        );
        let export_arn = derived_export_arn(
            &predictor_arn,
            "predictor",
            "predictor-backtest-export-job",
            &name,
        );

        let state = match self.api.describe_export(ExportKind::PredictorBacktest, &export_arn).await
        {
            Ok(info) => ResourceState::Exists(info.status),
            Err(ApiError::NotFound) => {
                tracing::info!(%name, "creating predictor backtest export");
                self.api
                    .create_export(CreateExport {
                        kind: ExportKind::PredictorBacktest,
                        name: name.clone(),
                        source_arn: predictor_arn,
                        destination_url: format!(
                            "s3://{}/exports/{name}",
                            dataset_file.bucket
                        ),
                        role_arn: self.runtime.forecast_role_arn.clone(),
                        tags: solution_tags(&self.runtime),
                    })
                    .await?;
                ResourceState::Exists(Status::CreatePending)
            }
            Err(e) => return Err(e.into()),
        };

        self.tag_applier.sync(&export_arn, &params.user_tags).await?;
        Ok(state)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Export job ARNs mirror their source's ARN with the resource type
/// swapped and the job name appended
pub(crate) fn derived_export_arn(
    source_arn: &str,
    source_resource: &str,
    export_resource: &str,
    name: &str,
) -> String {
    let base = source_arn.replace(
        &format!(":{source_resource}/"),
        &format!(":{export_resource}/"),
    );
    format!("{base}/{name}")
}
