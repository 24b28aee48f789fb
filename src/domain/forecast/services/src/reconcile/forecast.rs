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
use time_source::format_resource_suffix;

use super::{derived_export_arn, solution_tags, DatasetGroupReconciler, ReconcileError};
use crate::TagApplier;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Forecasts are keyed to the predictor they were generated from: a new
/// predictor means the group's forecast is regenerated even though older
/// forecasts remain listed on the group.
#[component(pub)]
pub struct ForecastReconciler {
    api: Arc<dyn ForecastApi>,
    scope: Arc<ServiceScope>,
    runtime: Arc<RuntimeConfig>,
    tag_applier: Arc<TagApplier>,
    group_reconciler: Arc<DatasetGroupReconciler>,
}

impl ForecastReconciler {
    /// The newest forecast generated from the desired predictor, if any
    pub async fn latest_for_predictor(
        &self,
        params: &ForecastParams,
    ) -> Result<Option<ForecastSummary>, ReconcileError> {
        let dsg_arn = self.scope.dataset_group_arn(&params.dataset_group.name);
        let forecasts = self.api.list_forecasts(&dsg_arn).await?;
        Ok(forecasts
            .into_iter()
            .find(|f| f.predictor_arn == params.predictor_arn))
    }

    pub async fn status(&self, params: &ForecastParams) -> Result<ResourceState, ReconcileError> {
        let Some(summary) = self.latest_for_predictor(params).await? else {
            return Ok(ResourceState::Missing);
        };

        let info = self.api.describe_forecast(&summary.arn).await?;
        self.tag_applier.sync(&info.arn, &params.user_tags).await?;
        Ok(ResourceState::Exists(info.status))
    }

    #[tracing::instrument(level = "info", skip_all, fields(dataset_group = %params.dataset_group.name))]
    pub async fn create(&self, params: &ForecastParams) -> Result<(), ReconcileError> {
        let latest_update = self
            .group_reconciler
            .latest_timestamp(&params.dataset_group)
            .await?;
        let name = format!(
            "{}_{}",
            params.dataset_group.name,
            format_resource_suffix(&latest_update)
        );

        let request = CreateForecast {
            name: name.clone(),
            predictor_arn: params.predictor_arn.clone(),
            config: params.config.clone(),
            tags: solution_tags(&self.runtime),
        };
        match self.api.create_forecast(request).await {
            Ok(()) => Ok(()),
            Err(ApiError::AlreadyExists { .. }) => {
                tracing::debug!(%name, "forecast is already creating, or already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Export the forecast to the data bucket, or report on an export
    /// already under way. The forecast must be ACTIVE.
    #[tracing::instrument(level = "info", skip_all, fields(dataset_group = %params.dataset_group.name))]
    pub async fn export(
        &self,
        params: &ForecastParams,
        dataset_file: &DatasetFile,
    ) -> Result<ResourceState, ReconcileError> {
        let Some(summary) = self.latest_for_predictor(params).await? else {
            return Err(ReconcileError::Invalid(
                "forecast does not yet exist - cannot export".to_string(),
            ));
        };
        let info = self.api.describe_forecast(&summary.arn).await?;
        if !info.status.finalized() {
            return Err(ReconcileError::Invalid(
                "forecast status must be ACTIVE to export a forecast".to_string(),
            ));
        }

        let forecast_name = summary.arn.rsplit('/').next().unwrap_or(&summary.arn);
        let name = format!("export_{forecast_name}");
        let export_arn =
            derived_export_arn(&summary.arn, "forecast", "forecast-export-job", &name);

        let state = match self.api.describe_export(ExportKind::ForecastExport, &export_arn).await {
            Ok(export) => ResourceState::Exists(export.status),
            Err(ApiError::NotFound) => {
                tracing::info!(%name, "creating forecast export");
                self.api
                    .create_export(CreateExport {
                        kind: ExportKind::ForecastExport,
                        name: name.clone(),
                        source_arn: summary.arn.clone(),
                        destination_url: format!("s3://{}/exports/{name}", dataset_file.bucket),
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
