// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dill::component;
use nimbus_forecast::*;

use super::{solution_tags, DatasetReconciler, ReconcileError};
use crate::TagApplier;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[component(pub)]
pub struct DatasetGroupReconciler {
    api: Arc<dyn ForecastApi>,
    scope: Arc<ServiceScope>,
    runtime: Arc<RuntimeConfig>,
    tag_applier: Arc<TagApplier>,
    dataset_reconciler: Arc<DatasetReconciler>,
}

impl DatasetGroupReconciler {
    pub fn arn(&self, params: &DatasetGroupParams) -> String {
        self.scope.dataset_group_arn(&params.name)
    }

    pub async fn status(
        &self,
        params: &DatasetGroupParams,
    ) -> Result<ResourceState, ReconcileError> {
        match self.api.describe_dataset_group(&self.arn(params)).await {
            Ok(info) => Ok(ResourceState::Exists(info.status)),
            Err(ApiError::NotFound) => Ok(ResourceState::Missing),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(level = "info", skip_all, fields(dataset_group = %params.name))]
    pub async fn create(&self, params: &DatasetGroupParams) -> Result<(), ReconcileError> {
        let arn = self.arn(params);

        match self.api.describe_dataset_group(&arn).await {
            Ok(info) => {
                if info.domain != params.domain {
                    return Err(ReconcileError::Mismatch {
                        mismatches: vec![format!(
                            "dataset group domain ({}) does not match expected ({})",
                            info.domain, params.domain
                        )],
                    });
                }
            }
            Err(ApiError::NotFound) => {
                tracing::debug!(
                    dataset_group = %params.name,
                    "dataset group not found - will attempt to create",
                );
            }
            Err(e) => return Err(e.into()),
        }

        let request = CreateDatasetGroup {
            name: params.name.clone(),
            domain: params.domain,
            tags: solution_tags(&self.runtime),
        };
        match self.api.create_dataset_group(request).await {
            Ok(()) => {}
            Err(ApiError::AlreadyExists { .. }) => {
                tracing::debug!(dataset_group = %params.name, "dataset group already exists");
            }
            Err(e) => return Err(e.into()),
        }

        self.tag_applier.sync(&arn, &params.user_tags).await?;
        Ok(())
    }

    /// Assigns `datasets` to the group and records which file update the
    /// assignment corresponds to. Datasets are created first; dataset
    /// creation is not an asynchronous operation on the service side, so
    /// this is safe to do inline.
    #[tracing::instrument(level = "info", skip_all, fields(dataset_group = %params.name))]
    pub async fn update(
        &self,
        params: &DatasetGroupParams,
        datasets: &[DatasetParams],
        dataset_file: &DatasetFile,
        etag: &str,
    ) -> Result<(), ReconcileError> {
        for dataset in datasets {
            self.dataset_reconciler.create(dataset).await?;
        }

        let arn = self.arn(params);
        let dataset_arns = datasets
            .iter()
            .map(|dataset| self.scope.dataset_arn(&dataset.name))
            .collect();
        self.api.update_dataset_group(&arn, dataset_arns).await?;

        self.api
            .tag_resource(
                &arn,
                vec![
                    ResourceTag::new(TAG_LATEST_DATASET_UPDATE_NAME, dataset_file.filename()),
                    ResourceTag::new(TAG_LATEST_DATASET_UPDATE_ETAG, etag),
                ],
            )
            .await?;

        Ok(())
    }

    /// Details of every dataset currently assigned to the group. The group
    /// must exist.
    pub async fn described_datasets(
        &self,
        params: &DatasetGroupParams,
    ) -> Result<Vec<DatasetDescription>, ReconcileError> {
        let info = self.api.describe_dataset_group(&self.arn(params)).await?;

        let mut datasets = Vec::with_capacity(info.dataset_arns.len());
        for dataset_arn in &info.dataset_arns {
            datasets.push(self.api.describe_dataset(dataset_arn).await?);
        }
        Ok(datasets)
    }

    /// Succeeds when every dataset of the group is ACTIVE and has at least
    /// one ACTIVE import; reports every dataset still in flight otherwise
    pub async fn ensure_ready(&self, params: &DatasetGroupParams) -> Result<(), ReconcileError> {
        let datasets = self.described_datasets(params).await?;

        if datasets.iter().any(|d| !d.status.finalized()) {
            let mut details = format!(
                "One or more of the datasets for dataset group {} is not yet ACTIVE\n\n",
                params.name
            );
            for dataset in &datasets {
                details.push_str(&format!(
                    "Dataset {} had status {}\n",
                    dataset.name, dataset.status
                ));
            }
            return Err(ReconcileError::DatasetsImporting { details });
        }

        let mut details = String::new();
        for dataset in &datasets {
            let imports = self
                .api
                .list_dataset_import_jobs(&dataset.arn, Some(Status::Active))
                .await?;
            if imports.is_empty() {
                details.push_str(&format!("no ACTIVE imports for {}\n", dataset.arn));
            }
        }
        if !details.is_empty() {
            return Err(ReconcileError::DatasetsImporting { details });
        }

        Ok(())
    }

    /// Modification time of the most recently updated dataset in the group.
    /// Embedded in generated predictor and forecast names.
    pub async fn latest_timestamp(
        &self,
        params: &DatasetGroupParams,
    ) -> Result<DateTime<Utc>, ReconcileError> {
        self.described_datasets(params)
            .await?
            .iter()
            .map(|d| d.last_modification_time)
            .max()
            .ok_or_else(|| {
                ReconcileError::Invalid(format!(
                    "dataset group {} has no datasets assigned",
                    params.name
                ))
            })
    }
}
