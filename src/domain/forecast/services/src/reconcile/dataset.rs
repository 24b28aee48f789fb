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

use super::{encryption_config, solution_tags, ReconcileError};
use crate::TagApplier;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[component(pub)]
pub struct DatasetReconciler {
    api: Arc<dyn ForecastApi>,
    scope: Arc<ServiceScope>,
    runtime: Arc<RuntimeConfig>,
    tag_applier: Arc<TagApplier>,
}

impl DatasetReconciler {
    pub fn arn(&self, params: &DatasetParams) -> String {
        self.scope.dataset_arn(&params.name)
    }

    pub async fn status(&self, params: &DatasetParams) -> Result<ResourceState, ReconcileError> {
        match self.api.describe_dataset(&self.arn(params)).await {
            Ok(info) => Ok(ResourceState::Exists(info.status)),
            Err(ApiError::NotFound) => Ok(ResourceState::Missing),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotently create the dataset. When a dataset of the same name
    /// already exists, every differing field is reported at once so a user
    /// can fix their configuration in one pass.
    #[tracing::instrument(level = "info", skip_all, fields(dataset = %params.name))]
    pub async fn create(&self, params: &DatasetParams) -> Result<(), ReconcileError> {
        let arn = self.arn(params);

        match self.api.describe_dataset(&arn).await {
            Ok(info) => self.ensure_matches(params, &info)?,
            Err(ApiError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let request = CreateDataset {
            name: params.name.clone(),
            dataset_type: params.dataset_type,
            domain: params.domain,
            schema: params.schema.clone(),
            data_frequency: params.frequency.clone(),
            encryption: encryption_config(&self.runtime),
            tags: solution_tags(&self.runtime),
        };
        match self.api.create_dataset(request).await {
            Ok(()) => {}
            Err(ApiError::AlreadyExists { .. }) => {
                tracing::debug!(dataset = %params.name, "dataset is already creating");
            }
            Err(e) => return Err(e.into()),
        }

        self.tag_applier.sync(&arn, &params.user_tags).await?;
        Ok(())
    }

    fn ensure_matches(
        &self,
        params: &DatasetParams,
        info: &DatasetDescription,
    ) -> Result<(), ReconcileError> {
        let mut mismatches = Vec::new();

        if info.dataset_type != params.dataset_type {
            mismatches.push(format!(
                "dataset type ({}) does not match expected ({})",
                info.dataset_type, params.dataset_type
            ));
        }
        if info.domain != params.domain {
            mismatches.push(format!(
                "dataset domain ({}) does not match ({})",
                info.domain, params.domain
            ));
        }
        if info.data_frequency != params.frequency {
            mismatches.push(format!(
                "data frequency ({}) does not match ({})",
                frequency_str(&info.data_frequency),
                frequency_str(&params.frequency)
            ));
        }
        if info.schema != params.schema {
            mismatches.push("dataset schema does not match".to_string());
        }

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(ReconcileError::Mismatch { mismatches })
        }
    }
}

fn frequency_str(frequency: &Option<DataFrequency>) -> &str {
    frequency.as_ref().map_or("none", DataFrequency::as_str)
}
