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

use super::{solution_tags, ReconcileError};
use crate::TagApplier;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[component(pub)]
pub struct ImportJobReconciler {
    api: Arc<dyn ForecastApi>,
    storage: Arc<dyn ObjectStorage>,
    runtime: Arc<RuntimeConfig>,
    tag_applier: Arc<TagApplier>,
}

impl ImportJobReconciler {
    /// ARN of the most recent import for the dataset, if any. Import job
    /// names embed a timestamp, so the ARN is only known after listing.
    pub async fn latest_arn(&self, params: &ImportJobParams) -> Result<Option<String>, ReconcileError> {
        let history = self
            .api
            .list_dataset_import_jobs(&params.dataset_arn, None)
            .await?;
        Ok(history.into_iter().next().map(|job| job.arn))
    }

    /// The state of the latest import relative to the file's current
    /// content. An ACTIVE import only counts if its recorded content
    /// fingerprint matches the file as it is now; fingerprint drift (or a
    /// missing fingerprint, left by older versions of the engine) marks the
    /// import stale so the data gets re-imported.
    #[tracing::instrument(level = "info", skip_all, fields(key = %params.dataset_file.key))]
    pub async fn status(&self, params: &ImportJobParams) -> Result<ResourceState, ReconcileError> {
        let Some(latest_arn) = self.latest_arn(params).await? else {
            return Ok(ResourceState::Missing);
        };

        let info = self.api.describe_dataset_import_job(&latest_arn).await?;

        if info.status == Status::Active {
            let recorded = self.tag_applier.get(&latest_arn, TAG_SOLUTION_ETAG).await?;
            let Some(recorded) = recorded else {
                tracing::info!("no content signature recorded on the last import - re-importing");
                return Ok(ResourceState::Stale {
                    reason: "no content signature recorded on the last import".to_string(),
                });
            };

            let file = &params.dataset_file;
            let current = self.storage.content_md5(&file.bucket, &file.key).await?;
            if recorded != current {
                tracing::info!(
                    %recorded,
                    %current,
                    "content signature changed since the last import - re-importing",
                );
                return Ok(ResourceState::Stale {
                    reason: "content signature changed since the last import".to_string(),
                });
            }
        }

        Ok(ResourceState::Exists(info.status))
    }

    /// Start an import of the file into its dataset. The job name embeds
    /// the file's modification time, so re-running a step for the same
    /// upload converges on the same job.
    #[tracing::instrument(level = "info", skip_all, fields(key = %params.dataset_file.key))]
    pub async fn create(&self, params: &ImportJobParams) -> Result<(), ReconcileError> {
        let file = &params.dataset_file;
        let meta = self.storage.head_object(&file.bucket, &file.key).await?;
        let etag = self.storage.content_md5(&file.bucket, &file.key).await?;

        let dataset_name = params
            .dataset_arn
            .rsplit('/')
            .next()
            .unwrap_or(&params.dataset_arn);
        let name = format!(
            "{dataset_name}_{}",
            format_resource_suffix(&meta.last_modified)
        );

        let mut tags = solution_tags(&self.runtime);
        tags.push(ResourceTag::new(TAG_SOLUTION_ETAG, &etag));
        // import jobs cannot be re-tagged by ARN before they are listed, so
        // user tags ride along on the create call
        tags.extend(
            tags_to_apply(
                &params.user_tags.resource_tags,
                &params.user_tags.global_tags,
                &[],
            )
            .map_err(|e| ReconcileError::Invalid(e.to_string()))?,
        );

        let request = CreateImportJob {
            name: name.clone(),
            dataset_arn: params.dataset_arn.clone(),
            source_url: file.s3_url(),
            role_arn: self.runtime.forecast_role_arn.clone(),
            timestamp_format: params.timestamp_format.clone(),
            geolocation_format: params.geolocation_format.clone(),
            time_zone: params.time_zone.clone(),
            use_geolocation_for_time_zone: params.use_geolocation_for_time_zone,
            tags,
        };
        match self.api.create_dataset_import_job(request).await {
            Ok(()) => Ok(()),
            Err(ApiError::AlreadyExists { .. }) => {
                tracing::debug!(%name, "dataset import job is already creating");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
