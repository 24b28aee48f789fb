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

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Brings the user-configured tags of a resource in line with what is
/// active on it, adding and removing only what differs
#[component(pub)]
pub struct TagApplier {
    api: Arc<dyn ForecastApi>,
}

impl TagApplier {
    #[tracing::instrument(level = "debug", skip_all, fields(%arn))]
    pub async fn sync(&self, arn: &str, user_tags: &UserTags) -> Result<(), ApiError> {
        if user_tags.is_empty() {
            return Ok(());
        }

        let active = self.api.list_tags(arn).await?;
        let to_apply = tags_to_apply(&user_tags.resource_tags, &user_tags.global_tags, &active)
            .map_err(|e| ApiError::Validation {
                message: e.to_string(),
            })?;
        let to_remove =
            tag_keys_to_remove(&user_tags.resource_tags, &user_tags.global_tags, &active)
                .map_err(|e| ApiError::Validation {
                    message: e.to_string(),
                })?;

        if !to_apply.is_empty() {
            tracing::info!(tags = ?to_apply, "applying user tags");
            self.api.tag_resource(arn, to_apply).await?;
        }
        if !to_remove.is_empty() {
            tracing::info!(keys = ?to_remove, "removing user tags");
            self.api.untag_resource(arn, to_remove).await?;
        }

        Ok(())
    }

    /// The value of one tag on a resource, if set
    pub async fn get(&self, arn: &str, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self
            .api
            .list_tags(arn)
            .await?
            .into_iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.value))
    }
}
