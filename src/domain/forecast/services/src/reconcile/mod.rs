// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod dataset;
mod dataset_group;
mod forecast;
mod import_job;
mod predictor;

pub use dataset::*;
pub use dataset_group::*;
pub use forecast::*;
pub use import_job::*;
pub use predictor::*;

use internal_error::InternalError;
use nimbus_forecast::*;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The remote resource exists but differs from the configuration in
    /// ways the service cannot reconcile in place
    #[error("{}", mismatches.join("\n"))]
    Mismatch { mismatches: Vec<String> },

    #[error("one or more datasets are still importing:\n{details}")]
    DatasetsImporting { details: String },

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] ObjectStorageError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Tags the engine stamps on every resource it creates
pub(crate) fn solution_tags(runtime: &RuntimeConfig) -> Vec<ResourceTag> {
    vec![ResourceTag::new(TAG_SOLUTION_ID, &runtime.solution_id)]
}

/// Encryption applies only when both the role and the key are configured
pub(crate) fn encryption_config(runtime: &RuntimeConfig) -> Option<EncryptionConfig> {
    match (&runtime.forecast_role_arn, &runtime.kms_key_arn) {
        (Some(role_arn), Some(kms_key_arn)) => Some(EncryptionConfig {
            role_arn: role_arn.clone(),
            kms_key_arn: kms_key_arn.clone(),
        }),
        _ => None,
    }
}
