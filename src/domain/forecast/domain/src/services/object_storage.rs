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

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Boundary with blob storage: content fingerprinting, timestamps, and the
/// few object operations the reconciliation flow needs
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta, ObjectStorageError>;

    /// Full object body. Only used for small control documents, never data
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStorageError>;

    /// Full MD5 over the object's byte stream. Used purely as a
    /// change-detection signal, not for integrity.
    async fn content_md5(&self, bucket: &str, key: &str) -> Result<String, ObjectStorageError>;

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), ObjectStorageError>;

    /// Objects under a prefix, in lexicographic key order
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectMeta>, ObjectStorageError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ObjectStorageError {
    #[error("object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error(transparent)]
    Internal(#[from] InternalError),
}
