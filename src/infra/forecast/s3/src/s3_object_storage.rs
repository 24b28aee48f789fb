// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use internal_error::{ErrorIntoInternal, InternalError, ResultIntoInternal};
use md5::{Digest, Md5};
use nimbus_forecast::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone)]
pub struct S3ObjectStorage {
    client: Client,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl S3ObjectStorage {
    const MAX_LISTED_OBJECTS: i32 = 1000;

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the ambient credential chain. An explicit
    /// endpoint switches to path-style addressing for non-AWS stores.
    #[tracing::instrument(level = "info", name = "init_s3_object_storage")]
    pub async fn from_env(endpoint: Option<String>) -> Self {
        // Note: Falling back to `unspecified` region as SDK errors out when the region
        // not set even if using custom endpoint
        let region_provider = aws_config::meta::region::RegionProviderChain::default_provider()
            .or_else("unspecified");
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;
        let s3_config = if let Some(endpoint) = endpoint {
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint)
                .force_path_style(true)
                .build()
        } else {
            aws_sdk_s3::config::Builder::from(&sdk_config).build()
        };

        Self::new(Client::from_conf(s3_config))
    }

    fn convert_time(
        t: Option<aws_sdk_s3::primitives::DateTime>,
    ) -> Result<DateTime<Utc>, InternalError> {
        let t = t.ok_or_else(|| "object has no last modified time".int_err())?;
        DateTime::from_timestamp(t.secs(), t.subsec_nanos())
            .ok_or_else(|| "object last modified time out of range".int_err())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl ObjectStorage for S3ObjectStorage {
    #[tracing::instrument(level = "debug", skip_all, fields(bucket, key))]
    async fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectMeta, ObjectStorageError> {
        let resp = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match resp {
            Ok(output) => Ok(ObjectMeta {
                key: key.to_string(),
                size: u64::try_from(output.content_length.unwrap_or_default())
                    .unwrap_or_default(),
                last_modified: Self::convert_time(output.last_modified)?,
            }),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                Err(ObjectStorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(e) => Err(e.int_err().into()),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(bucket, key))]
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match resp {
            Ok(output) => {
                let data = output.body.collect().await.int_err()?;
                Ok(data.into_bytes().to_vec())
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                Err(ObjectStorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(e) => Err(e.int_err().into()),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(bucket, key))]
    async fn content_md5(&self, bucket: &str, key: &str) -> Result<String, ObjectStorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        let output = match resp {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Err(ObjectStorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(e) => return Err(e.int_err().into()),
        };

        // Digest the body chunk by chunk so arbitrarily large uploads never
        // have to fit in memory
        let mut body = output.body;
        let mut hasher = Md5::new();
        while let Some(chunk) = body.try_next().await.int_err()? {
            hasher.update(&chunk);
        }

        let digest = hasher.finalize();
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(bucket, source_key, dest_key))]
    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), ObjectStorageError> {
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(format!("{bucket}/{source_key}"))
            .key(dest_key)
            .send()
            .await
            .int_err()?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(bucket, prefix))]
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectMeta>, ObjectStorageError> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .max_keys(Self::MAX_LISTED_OBJECTS)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .int_err()?;

            for obj in resp.contents.unwrap_or_default() {
                let key = obj
                    .key
                    .ok_or_else(|| "listing returned an object without a key".int_err())?;
                objects.push(ObjectMeta {
                    key,
                    size: u64::try_from(obj.size.unwrap_or_default()).unwrap_or_default(),
                    last_modified: Self::convert_time(obj.last_modified)?,
                });
            }

            match resp.next_continuation_token {
                Some(token) if resp.is_truncated.unwrap_or_default() => {
                    continuation_token = Some(token);
                }
                _ => break,
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}
