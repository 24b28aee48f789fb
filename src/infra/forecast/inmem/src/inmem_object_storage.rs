// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use dill::{component, interface, scope, Singleton};
use md5::{Digest, Md5};
use nimbus_forecast::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Blob storage fake holding object bodies in memory. Fingerprints are
/// computed over the stored bytes with the same digest the real
/// implementation streams, so staleness checks behave identically.
pub struct InMemObjectStorage {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    objects: HashMap<(String, String), ObjectRecord>,
}

struct ObjectRecord {
    body: Vec<u8>,
    last_modified: DateTime<Utc>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl Default for InMemObjectStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[component(pub)]
#[scope(Singleton)]
#[interface(dyn ObjectStorage)]
impl InMemObjectStorage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }
}

impl InMemObjectStorage {
    pub fn put_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.put_object_at(
            bucket,
            key,
            body,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
    }

    pub fn put_object_at(
        &self,
        bucket: &str,
        key: &str,
        body: impl Into<Vec<u8>>,
        last_modified: DateTime<Utc>,
    ) {
        self.state.lock().unwrap().objects.insert(
            (bucket.to_string(), key.to_string()),
            ObjectRecord {
                body: body.into(),
                last_modified,
            },
        );
    }

    pub fn remove_object(&self, bucket: &str, key: &str) {
        self.state
            .lock()
            .unwrap()
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl State {
    fn get(&self, bucket: &str, key: &str) -> Result<&ObjectRecord, ObjectStorageError> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| ObjectStorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl ObjectStorage for InMemObjectStorage {
    async fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectMeta, ObjectStorageError> {
        let state = self.state.lock().unwrap();
        let record = state.get(bucket, key)?;
        Ok(ObjectMeta {
            key: key.to_string(),
            size: record.body.len() as u64,
            last_modified: record.last_modified,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.get(bucket, key)?.body.clone())
    }

    async fn content_md5(&self, bucket: &str, key: &str) -> Result<String, ObjectStorageError> {
        let state = self.state.lock().unwrap();
        let digest = Md5::digest(&state.get(bucket, key)?.body);
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), ObjectStorageError> {
        let mut state = self.state.lock().unwrap();
        let source = state.get(bucket, source_key)?;
        let copied = ObjectRecord {
            body: source.body.clone(),
            last_modified: source.last_modified,
        };
        state
            .objects
            .insert((bucket.to_string(), dest_key.to_string()), copied);
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectMeta>, ObjectStorageError> {
        let state = self.state.lock().unwrap();
        let mut objects: Vec<_> = state
            .objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), record)| ObjectMeta {
                key: k.clone(),
                size: record.body.len() as u64,
                last_modified: record.last_modified,
            })
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}
