// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use nimbus_forecast::*;
use pretty_assertions::assert_eq;

use super::harness::{ForecastHarness, BUCKET};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const KEY: &str = "train/retail.csv";

fn params(harness: &ForecastHarness) -> ImportJobParams {
    ImportJobParams {
        dataset_file: DatasetFile::new(BUCKET, KEY),
        dataset_arn: harness.dataset_arn("retail"),
        timestamp_format: None,
        geolocation_format: None,
        time_zone: None,
        use_geolocation_for_time_zone: None,
        user_tags: UserTags::default(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_import_name_embeds_the_file_modification_time() {
    let harness = ForecastHarness::new();
    let params = params(&harness);
    harness.storage.put_object_at(
        BUCKET,
        KEY,
        b"item,ts,demand\n".to_vec(),
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
    );

    assert_eq!(
        harness.import_job_reconciler.status(&params).await.unwrap(),
        ResourceState::Missing
    );
    harness.import_job_reconciler.create(&params).await.unwrap();

    let arn = harness
        .import_job_reconciler
        .latest_arn(&params)
        .await
        .unwrap()
        .unwrap();
    assert!(arn.ends_with("dataset-import-job/retail/retail_2024_01_15_10_30_00"), "{arn}");
}

#[test_log::test(tokio::test)]
async fn test_active_import_with_matching_fingerprint_is_current() {
    let harness = ForecastHarness::new();
    let params = params(&harness);
    harness.storage.put_object(BUCKET, KEY, b"v1".to_vec());

    harness.import_job_reconciler.create(&params).await.unwrap();
    let arn = harness
        .import_job_reconciler
        .latest_arn(&params)
        .await
        .unwrap()
        .unwrap();
    harness.api.set_status(&arn, Status::Active);

    assert_eq!(
        harness.import_job_reconciler.status(&params).await.unwrap(),
        ResourceState::Exists(Status::Active)
    );
}

#[test_log::test(tokio::test)]
async fn test_changed_content_marks_the_import_stale() {
    let harness = ForecastHarness::new();
    let params = params(&harness);
    harness.storage.put_object(BUCKET, KEY, b"v1".to_vec());

    harness.import_job_reconciler.create(&params).await.unwrap();
    let arn = harness
        .import_job_reconciler
        .latest_arn(&params)
        .await
        .unwrap()
        .unwrap();
    harness.api.set_status(&arn, Status::Active);

    // the file is overwritten after the import completed
    harness.storage.put_object(BUCKET, KEY, b"v2".to_vec());

    assert_matches!(
        harness.import_job_reconciler.status(&params).await.unwrap(),
        ResourceState::Stale { reason }
            if reason == "content signature changed since the last import"
    );
}

#[test_log::test(tokio::test)]
async fn test_import_without_recorded_fingerprint_is_stale() {
    let harness = ForecastHarness::new();
    let params = params(&harness);
    harness.storage.put_object(BUCKET, KEY, b"v1".to_vec());

    // an import left behind by an engine version that did not record
    // content signatures
    harness
        .api
        .create_dataset_import_job(CreateImportJob {
            name: "retail_2023_12_01_00_00_00".to_string(),
            dataset_arn: params.dataset_arn.clone(),
            source_url: params.dataset_file.s3_url(),
            role_arn: None,
            timestamp_format: None,
            geolocation_format: None,
            time_zone: None,
            use_geolocation_for_time_zone: None,
            tags: vec![],
        })
        .await
        .unwrap();
    let arn = harness
        .import_job_reconciler
        .latest_arn(&params)
        .await
        .unwrap()
        .unwrap();
    harness.api.set_status(&arn, Status::Active);

    assert_matches!(
        harness.import_job_reconciler.status(&params).await.unwrap(),
        ResourceState::Stale { reason }
            if reason == "no content signature recorded on the last import"
    );
}

#[test_log::test(tokio::test)]
async fn test_in_flight_import_is_not_fingerprint_checked() {
    let harness = ForecastHarness::new();
    let params = params(&harness);
    harness.storage.put_object(BUCKET, KEY, b"v1".to_vec());

    harness.import_job_reconciler.create(&params).await.unwrap();
    // content changes while the import is still running; the running
    // import's status is reported as-is
    harness.storage.put_object(BUCKET, KEY, b"v2".to_vec());

    assert_eq!(
        harness.import_job_reconciler.status(&params).await.unwrap(),
        ResourceState::Exists(Status::CreateInProgress)
    );
}

#[test_log::test(tokio::test)]
async fn test_reimport_converges_on_the_newest_job() {
    let harness = ForecastHarness::new();
    let params = params(&harness);
    let uploaded = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
    harness
        .storage
        .put_object_at(BUCKET, KEY, b"v1".to_vec(), uploaded);

    harness.import_job_reconciler.create(&params).await.unwrap();
    let first_arn = harness
        .import_job_reconciler
        .latest_arn(&params)
        .await
        .unwrap()
        .unwrap();
    harness.api.set_status(&first_arn, Status::Active);

    // a newer upload of the same file
    harness.storage.put_object_at(
        BUCKET,
        KEY,
        b"v2".to_vec(),
        uploaded + Duration::hours(1),
    );
    harness.import_job_reconciler.create(&params).await.unwrap();

    let latest_arn = harness
        .import_job_reconciler
        .latest_arn(&params)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(latest_arn, first_arn);
    assert!(latest_arn.ends_with("retail_2024_01_15_11_30_00"), "{latest_arn}");
    assert_eq!(harness.api.create_count("create_dataset_import_job"), 2);
}
