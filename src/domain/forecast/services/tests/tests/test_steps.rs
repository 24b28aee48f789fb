// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use assert_matches::assert_matches;
use nimbus_forecast::*;
use nimbus_forecast_services::{ConfigError, StepError, StepRequest};
use pretty_assertions::assert_eq;

use super::harness::{ForecastHarness, BUCKET};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const KEY: &str = "train/retail.csv";

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_create_dataset_polls_pending_until_active() {
    let harness = ForecastHarness::new();
    harness.storage.put_object(BUCKET, KEY, b"v1".to_vec());
    let request = harness.request(KEY);

    // the first pass issues the create and reports pending; the retry
    // finds the dataset and returns its ARN
    assert_matches!(
        harness.runner.create_dataset(&request).await,
        Err(StepError::Pending)
    );
    assert_eq!(
        harness.runner.create_dataset(&request).await.unwrap(),
        harness.dataset_arn("retail")
    );
}

#[test_log::test(tokio::test)]
async fn test_create_dataset_group_assigns_datasets_and_records_the_update() {
    let harness = ForecastHarness::new();
    harness.storage.put_object(BUCKET, KEY, b"v1".to_vec());
    let request = harness.request(KEY);

    let groups = harness.runner.create_dataset_group(&request).await.unwrap();
    assert_eq!(groups, vec!["retail".to_string()]);

    let group = harness
        .api
        .describe_dataset_group(&harness.dataset_group_arn("retail"))
        .await
        .unwrap();
    assert_eq!(group.dataset_arns, vec![harness.dataset_arn("retail")]);

    let tags = harness.api.tags_of(&harness.dataset_group_arn("retail"));
    assert!(tags.contains(&ResourceTag::new(TAG_LATEST_DATASET_UPDATE_NAME, "retail.csv")));
    assert!(tags
        .iter()
        .any(|t| t.key == TAG_LATEST_DATASET_UPDATE_ETAG && !t.value.is_empty()));
}

#[test_log::test(tokio::test)]
async fn test_create_dataset_group_updates_every_dependent_group() {
    let harness = ForecastHarness::new();
    harness.storage.put_object(BUCKET, KEY, b"v1".to_vec());

    let yaml = indoc::indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              TimestampFormat: yyyy-MM-dd
              Schema:
                Attributes:
                  - AttributeName: item_id
                    AttributeType: string
          AutoPredictor:
            ForecastHorizon: 30
          Forecast:
            ForecastTypes: ["0.50"]
        aggregated:
          Datasets:
            From: retail
        "#
    );
    let request = StepRequest {
        bucket: BUCKET.to_string(),
        dataset_file: KEY.to_string(),
        dataset_group_name: None,
        config: serde_yaml::from_str(yaml).unwrap(),
    };

    let groups = harness.runner.create_dataset_group(&request).await.unwrap();
    assert_eq!(groups, vec!["retail".to_string(), "aggregated".to_string()]);

    // both groups share the file's dataset
    for group in ["retail", "aggregated"] {
        let info = harness
            .api
            .describe_dataset_group(&harness.dataset_group_arn(group))
            .await
            .unwrap();
        assert_eq!(info.dataset_arns, vec![harness.dataset_arn("retail")]);
    }
}

#[test_log::test(tokio::test)]
async fn test_create_dataset_reports_mismatches() {
    let harness = ForecastHarness::new();
    harness.storage.put_object(BUCKET, KEY, b"v1".to_vec());

    // a pre-existing dataset that disagrees on every configurable field
    harness
        .api
        .create_dataset(CreateDataset {
            name: DatasetName::new("retail").unwrap(),
            dataset_type: DatasetType::RelatedTimeSeries,
            domain: DatasetDomain::Custom,
            schema: serde_json::json!({"Attributes": []}),
            data_frequency: Some(DataFrequency::new("W").unwrap()),
            encryption: None,
            tags: vec![],
        })
        .await
        .unwrap();

    let request = harness.request(KEY);
    let Err(StepError::Mismatch { mismatches }) = harness.runner.create_dataset(&request).await
    else {
        panic!("expected a mismatch error");
    };
    assert_eq!(mismatches.len(), 4);
    assert_eq!(
        mismatches[0],
        "dataset type (RELATED_TIME_SERIES) does not match expected (TARGET_TIME_SERIES)"
    );
    assert_eq!(mismatches[1], "dataset domain (CUSTOM) does not match (RETAIL)");
    assert_eq!(mismatches[2], "data frequency (W) does not match (D)");
    assert_eq!(mismatches[3], "dataset schema does not match");
}

#[test_log::test(tokio::test)]
async fn test_full_pipeline_to_an_exported_forecast() {
    let harness = ForecastHarness::new();
    harness.import_file(KEY, "item,ts,demand\n").await;
    let request = harness.group_request(KEY, "retail");

    // predictor: training starts, then completes
    assert_matches!(
        harness.runner.create_predictor(&request).await,
        Err(StepError::Pending)
    );
    let predictor_arn = harness
        .latest_predictor_arn(&request, "retail")
        .await
        .unwrap();
    harness.api.set_status(&predictor_arn, Status::Active);
    assert_eq!(
        harness.runner.create_predictor(&request).await.unwrap(),
        predictor_arn
    );

    // forecast: generation starts, then completes
    assert_matches!(
        harness.runner.create_forecast(&request).await,
        Err(StepError::Pending)
    );
    let forecasts = harness
        .api
        .list_forecasts(&harness.dataset_group_arn("retail"))
        .await
        .unwrap();
    assert_eq!(forecasts.len(), 1);
    assert_eq!(forecasts[0].predictor_arn, predictor_arn);
    harness.api.set_status(&forecasts[0].arn, Status::Active);
    let forecast_arn = harness.runner.create_forecast(&request).await.unwrap();
    assert_eq!(forecast_arn, forecasts[0].arn);

    // forecast export lands under exports/ in the data bucket
    assert_matches!(
        harness.runner.export_forecast(&request).await,
        Err(StepError::Pending)
    );
    let forecast_name = forecast_arn.rsplit('/').next().unwrap();
    let export_arn = format!(
        "{}/export_{forecast_name}",
        forecast_arn.replace(":forecast/", ":forecast-export-job/")
    );
    assert_eq!(
        harness.api.export_destination(&export_arn),
        Some(format!("s3://data/exports/export_{forecast_name}"))
    );
    harness.api.set_status(&export_arn, Status::Active);

    // the job shards its output; the runner skips empty parts and stages
    // the first real one under a stable key
    let prefix = format!("exports/export_{forecast_name}");
    harness
        .storage
        .put_object(BUCKET, &format!("{prefix}/part0.csv"), b"".to_vec());
    harness.storage.put_object(
        BUCKET,
        &format!("{prefix}/part1.csv"),
        b"item,ts,p50\n".to_vec(),
    );
    assert_eq!(
        harness.runner.export_forecast(&request).await.unwrap(),
        forecast_arn
    );
    assert_eq!(
        harness
            .storage
            .get_object(BUCKET, &format!("{prefix}.csv"))
            .await
            .unwrap(),
        b"item,ts,p50\n"
    );

    // backtest export follows the same poll cycle
    assert_matches!(
        harness.runner.export_predictor_backtest(&request).await,
        Err(StepError::Pending)
    );
}

#[test_log::test(tokio::test)]
async fn test_export_without_output_files_is_an_error() {
    let harness = ForecastHarness::new();
    harness.import_file(KEY, "item,ts,demand\n").await;
    let request = harness.group_request(KEY, "retail");

    assert_matches!(
        harness.runner.create_predictor(&request).await,
        Err(StepError::Pending)
    );
    let predictor_arn = harness
        .latest_predictor_arn(&request, "retail")
        .await
        .unwrap();
    harness.api.set_status(&predictor_arn, Status::Active);
    harness.runner.create_predictor(&request).await.unwrap();

    assert_matches!(
        harness.runner.create_forecast(&request).await,
        Err(StepError::Pending)
    );
    let forecasts = harness
        .api
        .list_forecasts(&harness.dataset_group_arn("retail"))
        .await
        .unwrap();
    harness.api.set_status(&forecasts[0].arn, Status::Active);
    harness.runner.create_forecast(&request).await.unwrap();

    assert_matches!(
        harness.runner.export_forecast(&request).await,
        Err(StepError::Pending)
    );
    let forecast_name = forecasts[0].arn.rsplit('/').next().unwrap();
    let export_arn = format!(
        "{}/export_{forecast_name}",
        forecasts[0].arn.replace(":forecast/", ":forecast-export-job/")
    );
    harness.api.set_status(&export_arn, Status::Active);

    // the job reports ACTIVE but only wrote an empty part file
    harness.storage.put_object(
        BUCKET,
        &format!("exports/export_{forecast_name}/part0.csv"),
        b"".to_vec(),
    );
    assert_matches!(
        harness.runner.export_forecast(&request).await,
        Err(StepError::Internal(e))
            if e.reason() == format!(
                "could not find forecast output at s3://data/exports/export_{forecast_name}"
            )
    );
}

#[test_log::test(tokio::test)]
async fn test_create_forecast_requires_a_predictor() {
    let harness = ForecastHarness::new();
    harness.import_file(KEY, "item,ts,demand\n").await;
    let request = harness.group_request(KEY, "retail");

    assert_matches!(
        harness.runner.create_forecast(&request).await,
        Err(StepError::Config(ConfigError::Invalid(message)))
            if message == "no predictor exists for retail - cannot create a forecast"
    );
}

#[test_log::test(tokio::test)]
async fn test_predictor_steps_require_a_group_name() {
    let harness = ForecastHarness::new();
    let request = harness.request(KEY);

    assert_matches!(
        harness.runner.create_predictor(&request).await,
        Err(StepError::Config(ConfigError::Invalid(message)))
            if message == "this step requires a dataset_group_name"
    );
}

#[test_log::test(tokio::test)]
async fn test_superseded_invocation_stops_the_pipeline() {
    let harness = ForecastHarness::new();
    harness.import_file(KEY, "item,ts,demand\n").await;

    harness
        .api
        .tag_resource(
            &harness.dataset_group_arn("retail"),
            vec![ResourceTag::new(TAG_LATEST_DATASET_UPDATE_NAME, "retail.related.csv")],
        )
        .await
        .unwrap();

    let request = harness.group_request(KEY, "retail");
    assert_matches!(
        harness.runner.create_predictor(&request).await,
        Err(StepError::Superseded { triggered_by, latest: Some(latest) })
            if triggered_by == "retail.csv" && latest == "retail.related.csv"
    );
}

#[test_log::test(tokio::test)]
async fn test_failed_training_surfaces_with_its_status() {
    let harness = ForecastHarness::new();
    harness.import_file(KEY, "item,ts,demand\n").await;
    let request = harness.group_request(KEY, "retail");

    assert_matches!(
        harness.runner.create_predictor(&request).await,
        Err(StepError::Pending)
    );
    let predictor_arn = harness
        .latest_predictor_arn(&request, "retail")
        .await
        .unwrap();
    harness.api.set_status(&predictor_arn, Status::CreateFailed);

    // a failed predictor reads as missing, so the step retrains rather
    // than reporting the stale failure forever
    assert_matches!(
        harness.runner.create_predictor(&request).await,
        Err(StepError::Pending)
    );
    assert_eq!(harness.api.create_count("create_predictor"), 2);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Service error classification
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_transient_limits_poll_as_pending() {
    let harness = ForecastHarness::new();
    harness.import_file(KEY, "item,ts,demand\n").await;
    let request = harness.group_request(KEY, "retail");

    harness.api.inject_error(
        "create_predictor",
        ApiError::LimitExceeded {
            message: "Unable to run this many jobs concurrently".to_string(),
        },
    );
    assert_matches!(
        harness.runner.create_predictor(&request).await,
        Err(StepError::Pending)
    );

    harness.api.inject_error(
        "create_predictor",
        ApiError::LimitExceeded {
            message: "Quota limit of 5 dataset import jobs has been reached".to_string(),
        },
    );
    assert_matches!(
        harness.runner.create_predictor(&request).await,
        Err(StepError::Pending)
    );
}

#[test_log::test(tokio::test)]
async fn test_hard_limits_surface_to_the_operator() {
    let harness = ForecastHarness::new();
    harness.import_file(KEY, "item,ts,demand\n").await;
    let request = harness.group_request(KEY, "retail");

    harness.api.inject_error(
        "create_predictor",
        ApiError::LimitExceeded {
            message: "You have reached your account predictor limit".to_string(),
        },
    );
    assert_matches!(
        harness.runner.create_predictor(&request).await,
        Err(StepError::Api(ApiError::LimitExceeded { .. }))
    );
}

#[test_log::test(tokio::test)]
async fn test_resource_in_use_polls_as_pending() {
    let harness = ForecastHarness::new();
    harness.storage.put_object(BUCKET, KEY, b"v1".to_vec());
    let request = harness.request(KEY);

    harness.api.inject_error(
        "create_dataset",
        ApiError::InUse {
            message: "the dataset is currently updating".to_string(),
        },
    );
    assert_matches!(
        harness.runner.create_dataset(&request).await,
        Err(StepError::Pending)
    );
}
