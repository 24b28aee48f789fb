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
use nimbus_forecast_services::ReconcileError;
use pretty_assertions::assert_eq;

use super::harness::ForecastHarness;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn params() -> DatasetParams {
    DatasetParams {
        name: DatasetName::new("retail").unwrap(),
        dataset_type: DatasetType::TargetTimeSeries,
        domain: DatasetDomain::Retail,
        schema: serde_json::json!({"Attributes": [{"AttributeName": "item_id"}]}),
        frequency: Some(DataFrequency::new("D").unwrap()),
        user_tags: UserTags::default(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_create_registers_the_dataset_with_solution_tags() {
    let harness = ForecastHarness::new();
    let params = params();

    assert_eq!(
        harness.dataset_reconciler.status(&params).await.unwrap(),
        ResourceState::Missing
    );

    harness.dataset_reconciler.create(&params).await.unwrap();

    let arn = harness.dataset_arn("retail");
    assert_eq!(
        harness.dataset_reconciler.status(&params).await.unwrap(),
        ResourceState::Exists(Status::Active)
    );
    assert_eq!(
        harness.api.tags_of(&arn),
        vec![ResourceTag::new(TAG_SOLUTION_ID, "SO0123")]
    );
}

#[test_log::test(tokio::test)]
async fn test_create_is_idempotent() {
    let harness = ForecastHarness::new();
    let params = params();

    harness.dataset_reconciler.create(&params).await.unwrap();
    // second pass sees the matching dataset and swallows the service's
    // already-exists response
    harness.dataset_reconciler.create(&params).await.unwrap();

    assert_eq!(harness.api.create_count("create_dataset"), 2);
}

#[test_log::test(tokio::test)]
async fn test_create_applies_user_tags() {
    let harness = ForecastHarness::new();
    let mut params = params();
    params.user_tags = UserTags {
        resource_tags: vec![TagSpec::present("env", "prod")],
        global_tags: vec![TagSpec::present("team", "ml")],
    };

    harness.dataset_reconciler.create(&params).await.unwrap();

    let tags = harness.api.tags_of(&harness.dataset_arn("retail"));
    assert!(tags.contains(&ResourceTag::new("env", "prod")));
    assert!(tags.contains(&ResourceTag::new("team", "ml")));
}

#[test_log::test(tokio::test)]
async fn test_mismatched_dataset_reports_every_difference_at_once() {
    let harness = ForecastHarness::new();

    let mut existing = params();
    existing.domain = DatasetDomain::Custom;
    existing.frequency = Some(DataFrequency::new("W").unwrap());
    harness.dataset_reconciler.create(&existing).await.unwrap();

    let result = harness.dataset_reconciler.create(&params()).await;
    assert_matches!(
        result,
        Err(ReconcileError::Mismatch { mismatches }) if mismatches == vec![
            "dataset domain (CUSTOM) does not match (RETAIL)".to_string(),
            "data frequency (W) does not match (D)".to_string(),
        ]
    );

    // nothing was recreated
    assert_eq!(harness.api.create_count("create_dataset"), 1);
}
