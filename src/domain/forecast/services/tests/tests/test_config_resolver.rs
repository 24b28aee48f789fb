// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use assert_matches::assert_matches;
use indoc::indoc;
use nimbus_forecast::*;
use nimbus_forecast_services::{ConfigError, ConfigResolver};
use pretty_assertions::assert_eq;

use super::harness::{default_config_yaml, resolver};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn file(key: &str) -> DatasetFile {
    DatasetFile::new("data", key)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test]
fn test_rejects_documents_without_a_default_section() {
    assert_matches!(
        ConfigResolver::from_yaml_str("RetailDemand:\n  DatasetGroup:\n    Domain: RETAIL\n", "x"),
        Err(ConfigError::Malformed { message, .. }) if message.contains("`Default` key")
    );
    assert_matches!(
        ConfigResolver::from_yaml_str("- a\n- b\n", "x"),
        Err(ConfigError::Malformed { message, .. }) if message.contains("got a list")
    );
}

#[test]
fn test_section_overrides_win_over_defaults() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
          AutoPredictor:
            ForecastHorizon: 30
          Forecast:
            ForecastTypes: ["0.50"]
        custom_metrics:
          DatasetGroup:
            Domain: METRICS
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: METRICS
              DataFrequency: W
              Schema: {Attributes: [{AttributeName: metric, AttributeType: string}]}
        "#
    ));

    assert_eq!(
        config.dataset_domain(&file("custom_metrics.csv")).unwrap(),
        DatasetDomain::Metrics
    );
    assert_eq!(
        config.data_frequency(&file("custom_metrics.csv")).unwrap(),
        DataFrequency::new("W").unwrap()
    );

    // anything not overridden falls back to the defaults
    assert_eq!(
        config.dataset_domain(&file("other_sales.csv")).unwrap(),
        DatasetDomain::Retail
    );
}

#[test]
fn test_empty_values_fall_through_to_defaults() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
        sparse_sales:
          DatasetGroup:
            Domain: ""
          Datasets: []
        "#
    ));

    // an empty string and an empty list both mean "use the default"
    assert_eq!(
        config
            .dataset_group(&file("sparse_sales.csv"), None)
            .unwrap()
            .domain,
        DatasetDomain::Retail
    );
    assert_eq!(
        config.data_frequency(&file("sparse_sales.csv")).unwrap(),
        DataFrequency::new("D").unwrap()
    );
}

#[test]
fn test_dataset_annotation_follows_the_file_data_type() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: demand, AttributeType: float}]}
            - DatasetType: RELATED_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: price, AttributeType: float}]}
        "#
    ));

    let target_schema = config.dataset_schema(&file("sales.csv")).unwrap();
    let related_schema = config.dataset_schema(&file("sales.related.csv")).unwrap();
    assert_eq!(
        target_schema["Attributes"][0]["AttributeName"],
        serde_json::json!("demand")
    );
    assert_eq!(
        related_schema["Attributes"][0]["AttributeName"],
        serde_json::json!("price")
    );
}

#[test]
fn test_datasets_from_reference_unrolls() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
        store_sales:
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: W
              Schema: {Attributes: [{AttributeName: store, AttributeType: string}]}
        aggregated_sales:
          Datasets:
            From: store_sales
        "#
    ));

    // the referencing group sees the referenced group's datasets
    assert_eq!(
        config.data_frequency(&file("aggregated_sales.csv")).unwrap(),
        DataFrequency::new("W").unwrap()
    );

    // and the referenced group knows its dependents, itself first
    assert_eq!(
        config.dependent_dataset_groups(&file("store_sales.csv")),
        vec!["store_sales".to_string(), "aggregated_sales".to_string()]
    );
}

#[test]
fn test_datasets_from_reference_must_name_a_group() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
        broken_sales:
          Datasets:
            NotFrom: elsewhere
        "#
    ));

    assert_matches!(
        config.data_frequency(&file("broken_sales.csv")),
        Err(ConfigError::Invalid(message))
            if message.contains("a mapping with a key From:")
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Required datasets
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test]
fn test_inherited_default_datasets_only_require_target_data() {
    let config = resolver(default_config_yaml());
    assert_eq!(
        config.required_datasets(&file("sales.related.csv")).unwrap(),
        vec![DatasetType::TargetTimeSeries]
    );
}

#[test]
fn test_explicit_dataset_list_makes_every_type_required() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
        store_sales:
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
            - DatasetType: RELATED_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: price, AttributeType: float}]}
        "#
    ));

    assert_eq!(
        config.required_datasets(&file("store_sales.csv")).unwrap(),
        vec![DatasetType::TargetTimeSeries, DatasetType::RelatedTimeSeries]
    );
}

#[test]
fn test_explicit_dataset_list_must_include_target_data() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
        related_only:
          Datasets:
            - DatasetType: RELATED_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: price, AttributeType: float}]}
        "#
    ));

    assert_matches!(
        config.required_datasets(&file("related_only.csv")),
        Err(ConfigError::Invalid(message))
            if message.contains("you must configure a TARGET_TIME_SERIES dataset")
    );
}

#[test]
fn test_duplicate_dataset_types_are_rejected() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
        doubled_sales:
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: W
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
        "#
    ));

    assert_matches!(
        config.required_datasets(&file("doubled_sales.csv")),
        Err(ConfigError::Invalid(message)) if message.contains("duplicate dataset types")
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Resource params
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test]
fn test_dataset_group_domain_must_match_dataset_domain() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: METRICS
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
        "#
    ));

    assert_matches!(
        config.dataset_group(&file("sales.csv"), None),
        Err(ConfigError::Invalid(message)) if message
            == "The dataset group domain (METRICS) and dataset domain (RETAIL) must match."
    );
}

#[test]
fn test_auto_predictor_wins_over_legacy_predictor() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
          Predictor:
            AlgorithmArn: arn:aws:forecast:::algorithm/NPTS
            ForecastHorizon: 14
          AutoPredictor:
            ForecastHorizon: 30
            MaxAge: 3600
            Tags:
              - {Key: team, Value: ml}
        "#
    ));

    let params = config.predictor(&file("sales.csv"), "sales").unwrap();
    assert!(params.auto);
    assert_eq!(params.max_age, chrono::Duration::seconds(3600));
    // MaxAge and Tags are solution-side settings, not service configuration
    assert!(!params.config.contains_key("MaxAge"));
    assert!(!params.config.contains_key("Tags"));
    assert_eq!(params.config["ForecastHorizon"], serde_json::json!(30));
    assert_eq!(
        params.user_tags.resource_tags,
        vec![TagSpec::present("team", "ml")]
    );
}

#[test]
fn test_predictor_configuration_is_required() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
        "#
    ));

    assert_matches!(
        config.predictor(&file("sales.csv"), "sales"),
        Err(ConfigError::Invalid(message))
            if message == "a Predictor or AutoPredictor configuration must be present"
    );
}

#[test]
fn test_item_metadata_has_no_timestamp_format_or_frequency() {
    let config = resolver(default_config_yaml());
    let metadata = file("sales.metadata.csv");

    assert_eq!(config.data_timestamp_format(&metadata).unwrap(), None);
    assert_eq!(config.dataset(&metadata).unwrap().frequency, None);
    assert_eq!(config.dataset(&metadata).unwrap().name.as_str(), "sales_metadata");
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Validation
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test]
fn test_validate_accepts_a_complete_document() {
    let config = resolver(default_config_yaml());
    assert_eq!(config.validate(), Vec::<String>::new());
}

#[test]
fn test_validate_reports_every_problem_at_once() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
          AutoPredictor:
            ForecastHorizon: 30
          Forecast:
            ForecastTypes: ["0.50"]
        broken_sales:
          DatasetGroup:
            Domain: SOMEWHERE
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Schema: {}
          AutoPredictor:
            ForecastFrequency: D
          Forecast:
            ForecastTypes: ["0.50"]
          Widgets: {}
        "#
    ));

    let errors = config.validate();
    let expect = [
        "configuration issue for broken_sales.DatasetGroup: invalid Domain",
        "configuration issue for broken_sales.Datasets: each dataset needs a valid Domain",
        "configuration issue for broken_sales.Datasets: each dataset needs a Schema with a list \
         of Attributes",
        "configuration issue for broken_sales.AutoPredictor: ForecastHorizon is required",
        "broken_sales resource Widgets is not supported (must be one of 'DatasetGroup', \
         'Datasets', 'Predictor', 'AutoPredictor', 'Forecast', 'Tags')",
    ];
    for expected in expect {
        assert!(
            errors.iter().any(|e| e == expected),
            "missing {expected:?} in {errors:#?}"
        );
    }
    assert_eq!(errors.len(), expect.len(), "{errors:#?}");
}

#[test]
fn test_validate_reports_missing_required_resources() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
        "#
    ));

    let errors = config.validate();
    assert!(errors.contains(
        &"configuration for Default is missing required resource Datasets".to_string()
    ));
    assert!(errors.contains(
        &"configuration for Default is missing required resource Forecast".to_string()
    ));
    assert!(errors.contains(
        &"configuration for Default is missing one of Predictor or AutoPredictor".to_string()
    ));
}

#[test]
fn test_validate_skips_the_testing_section() {
    let config = resolver(indoc!(
        r#"
        Default:
          DatasetGroup:
            Domain: RETAIL
          Datasets:
            - DatasetType: TARGET_TIME_SERIES
              Domain: RETAIL
              DataFrequency: D
              Schema: {Attributes: [{AttributeName: item_id, AttributeType: string}]}
          AutoPredictor:
            ForecastHorizon: 30
          Forecast:
            ForecastTypes: ["0.50"]
        __Testing__:
          AnythingGoes: true
        "#
    ));

    assert_eq!(config.validate(), Vec::<String>::new());
}
