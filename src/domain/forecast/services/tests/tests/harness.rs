// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use dill::CatalogBuilder;
use indoc::indoc;
use nimbus_forecast::*;
use nimbus_forecast_inmem::{InMemForecastApi, InMemObjectStorage};
use nimbus_forecast_services::*;
use time_source::{SystemTimeSource, SystemTimeSourceStub};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const BUCKET: &str = "data";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
}

pub fn default_config_yaml() -> &'static str {
    indoc!(
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
                  - AttributeName: timestamp
                    AttributeType: timestamp
                  - AttributeName: demand
                    AttributeType: float
          AutoPredictor:
            ForecastHorizon: 30
            ForecastFrequency: D
          Forecast:
            ForecastTypes:
              - "0.50"
              - "0.90"
        "#
    )
}

pub fn config_value(yaml: &str) -> serde_json::Value {
    serde_yaml::from_str(yaml).unwrap()
}

pub fn resolver(yaml: &str) -> ConfigResolver {
    ConfigResolver::from_yaml_str(yaml, "test config").unwrap()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Full service stack wired over the in-memory fakes
pub struct ForecastHarness {
    pub api: Arc<InMemForecastApi>,
    pub storage: Arc<InMemObjectStorage>,
    pub time: Arc<SystemTimeSourceStub>,
    pub scope: Arc<ServiceScope>,
    pub runner: Arc<StepRunner>,
    pub dataset_reconciler: Arc<DatasetReconciler>,
    pub group_reconciler: Arc<DatasetGroupReconciler>,
    pub import_job_reconciler: Arc<ImportJobReconciler>,
    pub predictor_reconciler: Arc<PredictorReconciler>,
}

impl ForecastHarness {
    pub fn new() -> Self {
        let mut b = CatalogBuilder::new();

        b.add::<InMemForecastApi>();
        b.add::<InMemObjectStorage>();
        b.add_value(ServiceScope::new("aws", "us-east-1", "123456789012"));
        b.add_value(RuntimeConfig {
            solution_id: "SO0123".to_string(),
            forecast_role_arn: Some("arn:aws:iam::123456789012:role/forecast".to_string()),
            kms_key_arn: None,
        });
        b.add_value(SystemTimeSourceStub::new(t0()));
        b.bind::<dyn SystemTimeSource, SystemTimeSourceStub>();
        b.add::<TagApplier>();
        b.add::<DatasetReconciler>();
        b.add::<DatasetGroupReconciler>();
        b.add::<ImportJobReconciler>();
        b.add::<PredictorReconciler>();
        b.add::<ForecastReconciler>();
        b.add::<StepRunner>();

        let catalog = b.build();

        Self {
            api: catalog.get_one().unwrap(),
            storage: catalog.get_one().unwrap(),
            time: catalog.get_one().unwrap(),
            scope: catalog.get_one().unwrap(),
            runner: catalog.get_one().unwrap(),
            dataset_reconciler: catalog.get_one().unwrap(),
            group_reconciler: catalog.get_one().unwrap(),
            import_job_reconciler: catalog.get_one().unwrap(),
            predictor_reconciler: catalog.get_one().unwrap(),
        }
    }

    pub fn request(&self, key: &str) -> StepRequest {
        StepRequest {
            bucket: BUCKET.to_string(),
            dataset_file: key.to_string(),
            dataset_group_name: None,
            config: config_value(default_config_yaml()),
        }
    }

    pub fn group_request(&self, key: &str, group: &str) -> StepRequest {
        StepRequest {
            dataset_group_name: Some(group.to_string()),
            ..self.request(key)
        }
    }

    pub fn dataset_arn(&self, name: &str) -> String {
        self.scope.dataset_arn(&DatasetName::new(name).unwrap())
    }

    pub fn dataset_group_arn(&self, name: &str) -> String {
        self.scope
            .dataset_group_arn(&DatasetGroupName::new(name).unwrap())
    }

    /// Drives the upload of `key` through the dataset, dataset group, and
    /// import job steps until the import is ACTIVE, the way the
    /// orchestrator's retry loop would
    pub async fn import_file(&self, key: &str, body: &str) -> String {
        self.storage.put_object(BUCKET, key, body.as_bytes().to_vec());
        let request = self.request(key);

        assert_matches::assert_matches!(
            self.runner.create_dataset(&request).await,
            Err(StepError::Pending)
        );
        self.runner.create_dataset(&request).await.unwrap();

        self.runner.create_dataset_group(&request).await.unwrap();

        assert_matches::assert_matches!(
            self.runner.create_dataset_import_job(&request).await,
            Err(StepError::Pending)
        );
        let import_arn = self.latest_import_arn(&request).await.unwrap();
        self.api.set_status(&import_arn, Status::Active);
        self.runner
            .create_dataset_import_job(&request)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn latest_import_arn(&self, request: &StepRequest) -> Option<String> {
        let file = request.file();
        let params = ConfigResolver::from_value(request.config.clone(), "test config")
            .unwrap()
            .dataset_import_job(&file, &self.scope)
            .unwrap();
        self.import_job_reconciler
            .latest_arn(&params)
            .await
            .unwrap()
    }

    pub async fn latest_predictor_arn(&self, request: &StepRequest, group: &str) -> Option<String> {
        let file = request.file();
        let params = ConfigResolver::from_value(request.config.clone(), "test config")
            .unwrap()
            .predictor(&file, group)
            .unwrap();
        self.predictor_reconciler
            .latest_arn(&params)
            .await
            .unwrap()
    }
}
