// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use dill::{component, interface, scope, Singleton};
use nimbus_forecast::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Stateful fake of the remote forecasting service.
///
/// Creates register resources keyed by the same deterministic ARNs the
/// reconcilers derive, so tests can pre-seed or post-inspect state by ARN.
/// Asynchronous resources (import jobs, predictors, forecasts, exports) are
/// created in `CREATE_IN_PROGRESS` and advanced explicitly via
/// [`InMemForecastApi::set_status`]. Every operation supports queued error
/// injection and counts its create calls.
pub struct InMemForecastApi {
    scope: Arc<ServiceScope>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    datasets: HashMap<String, DatasetDescription>,
    dataset_groups: HashMap<String, DatasetGroupDescription>,
    import_jobs: HashMap<String, ImportJobDescription>,
    predictors: HashMap<String, PredictorRecord>,
    forecasts: HashMap<String, ForecastRecord>,
    exports: HashMap<String, ExportRecord>,
    tags: HashMap<String, Vec<ResourceTag>>,
    create_counts: HashMap<&'static str, usize>,
    injected_errors: HashMap<String, Vec<ApiError>>,
    now: Option<DateTime<Utc>>,
}

struct PredictorRecord {
    summary: PredictorSummary,
    reference_predictor_arn: Option<String>,
    config: serde_json::Map<String, serde_json::Value>,
    encryption: Option<EncryptionConfig>,
}

struct ForecastRecord {
    summary: ForecastSummary,
    config: serde_json::Map<String, serde_json::Value>,
}

struct ExportRecord {
    description: ExportDescription,
    kind: ExportKind,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl Default for InMemForecastApi {
    fn default() -> Self {
        Self::new(Arc::new(ServiceScope::new("aws", "us-east-1", "123456789012")))
    }
}

#[component(pub)]
#[scope(Singleton)]
#[interface(dyn ForecastApi)]
impl InMemForecastApi {
    pub fn new(scope: Arc<ServiceScope>) -> Self {
        Self {
            scope,
            state: Mutex::new(State::default()),
        }
    }
}

impl InMemForecastApi {
    /// Pin the clock used for creation timestamps. Each create advances it
    /// by one second so list orderings stay deterministic.
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.state.lock().unwrap().now = Some(now);
    }

    /// Queue an error to be returned by the next call of the named
    /// operation (e.g. `"create_predictor"`). Errors queue FIFO and are
    /// consumed one per call.
    pub fn inject_error(&self, operation: &str, error: ApiError) {
        self.state
            .lock()
            .unwrap()
            .injected_errors
            .entry(operation.to_string())
            .or_default()
            .push(error);
    }

    pub fn create_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .create_counts
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    /// Force the lifecycle status of any registered resource
    pub fn set_status(&self, arn: &str, status: Status) {
        let mut state = self.state.lock().unwrap();
        let now = state.tick();
        if let Some(r) = state.datasets.get_mut(arn) {
            r.status = status;
            r.last_modification_time = now;
        } else if let Some(r) = state.dataset_groups.get_mut(arn) {
            r.status = status;
            r.last_modification_time = now;
        } else if let Some(r) = state.import_jobs.get_mut(arn) {
            r.status = status;
            r.last_modification_time = now;
        } else if let Some(r) = state.predictors.get_mut(arn) {
            r.summary.status = status;
            r.summary.last_modification_time = now;
        } else if let Some(r) = state.forecasts.get_mut(arn) {
            r.summary.status = status;
            r.summary.last_modification_time = now;
        } else if let Some(r) = state.exports.get_mut(arn) {
            r.description.status = status;
        } else {
            panic!("no resource registered under {arn}");
        }
    }

    /// Backdate or postdate a resource's last modification time
    pub fn set_last_modification(&self, arn: &str, t: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(r) = state.datasets.get_mut(arn) {
            r.last_modification_time = t;
        } else if let Some(r) = state.dataset_groups.get_mut(arn) {
            r.last_modification_time = t;
        } else if let Some(r) = state.import_jobs.get_mut(arn) {
            r.last_modification_time = t;
        } else if let Some(r) = state.predictors.get_mut(arn) {
            r.summary.last_modification_time = t;
        } else if let Some(r) = state.forecasts.get_mut(arn) {
            r.summary.last_modification_time = t;
        } else {
            panic!("no resource registered under {arn}");
        }
    }

    pub fn tags_of(&self, arn: &str) -> Vec<ResourceTag> {
        self.state
            .lock()
            .unwrap()
            .tags
            .get(arn)
            .cloned()
            .unwrap_or_default()
    }

    pub fn predictor_reference_arn(&self, arn: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .predictors
            .get(arn)
            .and_then(|r| r.reference_predictor_arn.clone())
    }

    pub fn predictor_config(&self, arn: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.state
            .lock()
            .unwrap()
            .predictors
            .get(arn)
            .map(|r| r.config.clone())
    }

    pub fn predictor_encryption(&self, arn: &str) -> Option<EncryptionConfig> {
        self.state
            .lock()
            .unwrap()
            .predictors
            .get(arn)
            .and_then(|r| r.encryption.clone())
    }

    pub fn forecast_config(&self, arn: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.state
            .lock()
            .unwrap()
            .forecasts
            .get(arn)
            .map(|r| r.config.clone())
    }

    pub fn export_destination(&self, arn: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .exports
            .get(arn)
            .map(|r| r.description.destination_url.clone())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl State {
    fn tick(&mut self) -> DateTime<Utc> {
        let now = self
            .now
            .unwrap_or_else(|| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        self.now = Some(now + Duration::seconds(1));
        now
    }

    fn take_injected(&mut self, operation: &str) -> Result<(), ApiError> {
        match self.injected_errors.get_mut(operation) {
            Some(queue) if !queue.is_empty() => Err(queue.remove(0)),
            _ => Ok(()),
        }
    }

    fn count_create(&mut self, operation: &'static str) {
        *self.create_counts.entry(operation).or_default() += 1;
    }

    fn deposit_tags(&mut self, arn: &str, tags: &[ResourceTag]) {
        let active = self.tags.entry(arn.to_string()).or_default();
        for tag in tags {
            match active.iter_mut().find(|t| t.key == tag.key) {
                Some(existing) => existing.value = tag.value.clone(),
                None => active.push(tag.clone()),
            }
        }
    }

    fn already_exists(arn: &str) -> ApiError {
        ApiError::AlreadyExists {
            message: format!("a resource already exists with the arn: {arn}"),
        }
    }
}

/// Swap the resource type segment of an ARN while keeping the source name
/// as a path prefix, the way the service names export jobs
fn sibling_arn(arn: &str, from_resource: &str, to_resource: &str, name: &str) -> String {
    let swapped = arn.replace(
        &format!(":{from_resource}/"),
        &format!(":{to_resource}/"),
    );
    format!("{swapped}/{name}")
}

/// An ARN in the same partition/region/account as the source, but naming a
/// different resource
fn peer_arn(source_arn: &str, resource: &str, name: &str) -> String {
    let prefix = source_arn
        .rsplit_once(':')
        .map(|(prefix, _)| prefix)
        .unwrap_or(source_arn);
    format!("{prefix}:{resource}/{name}")
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl ForecastApi for InMemForecastApi {
    async fn describe_dataset(&self, arn: &str) -> Result<DatasetDescription, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("describe_dataset")?;
        state.datasets.get(arn).cloned().ok_or(ApiError::NotFound)
    }

    async fn create_dataset(&self, request: CreateDataset) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("create_dataset")?;
        state.count_create("create_dataset");

        let arn = self.scope.dataset_arn(&request.name);
        if state.datasets.contains_key(&arn) {
            return Err(State::already_exists(&arn));
        }

        let now = state.tick();
        state.deposit_tags(&arn, &request.tags);
        state.datasets.insert(
            arn.clone(),
            DatasetDescription {
                arn,
                name: request.name,
                dataset_type: request.dataset_type,
                domain: request.domain,
                schema: request.schema,
                data_frequency: request.data_frequency,
                status: Status::Active,
                creation_time: now,
                last_modification_time: now,
            },
        );
        Ok(())
    }

    async fn describe_dataset_group(
        &self,
        arn: &str,
    ) -> Result<DatasetGroupDescription, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("describe_dataset_group")?;
        state
            .dataset_groups
            .get(arn)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create_dataset_group(&self, request: CreateDatasetGroup) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("create_dataset_group")?;
        state.count_create("create_dataset_group");

        let arn = self.scope.dataset_group_arn(&request.name);
        if state.dataset_groups.contains_key(&arn) {
            return Err(State::already_exists(&arn));
        }

        let now = state.tick();
        state.deposit_tags(&arn, &request.tags);
        state.dataset_groups.insert(
            arn.clone(),
            DatasetGroupDescription {
                arn,
                name: request.name,
                domain: request.domain,
                dataset_arns: vec![],
                status: Status::Active,
                creation_time: now,
                last_modification_time: now,
            },
        );
        Ok(())
    }

    async fn update_dataset_group(
        &self,
        arn: &str,
        dataset_arns: Vec<String>,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("update_dataset_group")?;
        let now = state.tick();
        let group = state.dataset_groups.get_mut(arn).ok_or(ApiError::NotFound)?;
        group.dataset_arns = dataset_arns;
        group.last_modification_time = now;
        Ok(())
    }

    async fn list_dataset_import_jobs(
        &self,
        dataset_arn: &str,
        status: Option<Status>,
    ) -> Result<Vec<ImportJobSummary>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("list_dataset_import_jobs")?;

        let mut jobs: Vec<_> = state
            .import_jobs
            .values()
            .filter(|j| j.dataset_arn == dataset_arn)
            .filter(|j| status.is_none_or(|s| j.status == s))
            .map(|j| ImportJobSummary {
                arn: j.arn.clone(),
                status: j.status,
                creation_time: j.creation_time,
                last_modification_time: j.last_modification_time,
            })
            .collect();
        jobs.sort_by(|a, b| b.last_modification_time.cmp(&a.last_modification_time));
        Ok(jobs)
    }

    async fn describe_dataset_import_job(
        &self,
        arn: &str,
    ) -> Result<ImportJobDescription, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("describe_dataset_import_job")?;
        state.import_jobs.get(arn).cloned().ok_or(ApiError::NotFound)
    }

    async fn create_dataset_import_job(
        &self,
        request: CreateImportJob,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("create_dataset_import_job")?;
        state.count_create("create_dataset_import_job");

        let arn = sibling_arn(
            &request.dataset_arn,
            "dataset",
            "dataset-import-job",
            &request.name,
        );
        if state.import_jobs.contains_key(&arn) {
            return Err(State::already_exists(&arn));
        }

        let now = state.tick();
        state.deposit_tags(&arn, &request.tags);
        state.import_jobs.insert(
            arn.clone(),
            ImportJobDescription {
                arn,
                dataset_arn: request.dataset_arn,
                source_url: request.source_url,
                status: Status::CreateInProgress,
                creation_time: now,
                last_modification_time: now,
            },
        );
        Ok(())
    }

    async fn list_predictors(
        &self,
        dataset_group_arn: Option<&str>,
        status: Option<Status>,
        auto: bool,
    ) -> Result<Vec<PredictorSummary>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("list_predictors")?;

        let mut predictors: Vec<_> = state
            .predictors
            .values()
            .filter(|p| p.summary.is_auto == auto)
            .filter(|p| {
                dataset_group_arn.is_none_or(|arn| p.summary.dataset_group_arn == arn)
            })
            .filter(|p| status.is_none_or(|s| p.summary.status == s))
            .map(|p| p.summary.clone())
            .collect();
        predictors.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));
        Ok(predictors)
    }

    async fn describe_predictor(
        &self,
        arn: &str,
        auto: bool,
    ) -> Result<PredictorDescription, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("describe_predictor")?;
        state
            .predictors
            .get(arn)
            .filter(|p| p.summary.is_auto == auto)
            .map(|p| PredictorDescription {
                arn: p.summary.arn.clone(),
                status: p.summary.status,
                creation_time: p.summary.creation_time,
                last_modification_time: p.summary.last_modification_time,
            })
            .ok_or(ApiError::NotFound)
    }

    async fn create_predictor(&self, request: CreatePredictor) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("create_predictor")?;
        state.count_create("create_predictor");

        let arn = peer_arn(&request.dataset_group_arn, "predictor", &request.name);
        if state.predictors.contains_key(&arn) {
            return Err(State::already_exists(&arn));
        }

        let now = state.tick();
        state.deposit_tags(&arn, &request.tags);
        state.predictors.insert(
            arn.clone(),
            PredictorRecord {
                summary: PredictorSummary {
                    arn,
                    dataset_group_arn: request.dataset_group_arn,
                    is_auto: request.auto,
                    status: Status::CreateInProgress,
                    creation_time: now,
                    last_modification_time: now,
                },
                reference_predictor_arn: request.reference_predictor_arn,
                config: request.config,
                encryption: request.encryption,
            },
        );
        Ok(())
    }

    async fn list_forecasts(
        &self,
        dataset_group_arn: &str,
    ) -> Result<Vec<ForecastSummary>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("list_forecasts")?;

        let mut forecasts: Vec<_> = state
            .forecasts
            .values()
            .filter(|f| f.summary.dataset_group_arn == dataset_group_arn)
            .map(|f| f.summary.clone())
            .collect();
        forecasts.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));
        Ok(forecasts)
    }

    async fn describe_forecast(&self, arn: &str) -> Result<ForecastDescription, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("describe_forecast")?;
        state
            .forecasts
            .get(arn)
            .map(|f| ForecastDescription {
                arn: f.summary.arn.clone(),
                predictor_arn: f.summary.predictor_arn.clone(),
                status: f.summary.status,
                creation_time: f.summary.creation_time,
                last_modification_time: f.summary.last_modification_time,
            })
            .ok_or(ApiError::NotFound)
    }

    async fn create_forecast(&self, request: CreateForecast) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("create_forecast")?;
        state.count_create("create_forecast");

        let dataset_group_arn = state
            .predictors
            .get(&request.predictor_arn)
            .map(|p| p.summary.dataset_group_arn.clone())
            .ok_or_else(|| ApiError::Validation {
                message: format!("unknown predictor: {}", request.predictor_arn),
            })?;

        let arn = peer_arn(&request.predictor_arn, "forecast", &request.name);
        if state.forecasts.contains_key(&arn) {
            return Err(State::already_exists(&arn));
        }

        let now = state.tick();
        state.deposit_tags(&arn, &request.tags);
        state.forecasts.insert(
            arn.clone(),
            ForecastRecord {
                summary: ForecastSummary {
                    arn,
                    predictor_arn: request.predictor_arn,
                    dataset_group_arn,
                    status: Status::CreateInProgress,
                    creation_time: now,
                    last_modification_time: now,
                },
                config: request.config,
            },
        );
        Ok(())
    }

    async fn describe_export(
        &self,
        kind: ExportKind,
        arn: &str,
    ) -> Result<ExportDescription, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("describe_export")?;
        state
            .exports
            .get(arn)
            .filter(|e| e.kind == kind)
            .map(|e| e.description.clone())
            .ok_or(ApiError::NotFound)
    }

    async fn create_export(&self, request: CreateExport) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("create_export")?;
        state.count_create("create_export");

        let (from_resource, to_resource) = match request.kind {
            ExportKind::ForecastExport => ("forecast", "forecast-export-job"),
            ExportKind::PredictorBacktest => ("predictor", "predictor-backtest-export-job"),
        };
        let arn = sibling_arn(&request.source_arn, from_resource, to_resource, &request.name);
        if state.exports.contains_key(&arn) {
            return Err(State::already_exists(&arn));
        }

        state.tick();
        state.deposit_tags(&arn, &request.tags);
        state.exports.insert(
            arn.clone(),
            ExportRecord {
                description: ExportDescription {
                    arn,
                    status: Status::CreateInProgress,
                    destination_url: request.destination_url,
                },
                kind: request.kind,
            },
        );
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<ResourceTag>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("list_tags")?;
        Ok(state.tags.get(arn).cloned().unwrap_or_default())
    }

    async fn tag_resource(&self, arn: &str, tags: Vec<ResourceTag>) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("tag_resource")?;
        state.deposit_tags(arn, &tags);
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: Vec<String>) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.take_injected("untag_resource")?;
        if let Some(active) = state.tags.get_mut(arn) {
            active.retain(|t| !keys.contains(&t.key));
        }
        Ok(())
    }
}
