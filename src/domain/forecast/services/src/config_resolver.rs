// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::Duration;
use nimbus_forecast::*;
use serde_json::{Map, Value};
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Section every other section falls back to
pub const DEFAULT_KEY: &str = "Default";

/// Section reserved for integration test fixtures, skipped by validation
pub const TESTING_KEY: &str = "__Testing__";

/// Key of the configuration document in the data bucket
pub const DEFAULT_CONFIG_KEY: &str = "forecast-defaults.yaml";

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "configuration file s3://{bucket}/{key} not found. Refer to the implementation guide \
         for configuration instructions."
    )]
    NotFound { bucket: String, key: String },

    #[error("{location} is not a valid config file: {message}")]
    Malformed { location: String, message: String },

    #[error("configuration item missing key or value for {item}")]
    MissingItem { item: String },

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Internal(#[from] internal_error::InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Resolves per-dataset-group resource configuration from the hierarchical
/// configuration document.
///
/// Every lookup falls back from the dataset group's own section to the
/// `Default` section, path segment by path segment. A section's `Datasets`
/// may be a `{From: other_group}` reference, which resolves to the other
/// section's dataset list before any lookup happens.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    config: Map<String, Value>,
}

impl ConfigResolver {
    pub fn from_value(value: Value, location: &str) -> Result<Self, ConfigError> {
        let Value::Object(config) = value else {
            return Err(ConfigError::Malformed {
                location: location.to_string(),
                message: format!("expected a mapping at the top level, got {}", type_name(&value)),
            });
        };
        if config.get(DEFAULT_KEY).is_none_or(is_unset) {
            return Err(ConfigError::Malformed {
                location: location.to_string(),
                message: format!("a `{DEFAULT_KEY}` key must be present"),
            });
        }
        Ok(Self { config })
    }

    pub fn from_yaml_str(yaml: &str, location: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Malformed {
            location: location.to_string(),
            message: e.to_string(),
        })?;
        Self::from_value(value, location)
    }

    /// Loads from the orchestrator event payload, which carries the already
    /// parsed configuration under the `config` key
    pub fn from_event(event: &Value) -> Result<Self, ConfigError> {
        let config = event.get("config").cloned().unwrap_or(Value::Null);
        Self::from_value(config, "event.config")
    }

    /// Loads the configuration document from the data bucket
    pub async fn load(storage: &dyn ObjectStorage, bucket: &str) -> Result<Self, ConfigError> {
        let body = match storage.get_object(bucket, DEFAULT_CONFIG_KEY).await {
            Ok(body) => body,
            Err(ObjectStorageError::NotFound { bucket, key }) => {
                return Err(ConfigError::NotFound { bucket, key });
            }
            Err(ObjectStorageError::Internal(e)) => return Err(e.into()),
        };
        let location = format!("s3://{bucket}/{DEFAULT_CONFIG_KEY}");
        let yaml = std::str::from_utf8(&body).map_err(|e| ConfigError::Malformed {
            location: location.clone(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(yaml, &location)
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    /// Looks up `item` (a dot-separated path) in the section for
    /// `dataset_file`'s group (or `scope` when given), falling back to the
    /// `Default` section.
    ///
    /// Before the lookup, every section's `Datasets` reference is unrolled
    /// and the section is annotated with the `Dataset` entry matching the
    /// file's data type, so that `Dataset.*` paths resolve per file.
    pub fn config_item(
        &self,
        dataset_file: &DatasetFile,
        item: &str,
        scope: Option<&str>,
    ) -> Result<Value, ConfigError> {
        match self.config_item_opt(dataset_file, item, scope)? {
            Some(value) => Ok(value),
            None => Err(ConfigError::MissingItem {
                item: item.to_string(),
            }),
        }
    }

    /// Same as [`ConfigResolver::config_item`], but a missing item yields
    /// `default` instead of an error
    pub fn config_item_or(
        &self,
        dataset_file: &DatasetFile,
        item: &str,
        scope: Option<&str>,
        default: Value,
    ) -> Result<Value, ConfigError> {
        Ok(self
            .config_item_opt(dataset_file, item, scope)?
            .unwrap_or(default))
    }

    fn config_item_opt(
        &self,
        dataset_file: &DatasetFile,
        item: &str,
        scope: Option<&str>,
    ) -> Result<Option<Value>, ConfigError> {
        let config = self.unrolled(dataset_file.data_type)?;
        let section = scope.unwrap_or_else(|| dataset_file.prefix());

        let mut override_value = config.get(section).cloned().unwrap_or(Value::Null);
        let mut default_value = config.get(DEFAULT_KEY).cloned().unwrap_or(Value::Null);

        for segment in item.split('.') {
            override_value = navigate(&override_value, segment);
            default_value = navigate(&default_value, segment);
        }

        if !is_unset(&override_value) {
            Ok(Some(override_value))
        } else if !is_unset(&default_value) {
            Ok(Some(default_value))
        } else {
            Ok(None)
        }
    }

    /// A copy of the configuration with `Datasets: {From: ...}` references
    /// replaced by the referenced list, and with a `Dataset` entry set per
    /// section to the dataset matching `data_type`
    fn unrolled(&self, data_type: DatasetType) -> Result<Map<String, Value>, ConfigError> {
        let mut config = self.config.clone();
        let keys: Vec<String> = config.keys().cloned().collect();

        for key in keys {
            let datasets = config
                .get(&key)
                .and_then(|section| section.get("Datasets"))
                .cloned()
                .unwrap_or_else(|| Value::Array(vec![]));

            let datasets = if let Value::Object(reference) = &datasets {
                let from = reference.get("From").and_then(Value::as_str).ok_or_else(|| {
                    ConfigError::Invalid(
                        "datasets must be a list, or a mapping with a key From: referencing \
                         another dataset configuration by name"
                            .to_string(),
                    )
                })?;
                config
                    .get(from)
                    .and_then(|section| section.get("Datasets"))
                    .cloned()
                    .unwrap_or_else(|| Value::Array(vec![]))
            } else {
                datasets
            };

            let matching = datasets
                .as_array()
                .into_iter()
                .flatten()
                .find(|ds| {
                    ds.get("DatasetType").and_then(Value::as_str)
                        == Some(data_type.to_string().as_str())
                })
                .cloned();

            if let Some(Value::Object(section)) = config.get_mut(&key) {
                if let Some(dataset) = matching {
                    section.insert("Dataset".to_string(), dataset);
                }
                section.insert("Datasets".to_string(), datasets);
            }
        }

        Ok(config)
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Typed accessors
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub fn dataset_domain(&self, dataset_file: &DatasetFile) -> Result<DatasetDomain, ConfigError> {
        let domain = self.config_item(dataset_file, "Dataset.Domain", None)?;
        parse_domain(&domain).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "invalid Dataset.Domain specified for {}",
                dataset_file.prefix()
            ))
        })
    }

    pub fn dataset_schema(&self, dataset_file: &DatasetFile) -> Result<Value, ConfigError> {
        self.config_item(dataset_file, "Dataset.Schema", None)
    }

    pub fn data_frequency(&self, dataset_file: &DatasetFile) -> Result<DataFrequency, ConfigError> {
        let frequency = self.config_item(dataset_file, "Dataset.DataFrequency", None)?;
        let frequency = frequency.as_str().ok_or_else(|| {
            ConfigError::Invalid("Dataset.DataFrequency must be a string".to_string())
        })?;
        DataFrequency::new(frequency).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Item metadata has no timestamp column, hence no format
    pub fn data_timestamp_format(
        &self,
        dataset_file: &DatasetFile,
    ) -> Result<Option<TimestampFormat>, ConfigError> {
        if dataset_file.data_type == DatasetType::ItemMetadata {
            return Ok(None);
        }
        let format = self.config_item(dataset_file, "Dataset.TimestampFormat", None)?;
        let format = format.as_str().ok_or_else(|| {
            ConfigError::Invalid("Dataset.TimestampFormat must be a string".to_string())
        })?;
        TimestampFormat::new(format)
            .map(Some)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn data_geolocation_format(
        &self,
        dataset_file: &DatasetFile,
    ) -> Result<Option<String>, ConfigError> {
        self.optional_string_item(dataset_file, "Dataset.GeolocationFormat")
    }

    pub fn data_time_zone(&self, dataset_file: &DatasetFile) -> Result<Option<String>, ConfigError> {
        self.optional_string_item(dataset_file, "Dataset.TimeZone")
    }

    pub fn use_geolocation_for_time_zone(
        &self,
        dataset_file: &DatasetFile,
    ) -> Result<Option<bool>, ConfigError> {
        Ok(self
            .config_item_opt(dataset_file, "Dataset.UseGeolocationForTimeZone", None)?
            .and_then(|v| v.as_bool()))
    }

    fn optional_string_item(
        &self,
        dataset_file: &DatasetFile,
        item: &str,
    ) -> Result<Option<String>, ConfigError> {
        Ok(self
            .config_item_opt(dataset_file, item, None)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Desired dataset for the file as uploaded
    pub fn dataset(&self, dataset_file: &DatasetFile) -> Result<DatasetParams, ConfigError> {
        let name = DatasetName::new(dataset_file.name())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let frequency = if dataset_file.data_type == DatasetType::ItemMetadata {
            None
        } else {
            Some(self.data_frequency(dataset_file)?)
        };

        Ok(DatasetParams {
            name,
            dataset_type: dataset_file.data_type,
            domain: self.dataset_domain(dataset_file)?,
            schema: self.dataset_schema(dataset_file)?,
            frequency,
            user_tags: self.config_tags(dataset_file, "Dataset", None)?,
        })
    }

    /// All datasets the file's group requires, derived by reinterpreting the
    /// file as each required data type
    pub fn datasets(&self, dataset_file: &DatasetFile) -> Result<Vec<DatasetParams>, ConfigError> {
        self.required_datasets(dataset_file)?
            .into_iter()
            .map(|data_type| self.dataset(&dataset_file.with_data_type(data_type)))
            .collect()
    }

    /// Dataset types the file's group must have before a predictor can be
    /// generated.
    ///
    /// When the group inherits the `Default` dataset list the policy is
    /// permissive: only target time series data is required, and related or
    /// metadata datasets join the group if and when they are uploaded. An
    /// explicit dataset list makes every listed type required.
    pub fn required_datasets(
        &self,
        dataset_file: &DatasetFile,
    ) -> Result<Vec<DatasetType>, ConfigError> {
        let datasets = self.config_item(dataset_file, "Datasets", None)?;
        let defaults = self
            .config
            .get(DEFAULT_KEY)
            .and_then(|section| section.get("Datasets"));

        if defaults == Some(&datasets) {
            return Ok(vec![DatasetType::TargetTimeSeries]);
        }

        let types: Vec<DatasetType> = datasets
            .as_array()
            .into_iter()
            .flatten()
            .map(|ds| {
                ds.get("DatasetType")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| {
                        ConfigError::Invalid(format!(
                            "invalid DatasetType in Datasets for {}",
                            dataset_file.name()
                        ))
                    })
            })
            .collect::<Result<_, _>>()?;

        if !types.contains(&DatasetType::TargetTimeSeries) {
            return Err(ConfigError::Invalid(format!(
                "you must configure a TARGET_TIME_SERIES dataset for {}",
                dataset_file.name()
            )));
        }
        for (i, data_type) in types.iter().enumerate() {
            if types[..i].contains(data_type) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate dataset types found on {}",
                    dataset_file.name()
                )));
            }
        }

        Ok(types)
    }

    /// Desired dataset group for the file (or for `dataset_group_name` when
    /// one group's file feeds several groups)
    pub fn dataset_group(
        &self,
        dataset_file: &DatasetFile,
        dataset_group_name: Option<&str>,
    ) -> Result<DatasetGroupParams, ConfigError> {
        let name = dataset_group_name.unwrap_or_else(|| dataset_file.prefix());
        let name =
            DatasetGroupName::new(name).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let domain = self.config_item(dataset_file, "DatasetGroup.Domain", dataset_group_name)?;
        let domain = parse_domain(&domain).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "invalid DatasetGroup.Domain specified for {}",
                dataset_file.prefix()
            ))
        })?;

        let dataset_domain = self.dataset_domain(dataset_file)?;
        if dataset_domain != domain {
            return Err(ConfigError::Invalid(format!(
                "The dataset group domain ({domain}) and dataset domain ({dataset_domain}) \
                 must match."
            )));
        }

        Ok(DatasetGroupParams {
            name,
            domain,
            user_tags: self.config_tags(dataset_file, "DatasetGroup", dataset_group_name)?,
        })
    }

    /// All dataset groups the file feeds: its own group plus every group
    /// whose `Datasets` refer to it via `From`
    pub fn dataset_groups(
        &self,
        dataset_file: &DatasetFile,
    ) -> Result<Vec<DatasetGroupParams>, ConfigError> {
        let names = self.dependent_dataset_groups(dataset_file);
        tracing::info!(
            dependents = %names.join(", "),
            source = %dataset_file.prefix(),
            "resolved dependent dataset groups",
        );
        names
            .iter()
            .map(|name| self.dataset_group(dataset_file, Some(name)))
            .collect()
    }

    /// Names of every group that uses this file's datasets, the file's own
    /// group first
    pub fn dependent_dataset_groups(&self, dataset_file: &DatasetFile) -> Vec<String> {
        let own = dataset_file.prefix();
        let mut names = vec![own.to_string()];

        for (key, section) in &self.config {
            let from = section
                .get("Datasets")
                .and_then(|ds| ds.get("From"))
                .and_then(Value::as_str);
            if from == Some(own) {
                names.push(key.clone());
            }
        }

        names
    }

    /// Desired import job for the file as uploaded
    pub fn dataset_import_job(
        &self,
        dataset_file: &DatasetFile,
        scope: &ServiceScope,
    ) -> Result<ImportJobParams, ConfigError> {
        let dataset = self.dataset(dataset_file)?;

        Ok(ImportJobParams {
            dataset_file: dataset_file.clone(),
            dataset_arn: scope.dataset_arn(&dataset.name),
            timestamp_format: self.data_timestamp_format(dataset_file)?,
            geolocation_format: self.data_geolocation_format(dataset_file)?,
            time_zone: self.data_time_zone(dataset_file)?,
            use_geolocation_for_time_zone: self.use_geolocation_for_time_zone(dataset_file)?,
            user_tags: self.config_tags(dataset_file, "Dataset", None)?,
        })
    }

    /// Desired predictor for the group. An `AutoPredictor` section wins over
    /// a legacy `Predictor` section when both are configured.
    pub fn predictor(
        &self,
        dataset_file: &DatasetFile,
        dataset_group_name: &str,
    ) -> Result<PredictorParams, ConfigError> {
        let scope = Some(dataset_group_name);
        let auto_config = self.config_item_opt(dataset_file, "AutoPredictor", scope)?;
        let legacy_config = self.config_item_opt(dataset_file, "Predictor", scope)?;

        let (auto, config, tags_for) = if let Some(config) = auto_config {
            (true, config, "AutoPredictor")
        } else if let Some(config) = legacy_config {
            (false, config, "Predictor")
        } else {
            return Err(ConfigError::Invalid(
                "a Predictor or AutoPredictor configuration must be present".to_string(),
            ));
        };

        let Value::Object(mut config) = config else {
            return Err(ConfigError::Invalid(format!(
                "{tags_for} configuration must be a mapping"
            )));
        };

        let max_age = match config.remove("MaxAge") {
            None => Duration::seconds(DEFAULT_PREDICTOR_MAX_AGE_SECONDS),
            Some(value) => Duration::seconds(value.as_i64().ok_or_else(|| {
                ConfigError::Invalid(format!("{tags_for} MaxAge must be a number of seconds"))
            })?),
        };
        // tags are applied through the tagging API, not the create call
        config.remove("Tags");

        Ok(PredictorParams {
            dataset_group: self.dataset_group(dataset_file, Some(dataset_group_name))?,
            auto,
            max_age,
            config,
            user_tags: self.config_tags(dataset_file, tags_for, scope)?,
        })
    }

    /// Desired forecast for the group, generated from `predictor_arn`
    pub fn forecast(
        &self,
        dataset_file: &DatasetFile,
        dataset_group_name: &str,
        predictor_arn: &str,
    ) -> Result<ForecastParams, ConfigError> {
        let scope = Some(dataset_group_name);
        let config = self.config_item(dataset_file, "Forecast", scope)?;
        let Value::Object(mut config) = config else {
            return Err(ConfigError::Invalid(
                "Forecast configuration must be a mapping".to_string(),
            ));
        };
        config.remove("Tags");

        Ok(ForecastParams {
            dataset_group: self.dataset_group(dataset_file, Some(dataset_group_name))?,
            predictor_arn: predictor_arn.to_string(),
            config,
            user_tags: self.config_tags(dataset_file, "Forecast", scope)?,
        })
    }

    /// Global and resource-scoped user tags for one resource section
    pub fn config_tags(
        &self,
        dataset_file: &DatasetFile,
        resource_path: &str,
        scope: Option<&str>,
    ) -> Result<UserTags, ConfigError> {
        let global =
            self.config_item_or(dataset_file, "Tags", scope, Value::Array(vec![]))?;
        let resource = self.config_item_or(
            dataset_file,
            &format!("{resource_path}.Tags"),
            scope,
            Value::Array(vec![]),
        )?;

        Ok(UserTags {
            resource_tags: parse_tag_specs(&resource)?,
            global_tags: parse_tag_specs(&global)?,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn navigate(value: &Value, segment: &str) -> Value {
    value.get(segment).cloned().unwrap_or(Value::Null)
}

/// Mirrors the document format's notion of "no value here": explicit null,
/// empty collection, empty string, or false all fall through to defaults
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
        Value::Number(_) => false,
    }
}

fn parse_domain(value: &Value) -> Option<DatasetDomain> {
    value.as_str().and_then(|s| s.parse().ok())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Validation
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const DATASET_GROUP_FIELDS: &[&str] = &["Domain", "Tags"];

const DATASET_FIELDS: &[&str] = &[
    "DatasetType",
    "Domain",
    "Schema",
    "DataFrequency",
    "Tags",
    // import-time settings carried alongside the dataset definition
    "TimestampFormat",
    "GeolocationFormat",
    "TimeZone",
    "UseGeolocationForTimeZone",
];

const PREDICTOR_FIELDS: &[&str] = &[
    "AlgorithmArn",
    "AutoMLOverrideStrategy",
    "EncryptionConfig",
    "EvaluationParameters",
    "FeaturizationConfig",
    "ForecastHorizon",
    "ForecastTypes",
    "HPOConfig",
    "InputDataConfig",
    "MaxAge",
    "OptimizationMetric",
    "PerformAutoML",
    "PerformHPO",
    "Tags",
    "TrainingParameters",
];

const AUTO_PREDICTOR_FIELDS: &[&str] = &[
    "DataConfig",
    "EncryptionConfig",
    "ExplainPredictor",
    "ForecastDimensions",
    "ForecastFrequency",
    "ForecastHorizon",
    "ForecastTypes",
    "MaxAge",
    "MonitorConfig",
    "OptimizationMetric",
    "ReferencePredictorArn",
    "Tags",
    "TimeAlignmentBoundary",
];

const FORECAST_FIELDS: &[&str] = &["ForecastTypes", "Tags", "TimeSeriesSelector"];

impl ConfigResolver {
    /// Non-mutating structural pass over the whole document. Returns every
    /// problem found rather than stopping at the first, so a user can fix
    /// their configuration in one round.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, section) in &self.config {
            if key == TESTING_KEY {
                continue;
            }
            let Value::Object(section) = section else {
                errors.push(format!(
                    "configuration file top level key {key} must be a mapping"
                ));
                continue;
            };
            self.validate_section(key, section, &mut errors);
        }

        errors
    }

    fn validate_section(&self, key: &str, section: &Map<String, Value>, errors: &mut Vec<String>) {
        for required in ["DatasetGroup", "Datasets", "Forecast"] {
            if !section.contains_key(required) {
                errors.push(format!(
                    "configuration for {key} is missing required resource {required}"
                ));
            }
        }
        if !section.contains_key("Predictor") && !section.contains_key("AutoPredictor") {
            errors.push(format!(
                "configuration for {key} is missing one of Predictor or AutoPredictor"
            ));
        }

        for (resource, config) in section {
            match resource.as_str() {
                "DatasetGroup" => {
                    self.validate_dataset_group(key, resource, config, errors);
                }
                "Datasets" => self.validate_datasets(key, resource, config, errors),
                "Predictor" => self.validate_mapping_fields(
                    key,
                    resource,
                    config,
                    PREDICTOR_FIELDS,
                    &["ForecastHorizon"],
                    errors,
                ),
                "AutoPredictor" => self.validate_mapping_fields(
                    key,
                    resource,
                    config,
                    AUTO_PREDICTOR_FIELDS,
                    &["ForecastHorizon"],
                    errors,
                ),
                "Forecast" => self.validate_mapping_fields(
                    key,
                    resource,
                    config,
                    FORECAST_FIELDS,
                    &[],
                    errors,
                ),
                "Tags" => self.validate_tags(key, resource, config, errors),
                _ => errors.push(format!(
                    "{key} resource {resource} is not supported (must be one of 'DatasetGroup', \
                     'Datasets', 'Predictor', 'AutoPredictor', 'Forecast', 'Tags')"
                )),
            }
        }
    }

    fn validate_dataset_group(
        &self,
        key: &str,
        resource: &str,
        config: &Value,
        errors: &mut Vec<String>,
    ) {
        let Value::Object(config) = config else {
            errors.push(format!(
                "configuration issue for {key}.{resource}: must be a mapping"
            ));
            return;
        };
        for field in config.keys() {
            if !DATASET_GROUP_FIELDS.contains(&field.as_str()) {
                errors.push(format!(
                    "configuration issue for {key}.{resource}: unknown field {field}"
                ));
            }
        }
        match config.get("Domain") {
            None => errors.push(format!(
                "configuration issue for {key}.{resource}: Domain is required"
            )),
            Some(domain) => {
                if parse_domain(domain).is_none() {
                    errors.push(format!(
                        "configuration issue for {key}.{resource}: invalid Domain"
                    ));
                }
            }
        }
        if let Some(tags) = config.get("Tags") {
            self.validate_tags(key, resource, tags, errors);
        }
    }

    fn validate_datasets(
        &self,
        key: &str,
        resource: &str,
        config: &Value,
        errors: &mut Vec<String>,
    ) {
        let datasets = match config {
            Value::Object(reference) => {
                let from = reference.get("From").and_then(Value::as_str);
                let referenced = from.and_then(|from| {
                    self.config
                        .get(from)
                        .and_then(|section| section.get("Datasets"))
                        .and_then(Value::as_array)
                });
                match referenced {
                    Some(datasets) if !datasets.is_empty() => datasets.clone(),
                    _ => {
                        errors.push(format!(
                            "Datasets for {key} references {} but no config found for datasets \
                             in that group",
                            from.unwrap_or("nothing")
                        ));
                        return;
                    }
                }
            }
            Value::Array(datasets) => datasets.clone(),
            _ => {
                errors.push(format!(
                    "Datasets for {key} must be a list or a mapping containing the \"From\" key"
                ));
                return;
            }
        };

        for dataset in &datasets {
            let Value::Object(dataset) = dataset else {
                errors.push(format!(
                    "configuration issue for {key}.{resource}: each dataset must be a mapping"
                ));
                continue;
            };
            for field in dataset.keys() {
                if !DATASET_FIELDS.contains(&field.as_str()) {
                    errors.push(format!(
                        "configuration issue for {key}.{resource}: unknown field {field}"
                    ));
                }
            }
            let data_type = dataset
                .get("DatasetType")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<DatasetType>().ok());
            if data_type.is_none() {
                errors.push(format!(
                    "configuration issue for {key}.{resource}: each dataset needs a valid \
                     DatasetType"
                ));
            }
            if dataset.get("Domain").is_none_or(|d| parse_domain(d).is_none()) {
                errors.push(format!(
                    "configuration issue for {key}.{resource}: each dataset needs a valid Domain"
                ));
            }
            let attributes = dataset
                .get("Schema")
                .and_then(|schema| schema.get("Attributes"))
                .and_then(Value::as_array);
            if attributes.is_none_or(Vec::is_empty) {
                errors.push(format!(
                    "configuration issue for {key}.{resource}: each dataset needs a Schema with \
                     a list of Attributes"
                ));
            }
            if let Some(frequency) = dataset.get("DataFrequency") {
                let valid = frequency
                    .as_str()
                    .is_some_and(|s| DataFrequency::new(s).is_ok());
                if !valid {
                    errors.push(format!(
                        "configuration issue for {key}.{resource}: invalid DataFrequency"
                    ));
                }
            }
            if let Some(tags) = dataset.get("Tags") {
                self.validate_tags(key, resource, tags, errors);
            }
        }
    }

    fn validate_mapping_fields(
        &self,
        key: &str,
        resource: &str,
        config: &Value,
        known_fields: &[&str],
        required_fields: &[&str],
        errors: &mut Vec<String>,
    ) {
        let Value::Object(config) = config else {
            errors.push(format!(
                "configuration issue for {key}.{resource}: must be a mapping"
            ));
            return;
        };
        for field in config.keys() {
            if !known_fields.contains(&field.as_str()) {
                errors.push(format!(
                    "configuration issue for {key}.{resource}: unknown field {field}"
                ));
            }
        }
        for field in required_fields {
            if !config.contains_key(*field) {
                errors.push(format!(
                    "configuration issue for {key}.{resource}: {field} is required"
                ));
            }
        }
        if let Some(tags) = config.get("Tags") {
            self.validate_tags(key, resource, tags, errors);
        }
    }

    fn validate_tags(&self, key: &str, resource: &str, config: &Value, errors: &mut Vec<String>) {
        if let Err(e) = parse_tag_specs(config) {
            errors.push(format!("configuration issue for {key}.{resource}: {e}"));
        }
    }
}
