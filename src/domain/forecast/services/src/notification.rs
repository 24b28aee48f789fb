// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use nimbus_forecast::DatasetFile;
use serde::Deserialize;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Terminal event of a reconciliation run, successful or not, as handed
/// over by the orchestrator
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionEvent {
    pub bucket: String,
    pub dataset_file: String,
    #[serde(default)]
    pub dataset_group_name: Option<String>,
    #[serde(default, rename = "statesError")]
    pub states_error: Option<ErrorInfo>,
    #[serde(default, rename = "serviceError")]
    pub service_error: Option<ErrorInfo>,
}

/// The orchestrator reports errors with a type name and an opaque cause
/// string that usually (but not always) contains JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    #[serde(default, rename = "Error")]
    pub error: Option<String>,
    #[serde(default, rename = "Cause")]
    pub cause: Option<String>,
}

impl CompletionEvent {
    pub fn succeeded(&self) -> bool {
        self.states_error.is_none() && self.service_error.is_none()
    }

    fn forecast_for(&self) -> String {
        match &self.dataset_group_name {
            Some(name) => name.clone(),
            None => DatasetFile::new("", &self.dataset_file).prefix().to_string(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// What the error cause JSON looks like when a step produced it
#[derive(Debug, Default, Deserialize)]
struct ErrorCause {
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(default, rename = "stackTrace")]
    stack_trace: Option<Vec<String>>,
}

/// Build the human-readable notification message for a completed run.
///
/// Errors are unwrapped best-effort: the cause is parsed as JSON when
/// possible and the deepest message is surfaced; a run interrupted only
/// because datasets are still importing is reported as a routine update
/// rather than a failure.
pub fn build_message(event: &CompletionEvent) -> String {
    let forecast_for = event.forecast_for();

    let (mut message, error) = match (&event.states_error, &event.service_error) {
        (None, None) => return format!("Forecast for {forecast_for} is ready!"),
        (Some(error), _) => (
            format!("There was an error running the forecast for {forecast_for}\n\n"),
            error,
        ),
        (None, Some(error)) => (
            format!("There was a service error running the forecast for {forecast_for}\n\n"),
            error,
        ),
    };

    let error_type = error.error.as_deref().unwrap_or("Unknown");
    let cause: ErrorCause = error
        .cause
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();
    let error_message = cause
        .error_message
        .or_else(|| error.cause.clone())
        .unwrap_or_default();

    if error_type == "DatasetsImporting" {
        message = format!("Update for forecast {forecast_for}\n\n");
        message.push_str(&error_message);
    } else {
        message.push_str(&format!("Message: {error_message}\n\n"));
        message.push_str(&format!("Details: (caught {error_type})\n\n"));
        if let Some(stack_trace) = &cause.stack_trace {
            message.push_str(&stack_trace.join("\n"));
        }
    }

    message
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
