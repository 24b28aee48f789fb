// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Lifecycle state of a remote forecasting resource, as reported by the
/// service. Absence of a resource is not a `Status` - probes report it via
/// [`ResourceState::Missing`] instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Active,
    CreatePending,
    CreateInProgress,
    CreateFailed,
    UpdatePending,
    UpdateInProgress,
    UpdateFailed,
    DeletePending,
    DeleteInProgress,
    DeleteFailed,
}

impl Status {
    /// Creation, update, or deletion of the resource has failed
    pub fn failed(self) -> bool {
        matches!(
            self,
            Status::CreateFailed | Status::UpdateFailed | Status::DeleteFailed
        )
    }

    /// The resource is being mutated and will settle into a terminal state
    pub fn updating(self) -> bool {
        matches!(
            self,
            Status::CreatePending
                | Status::CreateInProgress
                | Status::UpdatePending
                | Status::UpdateInProgress
                | Status::DeletePending
                | Status::DeleteInProgress
        )
    }

    /// No work is outstanding on the resource
    pub fn finalized(self) -> bool {
        matches!(self, Status::Active)
    }

    pub fn all() -> [Status; 10] {
        [
            Status::Active,
            Status::CreatePending,
            Status::CreateInProgress,
            Status::CreateFailed,
            Status::UpdatePending,
            Status::UpdateInProgress,
            Status::UpdateFailed,
            Status::DeletePending,
            Status::DeleteInProgress,
            Status::DeleteFailed,
        ]
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Active => "ACTIVE",
            Status::CreatePending => "CREATE_PENDING",
            Status::CreateInProgress => "CREATE_IN_PROGRESS",
            Status::CreateFailed => "CREATE_FAILED",
            Status::UpdatePending => "UPDATE_PENDING",
            Status::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Status::UpdateFailed => "UPDATE_FAILED",
            Status::DeletePending => "DELETE_PENDING",
            Status::DeleteInProgress => "DELETE_IN_PROGRESS",
            Status::DeleteFailed => "DELETE_FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
#[error("'{0}' is not a known resource status")]
pub struct StatusParseError(pub String);

impl std::str::FromStr for Status {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // the service reports statuses in a couple of casings depending on
        // the API ("ACTIVE" in describe output, "Active" in list filters)
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Status::Active),
            "CREATE_PENDING" => Ok(Status::CreatePending),
            "CREATE_IN_PROGRESS" => Ok(Status::CreateInProgress),
            "CREATE_FAILED" => Ok(Status::CreateFailed),
            "UPDATE_PENDING" => Ok(Status::UpdatePending),
            "UPDATE_IN_PROGRESS" => Ok(Status::UpdateInProgress),
            "UPDATE_FAILED" => Ok(Status::UpdateFailed),
            "DELETE_PENDING" => Ok(Status::DeletePending),
            "DELETE_IN_PROGRESS" => Ok(Status::DeleteInProgress),
            "DELETE_FAILED" => Ok(Status::DeleteFailed),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// What a status probe found out about a remote resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// The resource does not exist and should be created
    Missing,
    /// The resource exists but its inputs have changed; it should be
    /// recreated as if it did not exist
    Stale { reason: String },
    /// The resource exists; its reported lifecycle state
    Exists(Status),
}

impl ResourceState {
    pub fn needs_creation(&self) -> bool {
        matches!(self, ResourceState::Missing | ResourceState::Stale { .. })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Outcome of the predictor-specific status assessment. Ordering signals
/// that the original raised as exceptions are explicit variants here so
/// that callers can pattern-match instead of catching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictorAssessment {
    /// A file newer than the one that triggered this invocation has been
    /// uploaded - the newer invocation owns predictor regeneration
    Superseded {
        triggered_by: String,
        latest: Option<String>,
    },
    /// One or more datasets of the group have no active import yet
    DatasetsImporting { details: String },
    /// No usable past predictor - training is required
    Missing,
    /// A predictor exists but is older than the max-age window while newer
    /// data is available - retraining is required
    Stale,
    /// The predictor exists; its reported lifecycle state
    Exists(Status),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
