// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

// coarse to fine
const FREQUENCIES: [&str; 10] = ["Y", "M", "W", "D", "H", "30min", "15min", "10min", "5min", "1min"];

static VALID_FREQUENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Y|M|W|D|H|30min|15min|10min|5min|1min)$").unwrap());

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Sampling frequency of time series data, ordered coarse to fine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataFrequency(String);

impl DataFrequency {
    pub fn new(frequency: impl Into<String>) -> Result<Self, InvalidDataFrequency> {
        let frequency = frequency.into();
        if !VALID_FREQUENCY.is_match(&frequency) {
            return Err(InvalidDataFrequency(frequency));
        }
        Ok(Self(frequency))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn rank(&self) -> usize {
        FREQUENCIES
            .iter()
            .position(|f| *f == self.0)
            .expect("constructed from a validated frequency")
    }
}

impl PartialOrd for DataFrequency {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataFrequency {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for DataFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DataFrequency {
    type Error = InvalidDataFrequency;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DataFrequency> for String {
    fn from(value: DataFrequency) -> Self {
        value.0
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
#[error("invalid data frequency '{0}': must be one of Y, M, W, D, H, 30min, 15min, 10min, 5min, 1min")]
pub struct InvalidDataFrequency(pub String);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
