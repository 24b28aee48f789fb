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

static VALID_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:yyyy-MM-dd|yyyy-MM-dd HH:mm:ss)$").unwrap());

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Timestamp format declared for time series data imports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimestampFormat(String);

impl TimestampFormat {
    pub fn new(format: impl Into<String>) -> Result<Self, InvalidTimestampFormat> {
        let format = format.into();
        if !VALID_FORMAT.is_match(&format) {
            return Err(InvalidTimestampFormat(format));
        }
        Ok(Self(format))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TimestampFormat {
    type Error = InvalidTimestampFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TimestampFormat> for String {
    fn from(value: TimestampFormat) -> Self {
        value.0
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
#[error("invalid timestamp format '{0}': must be 'yyyy-MM-dd' or 'yyyy-MM-dd HH:mm:ss'")]
pub struct InvalidTimestampFormat(pub String);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
