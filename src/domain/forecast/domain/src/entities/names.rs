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

const MAX_NAME_LEN: usize = 63;

static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]{0,62}$").unwrap());

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

macro_rules! declare_name_type {
    ($typ:ident, $err:ident, $what:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $typ(String);

        impl $typ {
            pub fn new(name: impl Into<String>) -> Result<Self, $err> {
                let name = name.into();
                if name.len() > MAX_NAME_LEN || !VALID_NAME.is_match(&name) {
                    return Err($err(name));
                }
                Ok(Self(name))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $typ {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $typ {
            type Error = $err;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$typ> for String {
            fn from(value: $typ) -> Self {
                value.0
            }
        }

        #[derive(Error, Debug)]
        #[error(
            "{what} ({name}) must start with a letter, contain only letters, digits and \
             underscores, and be at most 63 characters long",
            what = $what,
            name = .0
        )]
        pub struct $err(pub String);
    };
}

declare_name_type!(DatasetName, InvalidDatasetName, "dataset name");
declare_name_type!(
    DatasetGroupName,
    InvalidDatasetGroupName,
    "dataset group name"
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
