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

/// Forecasting domain shared by all datasets of a dataset group
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetDomain {
    Retail,
    Custom,
    InventoryPlanning,
    Ec2Capacity,
    WorkForce,
    WebTraffic,
    Metrics,
}

impl std::fmt::Display for DatasetDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DatasetDomain::Retail => "RETAIL",
            DatasetDomain::Custom => "CUSTOM",
            DatasetDomain::InventoryPlanning => "INVENTORY_PLANNING",
            DatasetDomain::Ec2Capacity => "EC2_CAPACITY",
            DatasetDomain::WorkForce => "WORK_FORCE",
            DatasetDomain::WebTraffic => "WEB_TRAFFIC",
            DatasetDomain::Metrics => "METRICS",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
#[error("'{0}' is not a valid dataset domain")]
pub struct DatasetDomainParseError(pub String);

impl std::str::FromStr for DatasetDomain {
    type Err = DatasetDomainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RETAIL" => Ok(DatasetDomain::Retail),
            "CUSTOM" => Ok(DatasetDomain::Custom),
            "INVENTORY_PLANNING" => Ok(DatasetDomain::InventoryPlanning),
            "EC2_CAPACITY" => Ok(DatasetDomain::Ec2Capacity),
            "WORK_FORCE" => Ok(DatasetDomain::WorkForce),
            "WEB_TRAFFIC" => Ok(DatasetDomain::WebTraffic),
            "METRICS" => Ok(DatasetDomain::Metrics),
            _ => Err(DatasetDomainParseError(s.to_string())),
        }
    }
}
