// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dill::{component, interface};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Abstracts the system time source so that time-dependent logic (e.g. the
/// predictor max-age window) can be tested deterministically
pub trait SystemTimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Timestamp formatted the way generated resource names embed it
/// (e.g. `2024_01_15_10_30_00`)
pub fn format_resource_suffix(t: &DateTime<Utc>) -> String {
    t.format("%Y_%m_%d_%H_%M_%S").to_string()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[component(pub)]
#[interface(dyn SystemTimeSource)]
pub struct SystemTimeSourceDefault;

impl SystemTimeSource for SystemTimeSourceDefault {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A time source pinned to a settable instant, for tests
pub struct SystemTimeSourceStub {
    t: Mutex<DateTime<Utc>>,
}

impl SystemTimeSourceStub {
    pub fn new(t: DateTime<Utc>) -> Self {
        Self { t: Mutex::new(t) }
    }

    pub fn set(&self, t: DateTime<Utc>) {
        *self.t.lock().unwrap() = t;
    }

    pub fn advance(&self, d: chrono::Duration) {
        let mut t = self.t.lock().unwrap();
        *t += d;
    }
}

impl SystemTimeSource for SystemTimeSourceStub {
    fn now(&self) -> DateTime<Utc> {
        *self.t.lock().unwrap()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
