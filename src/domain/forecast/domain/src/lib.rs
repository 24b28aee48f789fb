// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Domain model of the forecast resource reconciliation engine: lifecycle
//! statuses, dataset/predictor/forecast value types, tag reconciliation,
//! and the traits bounding the remote forecasting service and blob storage.

mod entities;
mod services;

pub use entities::*;
pub use services::*;
