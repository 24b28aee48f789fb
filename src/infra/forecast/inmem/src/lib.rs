// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! In-memory fakes of the remote forecasting service and of blob storage.
//! Used by the service-layer tests to exercise full reconciliation flows
//! without the network.

mod inmem_forecast_api;
mod inmem_object_storage;

pub use inmem_forecast_api::*;
pub use inmem_object_storage::*;
