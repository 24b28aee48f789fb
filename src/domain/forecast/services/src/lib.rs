// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Service layer of the forecast resource reconciliation engine: resolves
//! the desired state of every resource from configuration and converges
//! the remote service towards it, one idempotent step at a time.

mod config_resolver;
mod notification;
mod reconcile;
mod steps;
mod tag_applier;

pub use config_resolver::*;
pub use notification::*;
pub use reconcile::*;
pub use steps::*;
pub use tag_applier::*;
