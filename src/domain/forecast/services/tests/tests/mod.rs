// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod harness;
mod test_config_resolver;
mod test_dataset_reconciler;
mod test_import_job_reconciler;
mod test_steps;
