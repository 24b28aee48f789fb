// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod data_frequency;
mod dataset_domain;
mod dataset_file;
mod dataset_type;
mod names;
mod resource_params;
mod status;
mod tags;
mod timestamp_format;

pub use data_frequency::*;
pub use dataset_domain::*;
pub use dataset_file::*;
pub use dataset_type::*;
pub use names::*;
pub use resource_params::*;
pub use status::*;
pub use tags::*;
pub use timestamp_format::*;
