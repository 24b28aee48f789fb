// Copyright Nimbus Contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! S3 implementation of the object storage boundary used by the
//! reconciliation flow.

mod s3_object_storage;

pub use s3_object_storage::*;
