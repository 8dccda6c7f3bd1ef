// Copyright 2025 Logship Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Logging set-up during `init`.
//!
//! Kept in its own test binary: the global subscriber can only be installed
//! once per process.

#![cfg(feature = "s3")]

use logship_destinations::plugin::{InitError, PluginContext};
use logship_destinations::s3::MemoryStoreFactory;
use std::collections::HashMap;

#[tokio::test]
async fn test_subscriber_installed_before_config_validation() {
    assert!(!tracing::dispatcher::has_been_set());

    let mut context = PluginContext::with_factory(MemoryStoreFactory::default());
    let params: HashMap<String, String> = [
        ("Bucket", "logs"),
        ("S3Prefix", "app"),
        ("Region", "us-east-1"),
        ("TimeZone", "Nowhere/Special"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let err = context.init(&params).await.unwrap_err();

    assert!(matches!(err, InitError::Config(_)));
    assert!(tracing::dispatcher::has_been_set());
    assert!(context.is_empty());
}
