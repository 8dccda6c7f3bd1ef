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

//! Logship Destinations - Object Storage Outputs
//!
//! This crate provides the S3 output for Logship: configuration parsing,
//! credential resolution, object key generation, compression, uploads, and the
//! plugin context the host runtime talks to.
//!
//! # Features
//!
//! - `s3` - AWS S3 and S3-compatible storage (default)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use logship_destinations::plugin::PluginContext;
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut context = PluginContext::new();
//!
//!     let params: HashMap<String, String> = [
//!         ("Bucket", "my-logs"),
//!         ("S3Prefix", "fluent-bit"),
//!         ("Region", "us-east-1"),
//!         ("Compress", "gzip"),
//!     ]
//!     .into_iter()
//!     .map(|(k, v)| (k.to_string(), v.to_string()))
//!     .collect();
//!
//!     let id = context.init(&params).await?;
//!     // host: context.flush(id, &mut records).await
//!     Ok(())
//! }
//! ```

#[cfg(feature = "s3")]
pub mod s3;

#[cfg(feature = "s3")]
pub mod plugin;
