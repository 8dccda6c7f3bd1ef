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

//! S3 output for newline-delimited JSON log batches.
//!
//! # Features
//!
//! - **Compression**: none or gzip
//! - **Time bucketing**: strftime directory pattern evaluated in a configurable time zone
//! - **Content-hash suffix**: optional SHA-256 of the payload in the object name
//! - **Credentials**: shared credentials file, static keys, or the ambient provider chain
//! - **S3-compatible storage**: MinIO, LocalStack and friends through `Endpoint`
//!
//! Objects are written to `<prefix>/<time-bucket>/<timestamp>[-<hash>].log[.gz]`.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use logship_destinations::s3::{AwsStoreFactory, Compression, S3Config, S3Operator};
//!
//! let config = S3Config::builder()
//!     .bucket("my-logs")
//!     .prefix("fluent-bit")
//!     .region("eu-west-1")
//!     .compression(Compression::Gzip)
//!     .build()?;
//!
//! let credentials = config.credentials.resolve().await?;
//! let store = AwsStoreFactory.build(&config, &credentials).await?;
//! let operator = S3Operator::new(0, config, credentials, store).await?;
//! ```

mod client;
pub mod compression;
pub mod config;
pub mod credentials;
pub mod key_gen;
mod operator;
pub mod store;

pub use client::{AwsObjectStore, AwsStoreFactory};
pub use compression::{compress, decompress_gzip};
pub use config::{
    Compression, ConfigSource, S3Config, S3ConfigBuilder, S3ConfigError, SuffixAlgorithm,
    TimeZoneSetting,
};
pub use credentials::{CredentialError, CredentialSource, ResolvedCredentials};
pub use key_gen::KeyGenerator;
pub use operator::{location_constraint, S3Operator};
pub use store::{
    BucketError, MemoryObjectStore, MemoryStoreFactory, ObjectStore, PutObjectRequest,
    StoreFactory, StoredObject,
};
