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

//! Per-instance S3 operator.

use crate::s3::compression::compress;
use crate::s3::config::S3Config;
use crate::s3::credentials::ResolvedCredentials;
use crate::s3::key_gen::KeyGenerator;
use crate::s3::store::{BucketError, ObjectStore, PutObjectRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logship_core::metrics;
use logship_core::output::{Output, OutputError, OutputMetadata};
use std::sync::Arc;
use tracing::{debug, info};

const OUTPUT_TYPE: &str = "s3";

/// Region where S3 rejects an explicit location constraint.
const DEFAULT_LOCATION: &str = "us-east-1";

/// Location constraint to send when creating a bucket in `region`.
///
/// `us-east-1` is the default location and must be sent without one.
#[must_use]
pub fn location_constraint(region: &str) -> Option<&str> {
    if region.is_empty() || region == DEFAULT_LOCATION {
        None
    } else {
        Some(region)
    }
}

/// State of one configured S3 output instance.
///
/// Holds the immutable configuration and the store client; every flush of
/// the instance goes through [`S3Operator::upload`].
#[derive(Debug)]
pub struct S3Operator {
    id: usize,
    config: S3Config,
    credentials: ResolvedCredentials,
    store: Arc<dyn ObjectStore>,
    key_generator: KeyGenerator,
}

impl S3Operator {
    /// Creates an operator, creating the bucket first when configured.
    ///
    /// # Errors
    ///
    /// Returns an [`OutputError`] if bucket creation fails for any reason
    /// other than the bucket already existing.
    pub async fn new(
        id: usize,
        config: S3Config,
        credentials: ResolvedCredentials,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, OutputError> {
        if config.auto_create_bucket {
            match store.create_bucket(&config.bucket, &config.region).await {
                Ok(()) => {}
                Err(e) if e.is_idempotent_success() => {
                    debug!("Bucket {} already exists: {}", config.bucket, e);
                }
                Err(BucketError::Other(e)) => return Err(e),
                Err(e) => return Err(OutputError::upload_msg(e.to_string(), false)),
            }
        }

        info!(
            operator_id = id,
            "S3 operator ready: bucket={}, prefix={}, region={}, compression={}, suffix={}, time_zone={}",
            config.bucket,
            config.prefix,
            config.region,
            config.compression.as_str(),
            config.suffix_algorithm.as_str(),
            config.time_zone.name()
        );

        Ok(Self {
            id,
            key_generator: KeyGenerator::from_config(&config),
            config,
            credentials,
            store,
        })
    }

    /// The configuration this operator was built from.
    #[must_use]
    pub const fn config(&self) -> &S3Config {
        &self.config
    }

    /// The credentials the store was built with.
    #[must_use]
    pub const fn credentials(&self) -> &ResolvedCredentials {
        &self.credentials
    }

    /// Keys, compresses and uploads one payload. Returns the object key.
    ///
    /// The key is derived from the uncompressed payload, so the content hash
    /// suffix does not depend on the gzip header.
    ///
    /// # Errors
    ///
    /// Returns an [`OutputError`] if compression or the upload fails.
    pub async fn upload(&self, payload: Vec<u8>, now: DateTime<Utc>) -> Result<String, OutputError> {
        let key = self.key_generator.generate_key(&now, &payload);
        let uncompressed_size = payload.len();

        let body = compress(payload, self.config.compression)?;
        let body_size = body.len();

        debug!(
            "Uploading to s3://{}/{} (size: {} bytes, compressed: {} bytes)",
            self.config.bucket, key, uncompressed_size, body_size
        );

        self.store
            .put_object(PutObjectRequest {
                bucket: self.config.bucket.clone(),
                key: key.clone(),
                body,
                content_type: self.config.compression.content_type().to_string(),
                content_encoding: None,
            })
            .await?;

        metrics::record_upload_bytes(body_size, OUTPUT_TYPE);

        Ok(key)
    }
}

#[async_trait]
impl Output for S3Operator {
    async fn write_payload(&self, payload: Vec<u8>, records: usize) -> Result<(), OutputError> {
        let key = self.upload(payload, Utc::now()).await?;
        info!(
            operator_id = self.id,
            "Successfully wrote {} records to s3://{}/{}",
            records, self.config.bucket, key
        );
        Ok(())
    }

    fn skip_empty_batches(&self) -> bool {
        self.config.skip_empty_batches
    }

    fn metadata(&self) -> OutputMetadata {
        OutputMetadata::new("AWS S3", OUTPUT_TYPE)
            .with_property("bucket", &self.config.bucket)
            .with_property("prefix", &self.config.prefix)
            .with_property("region", &self.config.region)
            .with_property("compression", self.config.compression.as_str())
            .with_property("suffix_algorithm", self.config.suffix_algorithm.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::compression::decompress_gzip;
    use crate::s3::config::{Compression, TimeZoneSetting};
    use crate::s3::store::MemoryObjectStore;
    use chrono::TimeZone;

    fn config() -> S3Config {
        S3Config::builder()
            .bucket("logs")
            .prefix("app")
            .region("eu-west-1")
            .time_zone(TimeZoneSetting::parse("UTC").unwrap())
            .build()
            .unwrap()
    }

    async fn operator(config: S3Config, store: &MemoryObjectStore) -> S3Operator {
        S3Operator::new(0, config, ResolvedCredentials::Ambient, Arc::new(store.clone()))
            .await
            .unwrap()
    }

    #[test]
    fn test_location_constraint() {
        assert_eq!(location_constraint("us-east-1"), None);
        assert_eq!(location_constraint(""), None);
        assert_eq!(location_constraint("eu-west-1"), Some("eu-west-1"));
        assert_eq!(location_constraint("ap-northeast-1"), Some("ap-northeast-1"));
    }

    #[tokio::test]
    async fn test_upload_plain() {
        let store = MemoryObjectStore::new();
        let op = operator(config(), &store).await;
        let now = Utc.with_ymd_and_hms(2019, 3, 10, 10, 11, 12).unwrap();

        let key = op.upload(b"{\"a\":1}\n".to_vec(), now).await.unwrap();

        assert_eq!(key, "app/20190310/10/20190310101112.log");
        let object = store.get("logs", &key).await.unwrap();
        assert_eq!(object.body, b"{\"a\":1}\n".to_vec());
        assert_eq!(object.content_type, "application/x-ndjson");
    }

    #[tokio::test]
    async fn test_upload_gzip() {
        let store = MemoryObjectStore::new();
        let mut config = config();
        config.compression = Compression::Gzip;
        let op = operator(config, &store).await;

        let key = op
            .upload(b"{\"a\":1}\n".to_vec(), Utc::now())
            .await
            .unwrap();

        assert!(key.ends_with(".log.gz"));
        let object = store.get("logs", &key).await.unwrap();
        assert_eq!(decompress_gzip(&object.body).unwrap(), b"{\"a\":1}\n".to_vec());
    }

    #[tokio::test]
    async fn test_auto_create_bucket() {
        let store = MemoryObjectStore::new();
        let mut config = config();
        config.auto_create_bucket = true;

        operator(config.clone(), &store).await;
        // Second operator on the same bucket sees "already owned" and succeeds.
        operator(config, &store).await;

        assert_eq!(store.buckets().await, vec!["logs".to_string()]);
    }

    #[tokio::test]
    async fn test_auto_create_bucket_failure() {
        let store = MemoryObjectStore::new();
        store.set_fail_bucket_creation(true);
        let mut config = config();
        config.auto_create_bucket = true;

        let result =
            S3Operator::new(0, config, ResolvedCredentials::Ambient, Arc::new(store)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_upload_failure_propagates() {
        let store = MemoryObjectStore::new();
        let op = operator(config(), &store).await;
        store.set_fail_puts(true);

        let err = op.write_payload(Vec::new(), 0).await.unwrap_err();
        assert_eq!(err.category(), "upload");
    }

    #[tokio::test]
    async fn test_metadata() {
        let store = MemoryObjectStore::new();
        let op = operator(config(), &store).await;

        let metadata = op.metadata();
        assert_eq!(metadata.output_type, "s3");
        assert_eq!(metadata.properties.get("bucket"), Some(&"logs".to_string()));
    }
}
