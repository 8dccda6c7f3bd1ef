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

//! Object storage capability.
//!
//! The operator only needs two things from a store: put an object, and create
//! a bucket. [`ObjectStore`] captures exactly that, and [`StoreFactory`]
//! builds a store for a configuration and its resolved credentials.
//!
//! [`MemoryObjectStore`] keeps everything in memory and can simulate
//! failures; it backs the plugin tests and local experiments.

use crate::s3::config::S3Config;
use crate::s3::credentials::ResolvedCredentials;
use async_trait::async_trait;
use logship_core::output::OutputError;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// One object write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectRequest {
    /// Target bucket
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Object bytes (already compressed if configured)
    pub body: Vec<u8>,
    /// MIME type
    pub content_type: String,
    /// `Content-Encoding` header, if any
    pub content_encoding: Option<String>,
}

/// Errors from bucket creation.
#[derive(Error, Debug)]
pub enum BucketError {
    /// The bucket already exists (owned by someone else or not).
    #[error("bucket {0} already exists")]
    AlreadyExists(String),

    /// The bucket already exists and belongs to the caller.
    #[error("bucket {0} is already owned by you")]
    AlreadyOwnedByYou(String),

    /// Any other failure.
    #[error(transparent)]
    Other(#[from] OutputError),
}

impl BucketError {
    /// Whether the bucket is usable despite the error.
    #[must_use]
    pub const fn is_idempotent_success(&self) -> bool {
        matches!(self, Self::AlreadyExists(_) | Self::AlreadyOwnedByYou(_))
    }
}

/// Minimal object storage operations used by the S3 output.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Writes one object. A single attempt; callers do not expect retries.
    ///
    /// # Errors
    ///
    /// Returns an [`OutputError`] classifying the failure.
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), OutputError>;

    /// Creates a bucket in `region`.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::AlreadyExists`] / [`BucketError::AlreadyOwnedByYou`]
    /// when the bucket is already there, [`BucketError::Other`] otherwise.
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), BucketError>;
}

/// Builds an [`ObjectStore`] for one operator.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Builds a store bound to the configuration's region/endpoint and credentials.
    ///
    /// # Errors
    ///
    /// Returns an [`OutputError`] if the client cannot be constructed.
    async fn build(
        &self,
        config: &S3Config,
        credentials: &ResolvedCredentials,
    ) -> Result<Arc<dyn ObjectStore>, OutputError>;
}

/// An object held by [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Bucket the object was written to
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Stored bytes
    pub body: Vec<u8>,
    /// MIME type
    pub content_type: String,
    /// `Content-Encoding` header, if any
    pub content_encoding: Option<String>,
}

/// In-memory [`ObjectStore`].
///
/// Clones share state, so a test can keep one handle while the operator
/// writes through another.
///
/// # Example
///
/// ```rust
/// use logship_destinations::s3::{MemoryObjectStore, ObjectStore, PutObjectRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryObjectStore::new();
/// store
///     .put_object(PutObjectRequest {
///         bucket: "logs".into(),
///         key: "a.log".into(),
///         body: b"{}\n".to_vec(),
///         content_type: "application/x-ndjson".into(),
///         content_encoding: None,
///     })
///     .await?;
///
/// assert_eq!(store.objects().await.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<(String, String), StoredObject>>>,
    buckets: Arc<RwLock<BTreeSet<String>>>,
    fail_puts: Arc<AtomicBool>,
    fail_bucket_creation: Arc<AtomicBool>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        debug!("Creating new in-memory object store");
        Self::default()
    }

    /// Makes every subsequent `put_object` fail (or succeed again).
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `create_bucket` fail with a non-idempotent error.
    pub fn set_fail_bucket_creation(&self, fail: bool) {
        self.fail_bucket_creation.store(fail, Ordering::SeqCst);
    }

    /// All stored objects, ordered by key.
    pub async fn objects(&self) -> Vec<StoredObject> {
        let mut objects: Vec<_> = self.objects.read().await.values().cloned().collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        objects
    }

    /// Looks up one object.
    pub async fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Buckets created so far.
    pub async fn buckets(&self) -> Vec<String> {
        self.buckets.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), OutputError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(OutputError::upload_msg("simulated put failure", true));
        }

        trace!(bucket = %request.bucket, key = %request.key, "Storing object in memory");

        let object = StoredObject {
            bucket: request.bucket,
            key: request.key,
            body: request.body,
            content_type: request.content_type,
            content_encoding: request.content_encoding,
        };

        self.objects
            .write()
            .await
            .insert((object.bucket.clone(), object.key.clone()), object);
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str, _region: &str) -> Result<(), BucketError> {
        if self.fail_bucket_creation.load(Ordering::SeqCst) {
            return Err(OutputError::upload_msg("simulated bucket failure", false).into());
        }

        if !self.buckets.write().await.insert(bucket.to_string()) {
            return Err(BucketError::AlreadyOwnedByYou(bucket.to_string()));
        }
        Ok(())
    }
}

/// [`StoreFactory`] that hands out clones of one [`MemoryObjectStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreFactory {
    store: MemoryObjectStore,
}

impl MemoryStoreFactory {
    /// Creates a factory around `store`.
    #[must_use]
    pub const fn new(store: MemoryObjectStore) -> Self {
        Self { store }
    }

    /// The shared store.
    #[must_use]
    pub const fn store(&self) -> &MemoryObjectStore {
        &self.store
    }
}

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    async fn build(
        &self,
        _config: &S3Config,
        _credentials: &ResolvedCredentials,
    ) -> Result<Arc<dyn ObjectStore>, OutputError> {
        Ok(Arc::new(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(key: &str) -> PutObjectRequest {
        PutObjectRequest {
            bucket: "bucket".to_string(),
            key: key.to_string(),
            body: b"{}\n".to_vec(),
            content_type: "application/x-ndjson".to_string(),
            content_encoding: None,
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryObjectStore::new();
        store.put_object(request("a.log")).await.unwrap();

        let object = store.get("bucket", "a.log").await.unwrap();
        assert_eq!(object.body, b"{}\n".to_vec());
        assert!(store.get("bucket", "b.log").await.is_none());
    }

    #[tokio::test]
    async fn test_same_key_overwrites() {
        let store = MemoryObjectStore::new();
        store.put_object(request("a.log")).await.unwrap();
        store.put_object(request("a.log")).await.unwrap();

        assert_eq!(store.objects().await.len(), 1);
    }

    #[tokio::test]
    async fn test_simulated_put_failure() {
        let store = MemoryObjectStore::new();
        store.set_fail_puts(true);

        let err = store.put_object(request("a.log")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.objects().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_bucket_twice() {
        let store = MemoryObjectStore::new();
        store.create_bucket("logs", "eu-west-1").await.unwrap();

        let err = store.create_bucket("logs", "eu-west-1").await.unwrap_err();
        assert!(err.is_idempotent_success());
        assert_eq!(store.buckets().await, vec!["logs".to_string()]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryObjectStore::new();
        let factory = MemoryStoreFactory::new(store.clone());

        factory.store().put_object(request("a.log")).await.unwrap();
        assert_eq!(store.objects().await.len(), 1);
    }
}
