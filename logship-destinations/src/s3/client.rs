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

//! AWS SDK backed object store.

use crate::s3::config::S3Config;
use crate::s3::credentials::ResolvedCredentials;
use crate::s3::operator::location_constraint;
use crate::s3::store::{BucketError, ObjectStore, PutObjectRequest, StoreFactory};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use aws_sdk_s3::Client as S3Client;
use logship_core::output::OutputError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const OPERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Service error codes that usually clear on their own.
const TRANSIENT_CODES: &[&str] = &[
    "SlowDown",
    "ServiceUnavailable",
    "InternalError",
    "RequestTimeout",
];

/// Builds [`AwsObjectStore`]s with the AWS SDK.
///
/// SDK retries are disabled: every call is a single attempt and the host
/// decides when to redeliver.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsStoreFactory;

#[async_trait]
impl StoreFactory for AwsStoreFactory {
    async fn build(
        &self,
        config: &S3Config,
        credentials: &ResolvedCredentials,
    ) -> Result<Arc<dyn ObjectStore>, OutputError> {
        Ok(Arc::new(AwsObjectStore::new(config, credentials).await))
    }
}

/// [`ObjectStore`] talking to S3 or an S3-compatible service.
#[derive(Debug, Clone)]
pub struct AwsObjectStore {
    client: S3Client,
    part_size: usize,
}

impl AwsObjectStore {
    /// Creates a client for the configuration's region, endpoint and credentials.
    pub async fn new(config: &S3Config, credentials: &ResolvedCredentials) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(CONNECT_TIMEOUT)
                    .operation_timeout(OPERATION_TIMEOUT)
                    .build(),
            );

        if let Some(provider) = credentials.provider() {
            loader = loader.credentials_provider(provider);
        }

        if let Some(endpoint_url) = &config.endpoint_url {
            debug!("Using custom S3 endpoint: {}", endpoint_url);
            loader = loader.endpoint_url(endpoint_url);
        }

        let sdk_config = loader.load().await;

        // S3-compatible services rarely support virtual-hosted buckets.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint_url.is_some())
            .build();

        Self {
            client: S3Client::from_conf(s3_config),
            part_size: config.part_size,
        }
    }

    async fn put_single(&self, request: PutObjectRequest) -> Result<(), OutputError> {
        self.client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .set_content_encoding(request.content_encoding)
            .body(ByteStream::from(request.body))
            .send()
            .await
            .map_err(classify_sdk_error)?;
        Ok(())
    }

    async fn put_multipart(&self, request: PutObjectRequest) -> Result<(), OutputError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&request.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .set_content_encoding(request.content_encoding.clone())
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| OutputError::upload_msg("multipart upload returned no upload id", true))?
            .to_string();

        let result = self.upload_parts(&request, &upload_id).await;

        if result.is_err() {
            warn!(key = %request.key, "Aborting multipart upload {}", upload_id);
            if let Err(e) = self
                .client
                .abort_multipart_upload()
                .bucket(&request.bucket)
                .key(&request.key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                warn!("Failed to abort multipart upload: {}", DisplayErrorContext(&e));
            }
        }

        result
    }

    async fn upload_parts(
        &self,
        request: &PutObjectRequest,
        upload_id: &str,
    ) -> Result<(), OutputError> {
        let mut parts = Vec::new();

        for (index, chunk) in request.body.chunks(self.part_size).enumerate() {
            let part_number = i32::try_from(index + 1)
                .map_err(|_| OutputError::upload_msg("too many multipart parts", false))?;

            let uploaded = self
                .client
                .upload_part()
                .bucket(&request.bucket)
                .key(&request.key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await
                .map_err(classify_sdk_error)?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(uploaded.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
        }

        debug!(key = %request.key, parts = parts.len(), "Completing multipart upload");

        self.client
            .complete_multipart_upload()
            .bucket(&request.bucket)
            .key(&request.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), OutputError> {
        if request.body.len() > self.part_size {
            self.put_multipart(request).await
        } else {
            self.put_single(request).await
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), BucketError> {
        let mut call = self.client.create_bucket().bucket(bucket);

        if let Some(constraint) = location_constraint(region) {
            call = call.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(constraint))
                    .build(),
            );
        }

        match call.send().await {
            Ok(_) => {
                info!("Created bucket {} in {}", bucket, region);
                Ok(())
            }
            Err(e) => match e.as_service_error() {
                Some(service) if service.is_bucket_already_owned_by_you() => {
                    Err(BucketError::AlreadyOwnedByYou(bucket.to_string()))
                }
                Some(service) if service.is_bucket_already_exists() => {
                    Err(BucketError::AlreadyExists(bucket.to_string()))
                }
                _ => Err(BucketError::Other(classify_sdk_error(e))),
            },
        }
    }
}

/// Classifies S3 SDK errors into [`OutputError`] variants, keeping the SDK error as source.
fn classify_sdk_error<E, R>(error: SdkError<E, R>) -> OutputError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match &error {
        // Network/connection errors
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => OutputError::connection(error),

        SdkError::ServiceError(service) => {
            let retryable = service
                .err()
                .code()
                .is_some_and(|code| TRANSIENT_CODES.contains(&code));
            OutputError::upload(error, retryable)
        }

        SdkError::ConstructionFailure(_) => OutputError::configuration(
            DisplayErrorContext(&error).to_string(),
            Some("s3_client".to_string()),
        ),

        _ => OutputError::other_msg(DisplayErrorContext(&error).to_string(), false),
    }
}
