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

//! S3 output configuration.
//!
//! This module provides configuration for the S3 output, including:
//! - Bucket, prefix and region configuration
//! - Compression and object name suffix options
//! - Time bucketing (format and time zone)
//! - Credential selection
//!
//! A configuration is built once per output instance, either through
//! [`S3Config::builder`] or from the host's string parameters with
//! [`S3Config::from_source`], and is never mutated afterwards.

use crate::s3::credentials::CredentialSource;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::hash::BuildHasher;
use thiserror::Error;
use tracing::debug;
use tracing::level_filters::LevelFilter;
use url::Url;

/// Region assumed when only a custom endpoint is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default time bucketing pattern: one directory per date, one per hour.
pub const DEFAULT_TIME_FORMAT: &str = "%Y%m%d/%H";

/// Smallest part size S3 accepts for multipart uploads (5 MiB).
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Host parameter names.
pub mod keys {
    /// Path to a shared credentials file
    pub const CREDENTIAL: &str = "Credential";
    /// Static access key id
    pub const ACCESS_KEY_ID: &str = "AccessKeyID";
    /// Static secret access key
    pub const SECRET_ACCESS_KEY: &str = "SecretAccessKey";
    /// Bucket name
    pub const BUCKET: &str = "Bucket";
    /// Object key prefix
    pub const S3_PREFIX: &str = "S3Prefix";
    /// Object name suffix algorithm
    pub const SUFFIX_ALGORITHM: &str = "SuffixAlgorithm";
    /// AWS region
    pub const REGION: &str = "Region";
    /// Compression format
    pub const COMPRESS: &str = "Compress";
    /// Custom endpoint for S3-compatible stores
    pub const ENDPOINT: &str = "Endpoint";
    /// Create the bucket at startup
    pub const AUTO_CREATE_BUCKET: &str = "AutoCreateBucket";
    /// Log verbosity
    pub const LOG_LEVEL: &str = "LogLevel";
    /// Time bucketing pattern
    pub const TIME_FORMAT: &str = "TimeFormat";
    /// Time zone used for bucketing
    pub const TIME_ZONE: &str = "TimeZone";
    /// Skip uploads for flushes without records
    pub const SKIP_EMPTY: &str = "SkipEmpty";
}

/// Errors raised while building an [`S3Config`].
///
/// All of them are fatal: the output instance is not registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum S3ConfigError {
    /// A required parameter was not provided.
    #[error("{0} is required")]
    Missing(&'static str),

    /// Bucket was empty.
    #[error("Cannot specify empty string to bucket name")]
    EmptyBucket,

    /// Prefix was empty.
    #[error("Cannot specify empty string to s3prefix")]
    EmptyPrefix,

    /// Region was empty and no endpoint was given.
    #[error("Cannot specify empty string to region")]
    EmptyRegion,

    /// The endpoint points at AWS itself.
    #[error("Endpoint is not supported for AWS S3. This parameter is intended for S3 compatible services. Use Region instead.")]
    AwsEndpoint,

    /// The endpoint is not a valid URL.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured
        endpoint: String,
        /// Parser message
        reason: String,
    },

    /// The time zone is not a known IANA zone.
    #[error("invalid timeZone: unknown time zone {0}")]
    InvalidTimeZone(String),

    /// The time format contains an invalid strftime specifier.
    #[error("invalid timeFormat: {0}")]
    InvalidTimeFormat(String),

    /// The log level is not recognized.
    #[error("invalid logLevel: {0}")]
    InvalidLogLevel(String),

    /// The multipart part size is below the S3 minimum.
    #[error("part size {0} is below the 5 MiB minimum")]
    PartSizeTooSmall(usize),
}

/// Compression algorithm for uploaded objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// No compression.
    #[default]
    None,

    /// Gzip compression (RFC 1952).
    ///
    /// File extension: `.gz`
    Gzip,
}

impl Compression {
    /// Parses the `Compress` parameter. Unknown values mean no compression.
    #[must_use]
    pub fn from_param(value: &str) -> Self {
        match value.trim() {
            v if v.eq_ignore_ascii_case("gzip") => Self::Gzip,
            "" => Self::None,
            other => {
                debug!("Unknown compression '{}', uploading uncompressed", other);
                Self::None
            }
        }
    }

    /// Returns the file extension suffix for this compression (with the dot).
    ///
    /// Appended to the `.log` extension, e.g. `20190310101112.log.gz`.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => ".gz",
        }
    }

    /// Returns the MIME type of an object written with this compression.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::None => "application/x-ndjson",
            Self::Gzip => "application/gzip",
        }
    }

    /// Lowercase name, for logs and metadata.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }
}

/// Object name suffix appended after the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuffixAlgorithm {
    /// No suffix.
    #[default]
    None,

    /// `-<sha256 hex>` of the uncompressed payload.
    ///
    /// Re-uploads of an identical batch in the same second land on the same key.
    Sha256,
}

impl SuffixAlgorithm {
    /// Parses the `SuffixAlgorithm` parameter. Unknown values mean no suffix.
    #[must_use]
    pub fn from_param(value: &str) -> Self {
        match value.trim() {
            v if v.eq_ignore_ascii_case("sha256") => Self::Sha256,
            "" => Self::None,
            other => {
                debug!("Unknown suffix algorithm '{}', using none", other);
                Self::None
            }
        }
    }

    /// Lowercase name, for logs and metadata.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sha256 => "sha256",
        }
    }
}

/// Time zone used to bucket objects.
///
/// The zone decides which date/hour directory a flush lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneSetting {
    /// The process's local time zone.
    #[default]
    Local,

    /// A named IANA zone (`UTC`, `Asia/Tokyo`, `US/Eastern`, ...).
    Named(Tz),
}

impl TimeZoneSetting {
    /// Parses the `TimeZone` parameter. Empty or `Local` selects the local zone.
    ///
    /// # Errors
    ///
    /// Returns [`S3ConfigError::InvalidTimeZone`] for unknown zone names.
    pub fn parse(value: &str) -> Result<Self, S3ConfigError> {
        let value = value.trim();
        if value.is_empty() || value == "Local" {
            return Ok(Self::Local);
        }

        value
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| S3ConfigError::InvalidTimeZone(value.to_string()))
    }

    /// Formats `timestamp` in this zone with a strftime pattern.
    ///
    /// The pattern must have been validated; see [`validate_time_format`].
    #[must_use]
    pub fn format(&self, timestamp: &DateTime<Utc>, pattern: &str) -> String {
        match self {
            Self::Local => timestamp
                .with_timezone(&chrono::Local)
                .format(pattern)
                .to_string(),
            Self::Named(tz) => timestamp.with_timezone(tz).format(pattern).to_string(),
        }
    }

    /// Zone name, for logs.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Local => "Local".to_string(),
            Self::Named(tz) => tz.name().to_string(),
        }
    }
}

/// Checks that a strftime pattern only contains valid specifiers.
///
/// # Errors
///
/// Returns [`S3ConfigError::InvalidTimeFormat`] when chrono cannot parse the pattern.
pub fn validate_time_format(pattern: &str) -> Result<(), S3ConfigError> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(S3ConfigError::InvalidTimeFormat(pattern.to_string()));
    }
    Ok(())
}

/// Rejects endpoints that point at AWS S3 itself and returns the endpoint to use.
///
/// An endpoint without a scheme (`minio.local:9000`) is read as `https://`;
/// the returned string carries the scheme the SDK needs.
///
/// # Errors
///
/// Returns [`S3ConfigError::AwsEndpoint`] for `amazonaws.com` hosts and
/// [`S3ConfigError::InvalidEndpoint`] for URLs without a usable host or with a
/// scheme other than `http`/`https`.
pub fn validate_endpoint(endpoint: &str) -> Result<String, S3ConfigError> {
    let endpoint = endpoint.trim();
    let invalid = |reason: String| S3ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    // Without `://`, `host:port` would parse as a URL whose scheme is the host.
    let normalized = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    };
    let url = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| invalid("missing host".to_string()))?
        .trim_end_matches('.')
        .to_ascii_lowercase();

    let is_aws = ["amazonaws.com", "amazonaws.com.cn"]
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")));
    if is_aws {
        return Err(S3ConfigError::AwsEndpoint);
    }

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }

    Ok(normalized)
}

/// String-keyed parameter lookup provided by the host.
pub trait ConfigSource {
    /// Returns the raw value of a parameter, if set.
    fn get(&self, key: &str) -> Option<String>;
}

impl<S: BuildHasher> ConfigSource for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Configuration for one S3 output instance.
///
/// # Examples
///
/// ```rust
/// use logship_destinations::s3::{Compression, S3Config, SuffixAlgorithm};
///
/// let config = S3Config::builder()
///     .bucket("my-logs")
///     .prefix("fluent-bit")
///     .region("eu-west-1")
///     .compression(Compression::Gzip)
///     .suffix_algorithm(SuffixAlgorithm::Sha256)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.time_format, "%Y%m%d/%H");
/// ```
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name.
    pub bucket: String,

    /// Key prefix; every object key starts with it.
    pub prefix: String,

    /// AWS region (or [`DEFAULT_REGION`] for custom endpoints without one).
    pub region: String,

    /// Custom endpoint URL for S3-compatible storage. Implies path-style addressing.
    pub endpoint_url: Option<String>,

    /// Compression algorithm (default: None).
    pub compression: Compression,

    /// Object name suffix (default: None).
    pub suffix_algorithm: SuffixAlgorithm,

    /// strftime pattern for the directory component (default: [`DEFAULT_TIME_FORMAT`]).
    pub time_format: String,

    /// Time zone used for the directory and file name (default: local).
    pub time_zone: TimeZoneSetting,

    /// Create the bucket when the operator starts.
    pub auto_create_bucket: bool,

    /// Skip the upload when a flush encoded no records.
    pub skip_empty_batches: bool,

    /// Log verbosity for this instance.
    pub log_level: LevelFilter,

    /// Which credentials the operator should use.
    pub credentials: CredentialSource,

    /// Bodies above this size are uploaded in parts.
    pub part_size: usize,
}

impl S3Config {
    /// Creates a new builder for `S3Config`.
    #[must_use]
    pub fn builder() -> S3ConfigBuilder {
        S3ConfigBuilder::default()
    }

    /// Builds a configuration from the host's string parameters.
    ///
    /// Empty values are treated as unset. `SuffixAlgorithm` and `Compress`
    /// fall back to none for unknown values; `TimeZone`, `TimeFormat`,
    /// `LogLevel` and `Endpoint` are validated.
    ///
    /// # Errors
    ///
    /// Returns an [`S3ConfigError`] for missing or invalid parameters.
    pub fn from_source<C: ConfigSource + ?Sized>(source: &C) -> Result<Self, S3ConfigError> {
        let param = |key: &str| {
            source
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str| param(key).is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let mut builder = Self::builder()
            .credentials(CredentialSource::select(
                &param(keys::ACCESS_KEY_ID).unwrap_or_default(),
                &param(keys::SECRET_ACCESS_KEY).unwrap_or_default(),
                &param(keys::CREDENTIAL).unwrap_or_default(),
            ))
            .compression(Compression::from_param(
                &param(keys::COMPRESS).unwrap_or_default(),
            ))
            .suffix_algorithm(SuffixAlgorithm::from_param(
                &param(keys::SUFFIX_ALGORITHM).unwrap_or_default(),
            ))
            .time_zone(TimeZoneSetting::parse(
                &param(keys::TIME_ZONE).unwrap_or_default(),
            )?)
            .auto_create_bucket(flag(keys::AUTO_CREATE_BUCKET))
            .skip_empty_batches(flag(keys::SKIP_EMPTY));

        if let Some(bucket) = source.get(keys::BUCKET) {
            builder = builder.bucket(bucket);
        }
        if let Some(prefix) = source.get(keys::S3_PREFIX) {
            builder = builder.prefix(prefix);
        }
        if let Some(region) = param(keys::REGION) {
            builder = builder.region(region);
        }
        if let Some(endpoint) = param(keys::ENDPOINT) {
            builder = builder.endpoint_url(endpoint);
        }
        if let Some(format) = param(keys::TIME_FORMAT) {
            builder = builder.time_format(format);
        }
        if let Some(level) = param(keys::LOG_LEVEL) {
            let level = level
                .parse::<LevelFilter>()
                .map_err(|_| S3ConfigError::InvalidLogLevel(level.clone()))?;
            builder = builder.log_level(level);
        }

        builder.build()
    }
}

/// Builder for `S3Config`.
///
/// Provides a fluent API for constructing S3 configuration with validation.
#[derive(Debug, Default)]
pub struct S3ConfigBuilder {
    bucket: Option<String>,
    prefix: Option<String>,
    region: Option<String>,
    endpoint_url: Option<String>,
    compression: Option<Compression>,
    suffix_algorithm: Option<SuffixAlgorithm>,
    time_format: Option<String>,
    time_zone: Option<TimeZoneSetting>,
    auto_create_bucket: Option<bool>,
    skip_empty_batches: Option<bool>,
    log_level: Option<LevelFilter>,
    credentials: Option<CredentialSource>,
    part_size: Option<usize>,
}

impl S3ConfigBuilder {
    /// Sets the S3 bucket name (required).
    #[must_use]
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Sets the key prefix (required).
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the AWS region (required unless an endpoint is set).
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets a custom endpoint URL for S3-compatible storage.
    ///
    /// ```rust,ignore
    /// // MinIO
    /// builder.endpoint_url("http://localhost:9000")
    /// ```
    #[must_use]
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Sets the compression algorithm (default: None).
    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Sets the object name suffix algorithm (default: None).
    #[must_use]
    pub fn suffix_algorithm(mut self, algorithm: SuffixAlgorithm) -> Self {
        self.suffix_algorithm = Some(algorithm);
        self
    }

    /// Sets the strftime pattern for the directory component.
    #[must_use]
    pub fn time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = Some(format.into());
        self
    }

    /// Sets the time zone used for bucketing (default: local).
    #[must_use]
    pub fn time_zone(mut self, zone: TimeZoneSetting) -> Self {
        self.time_zone = Some(zone);
        self
    }

    /// Creates the bucket at startup when set.
    #[must_use]
    pub fn auto_create_bucket(mut self, enabled: bool) -> Self {
        self.auto_create_bucket = Some(enabled);
        self
    }

    /// Skips uploads for flushes without records when set.
    #[must_use]
    pub fn skip_empty_batches(mut self, enabled: bool) -> Self {
        self.skip_empty_batches = Some(enabled);
        self
    }

    /// Sets the log verbosity (default: info).
    #[must_use]
    pub fn log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Sets the credential selection (default: ambient provider chain).
    #[must_use]
    pub fn credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the multipart part size (default and minimum: 5 MiB).
    #[must_use]
    pub fn part_size(mut self, bytes: usize) -> Self {
        self.part_size = Some(bytes);
        self
    }

    /// Builds the `S3Config`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `bucket` or `prefix` is missing or empty
    /// - `region` is missing or empty and no endpoint is set
    /// - the endpoint is invalid or points at AWS
    /// - the time format has invalid specifiers
    /// - the part size is below 5 MiB
    pub fn build(self) -> Result<S3Config, S3ConfigError> {
        let bucket = self.bucket.ok_or(S3ConfigError::Missing("bucket"))?;
        if bucket.is_empty() {
            return Err(S3ConfigError::EmptyBucket);
        }

        let prefix = self.prefix.ok_or(S3ConfigError::Missing("s3prefix"))?;
        if prefix.is_empty() {
            return Err(S3ConfigError::EmptyPrefix);
        }

        let endpoint_url = self
            .endpoint_url
            .as_deref()
            .map(validate_endpoint)
            .transpose()?;

        let region = match (self.region, &endpoint_url) {
            (Some(region), _) if !region.is_empty() => region,
            (_, Some(_)) => DEFAULT_REGION.to_string(),
            (Some(_), None) => return Err(S3ConfigError::EmptyRegion),
            (None, None) => return Err(S3ConfigError::Missing("region")),
        };

        let time_format = self
            .time_format
            .unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string());
        validate_time_format(&time_format)?;

        let part_size = self.part_size.unwrap_or(MIN_PART_SIZE);
        if part_size < MIN_PART_SIZE {
            return Err(S3ConfigError::PartSizeTooSmall(part_size));
        }

        Ok(S3Config {
            bucket,
            prefix,
            region,
            endpoint_url,
            compression: self.compression.unwrap_or_default(),
            suffix_algorithm: self.suffix_algorithm.unwrap_or_default(),
            time_format,
            time_zone: self.time_zone.unwrap_or_default(),
            auto_create_bucket: self.auto_create_bucket.unwrap_or(false),
            skip_empty_batches: self.skip_empty_batches.unwrap_or(false),
            log_level: self.log_level.unwrap_or(LevelFilter::INFO),
            credentials: self.credentials.unwrap_or(CredentialSource::Ambient),
            part_size,
        })
    }
}
