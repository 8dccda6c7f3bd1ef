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

//! Output Trait and Error Types
//!
//! An [`Output`] receives the fully encoded payload of one flush (newline
//! delimited JSON) and is responsible for naming, compressing and storing it.
//! Outputs are the last stage of a flush; the [`flush`](crate::flush) module
//! drives them.
//!
//! # Architecture
//!
//! - **Async-first**: delivery is a network call and is awaited
//! - **Payload-oriented**: the output sees one byte buffer per flush, never single records
//! - **Single attempt**: an output must not retry internally; the host re-delivers
//!   the batch when a flush is reported as retryable
//! - **Thread-safe**: implementations are `Send + Sync` so distinct instances can
//!   flush concurrently
//!
//! # Examples
//!
//! ## Implementing a Custom Output
//!
//! ```rust
//! use logship_core::output::{Output, OutputError};
//! use async_trait::async_trait;
//!
//! /// Writes every payload to stdout.
//! pub struct StdoutOutput;
//!
//! #[async_trait]
//! impl Output for StdoutOutput {
//!     async fn write_payload(&self, payload: Vec<u8>, _records: usize) -> Result<(), OutputError> {
//!         let text = String::from_utf8(payload)
//!             .map_err(|e| OutputError::serialization(e, "payload is not UTF-8"))?;
//!         print!("{text}");
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! [`OutputError`] classifies delivery failures:
//! - [`OutputError::ConnectionError`]: network failures (retryable)
//! - [`OutputError::SerializationError`]: payload could not be prepared (non-retryable)
//! - [`OutputError::CompressionError`]: compression failed (retryable, the batch is redelivered whole)
//! - [`OutputError::UploadError`]: the store rejected the write (retryability recorded per error)
//! - [`OutputError::ConfigurationError`]: invalid setup (non-retryable)
//!
//! The flush controller currently maps every delivery error to a retry; the
//! classification is kept for logging and metrics.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur when delivering a payload to an output.
#[derive(Error, Debug)]
pub enum OutputError {
    /// Connection to the store failed (timeouts, DNS, refused connections).
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Human-readable error message
        message: String,
        /// The underlying connection error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The payload could not be prepared for writing.
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
        /// The underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Compressing the payload failed.
    ///
    /// The object key already carries the compressed extension, so the payload
    /// is never uploaded uncompressed instead.
    #[error("Compression error: {message}")]
    CompressionError {
        /// Human-readable error message
        message: String,
        /// The underlying I/O error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The store rejected or failed the write.
    #[error("Upload error: {message}")]
    UploadError {
        /// Human-readable error message
        message: String,
        /// Whether this specific failure is expected to clear on retry
        retryable: bool,
        /// The underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid output configuration.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Human-readable error message
        message: String,
        /// Configuration parameter name if applicable
        parameter: Option<String>,
    },

    /// Anything that does not fit the categories above.
    #[error("Output error: {message}")]
    Other {
        /// Human-readable error message
        message: String,
        /// Whether this error is retryable
        retryable: bool,
        /// The underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl OutputError {
    /// Creates a connection error from any error type.
    ///
    /// The message carries the whole source chain; the source is kept.
    #[must_use]
    pub fn connection(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ConnectionError {
            message: describe_chain(&source),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a connection error with a custom message.
    #[must_use]
    pub fn connection_msg(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a serialization error from any error type.
    #[must_use]
    pub fn serialization(
        source: impl std::error::Error + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a compression error from any error type.
    #[must_use]
    pub fn compression(
        source: impl std::error::Error + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self::CompressionError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an upload error with retryability information.
    ///
    /// The message carries the whole source chain; the source is kept.
    #[must_use]
    pub fn upload(source: impl std::error::Error + Send + Sync + 'static, retryable: bool) -> Self {
        Self::UploadError {
            message: describe_chain(&source),
            retryable,
            source: Some(Box::new(source)),
        }
    }

    /// Creates an upload error with a custom message.
    #[must_use]
    pub fn upload_msg(message: impl Into<String>, retryable: bool) -> Self {
        Self::UploadError {
            message: message.into(),
            retryable,
            source: None,
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>, parameter: Option<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            parameter,
        }
    }

    /// Creates a generic error with a custom message.
    #[must_use]
    pub fn other_msg(message: impl Into<String>, retryable: bool) -> Self {
        Self::Other {
            message: message.into(),
            retryable,
            source: None,
        }
    }

    /// Returns whether this error is expected to clear on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError { .. } | Self::CompressionError { .. } => true,
            Self::SerializationError { .. } | Self::ConfigurationError { .. } => false,
            Self::UploadError { retryable, .. } | Self::Other { retryable, .. } => *retryable,
        }
    }

    /// Short, low-cardinality label for metrics.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::ConnectionError { .. } => "connection",
            Self::SerializationError { .. } => "serialization",
            Self::CompressionError { .. } => "compression",
            Self::UploadError { .. } => "upload",
            Self::ConfigurationError { .. } => "configuration",
            Self::Other { .. } => "other",
        }
    }
}

/// Joins an error and its sources with `: `.
fn describe_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Metadata describing an output, used for logging and metric labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMetadata {
    /// Human-readable output name (e.g., "AWS S3")
    pub name: String,

    /// Output type identifier (e.g., "s3")
    pub output_type: String,

    /// Additional output-specific metadata
    pub properties: HashMap<String, String>,
}

impl OutputMetadata {
    /// Creates new metadata with required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, output_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output_type: output_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Adds a custom property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Destination of one flush worth of encoded records.
///
/// `write_payload` is called exactly once per flush with the newline-delimited
/// JSON payload, possibly empty. Implementations make a single delivery
/// attempt and report failure; they never retry on their own.
#[async_trait]
pub trait Output: Send + Sync {
    /// Delivers the encoded payload of one flush.
    ///
    /// # Arguments
    ///
    /// * `payload` - Newline-delimited JSON, each line terminated by `\n`
    /// * `records` - Number of records in the payload
    ///
    /// # Errors
    ///
    /// Returns an [`OutputError`] describing why the delivery failed.
    async fn write_payload(&self, payload: Vec<u8>, records: usize) -> Result<(), OutputError>;

    /// Whether a flush that encoded no records should skip delivery.
    ///
    /// Defaults to `false`: an empty object is still written, which keeps one
    /// object per flush interval for downstream completeness checks.
    fn skip_empty_batches(&self) -> bool {
        false
    }

    /// Returns metadata about this output.
    fn metadata(&self) -> OutputMetadata {
        OutputMetadata::new("Unknown", "unknown")
    }
}

/// An in-memory output for testing.
///
/// Stores every delivered payload and can simulate delivery failures.
///
/// # Examples
///
/// ```rust
/// use logship_core::output::{MockOutput, Output};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let output = MockOutput::new();
/// output.write_payload(b"{\"a\":1}\n".to_vec(), 1).await?;
///
/// assert_eq!(output.payloads().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockOutput {
    /// Delivered payloads, in order
    payloads: Mutex<Vec<Vec<u8>>>,
    /// Whether to simulate failures
    fail_writes: bool,
    /// Whether empty batches are skipped
    skip_empty: bool,
}

impl MockOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the mock to fail every delivery.
    #[must_use]
    pub const fn with_write_failures(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Configures the mock to skip empty batches.
    #[must_use]
    pub const fn with_skip_empty(mut self) -> Self {
        self.skip_empty = true;
        self
    }

    /// Returns a copy of every delivered payload.
    #[must_use]
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads
            .lock()
            .map(|payloads| payloads.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Output for MockOutput {
    async fn write_payload(&self, payload: Vec<u8>, _records: usize) -> Result<(), OutputError> {
        if self.fail_writes {
            return Err(OutputError::upload_msg("Simulated upload failure", true));
        }

        self.payloads
            .lock()
            .map_err(|_| OutputError::other_msg("mock output lock poisoned", false))?
            .push(payload);
        Ok(())
    }

    fn skip_empty_batches(&self) -> bool {
        self.skip_empty
    }

    fn metadata(&self) -> OutputMetadata {
        OutputMetadata::new("MockOutput", "mock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_error_retryable() {
        assert!(OutputError::connection_msg("test").is_retryable());
        assert!(
            !OutputError::serialization(std::io::Error::other("test"), "test").is_retryable()
        );
        assert!(OutputError::compression(std::io::Error::other("test"), "test").is_retryable());
        assert!(OutputError::upload_msg("test", true).is_retryable());
        assert!(!OutputError::upload_msg("test", false).is_retryable());
        assert!(!OutputError::configuration("test", None).is_retryable());
        assert!(!OutputError::other_msg("test", false).is_retryable());
    }

    #[test]
    fn test_output_error_category() {
        assert_eq!(OutputError::connection_msg("x").category(), "connection");
        assert_eq!(OutputError::upload_msg("x", true).category(), "upload");
        assert_eq!(
            OutputError::configuration("x", Some("Bucket".into())).category(),
            "configuration"
        );
    }

    #[test]
    fn test_output_error_display() {
        let err = OutputError::upload_msg("AccessDenied", false);
        assert_eq!(err.to_string(), "Upload error: AccessDenied");
    }

    #[derive(Debug, Error)]
    #[error("service error")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_upload_keeps_source_chain() {
        let err = OutputError::upload(Outer(std::io::Error::other("SlowDown: reduce rate")), true);

        assert_eq!(
            err.to_string(),
            "Upload error: service error: SlowDown: reduce rate"
        );
        assert!(err.is_retryable());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_connection_keeps_source() {
        let err = OutputError::connection(std::io::Error::other("dispatch failure"));

        assert_eq!(err.to_string(), "Connection error: dispatch failure");
        assert!(err.is_retryable());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_mock_output_records_payloads() {
        let output = MockOutput::new();

        output.write_payload(b"a\n".to_vec(), 1).await.unwrap();
        output.write_payload(Vec::new(), 0).await.unwrap();

        assert_eq!(output.payloads(), vec![b"a\n".to_vec(), Vec::new()]);
    }

    #[tokio::test]
    async fn test_mock_output_write_failures() {
        let output = MockOutput::new().with_write_failures();

        let err = output.write_payload(Vec::new(), 0).await.unwrap_err();

        assert!(matches!(err, OutputError::UploadError { .. }));
        assert!(err.is_retryable());
        assert!(output.payloads().is_empty());
    }

    #[test]
    fn test_output_metadata_builder() {
        let meta = OutputMetadata::new("S3", "s3")
            .with_property("bucket", "my-bucket")
            .with_property("region", "us-east-1");

        assert_eq!(meta.name, "S3");
        assert_eq!(meta.output_type, "s3");
        assert_eq!(meta.properties.get("bucket"), Some(&"my-bucket".to_string()));
    }
}
