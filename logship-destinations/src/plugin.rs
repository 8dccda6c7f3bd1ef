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

//! Host-facing plugin context.
//!
//! The host runtime drives the output through four calls:
//!
//! - [`PluginContext::register`] - describe the plugin
//! - [`PluginContext::init`] - build one operator from instance parameters
//! - [`PluginContext::flush`] - upload everything a record source holds
//! - [`PluginContext::exit`] - tear down
//!
//! Operators live in an append-only list owned by the context. An
//! [`OperatorId`] is the operator's position in that list; ids are never
//! reused. `init` needs `&mut self`, `flush` only `&self`, so concurrent
//! flushes of different instances share the context without locks.

use crate::s3::config::{keys, ConfigSource, S3Config, S3ConfigError};
use crate::s3::credentials::CredentialError;
use crate::s3::store::StoreFactory;
use crate::s3::{AwsStoreFactory, S3Operator};
use logship_core::flush::{flush_records, FlushOutcome, FLB_ERROR, FLB_OK};
use logship_core::metrics;
use logship_core::output::OutputError;
use logship_core::source::RecordSource;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::EnvFilter;

/// Name under which the output registers with the host.
pub const PLUGIN_NAME: &str = "s3";

/// Parameters that are never logged in clear text.
const SECRET_KEYS: &[&str] = &[keys::SECRET_ACCESS_KEY];

/// Parameters echoed at debug level during `init`.
const LOGGED_KEYS: &[&str] = &[
    keys::CREDENTIAL,
    keys::ACCESS_KEY_ID,
    keys::SECRET_ACCESS_KEY,
    keys::BUCKET,
    keys::S3_PREFIX,
    keys::SUFFIX_ALGORITHM,
    keys::REGION,
    keys::COMPRESS,
    keys::ENDPOINT,
    keys::AUTO_CREATE_BUCKET,
    keys::LOG_LEVEL,
    keys::TIME_FORMAT,
    keys::TIME_ZONE,
    keys::SKIP_EMPTY,
];

/// Description returned by [`PluginContext::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Plugin name
    pub name: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Opaque handle of one initialized operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperatorId(usize);

impl OperatorId {
    /// Rebuilds an id from the raw value the host stored.
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw value to hand to the host.
    #[must_use]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fatal initialization errors. The instance is not registered.
#[derive(Error, Debug)]
pub enum InitError {
    /// Invalid parameters.
    #[error("configuration error: {0}")]
    Config(#[from] S3ConfigError),

    /// Explicit credentials could not be validated.
    #[error("credential error: {0}")]
    Credentials(#[from] CredentialError),

    /// The store could not be built or the bucket could not be created.
    #[error("store error: {0}")]
    Store(#[from] OutputError),
}

impl InitError {
    /// Host return code for a failed `init`.
    #[must_use]
    pub const fn code(&self) -> i32 {
        FLB_ERROR
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` overrides `level` when set. Only the first call installs a
/// subscriber; later calls (one per instance) are no-ops.
pub fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("logship_core={level},logship_destinations={level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .try_init();
}

/// Owns every operator of the process.
///
/// # Example
///
/// ```rust
/// use logship_core::flush::FlushOutcome;
/// use logship_core::record::{EventTime, Record};
/// use logship_core::source::MemoryRecordSource;
/// use logship_destinations::plugin::PluginContext;
/// use logship_destinations::s3::MemoryStoreFactory;
/// use std::collections::HashMap;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let factory = MemoryStoreFactory::default();
/// let store = factory.store().clone();
/// let mut context = PluginContext::with_factory(factory);
///
/// let params: HashMap<String, String> = [("Bucket", "logs"), ("S3Prefix", "app"), ("Region", "us-east-1")]
///     .into_iter()
///     .map(|(k, v)| (k.to_string(), v.to_string()))
///     .collect();
/// let id = context.init(&params).await?;
///
/// let mut records: MemoryRecordSource =
///     vec![(EventTime::Unknown, Record::new().with_field("mykey", "myvalue"))]
///         .into_iter()
///         .collect();
///
/// assert_eq!(context.flush(id, &mut records).await, FlushOutcome::Ok);
/// assert_eq!(store.objects().await.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct PluginContext<F: StoreFactory = AwsStoreFactory> {
    factory: F,
    operators: Vec<Arc<S3Operator>>,
}

impl PluginContext<AwsStoreFactory> {
    /// Creates a context that uploads to AWS S3 (or a compatible endpoint).
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(AwsStoreFactory)
    }
}

impl Default for PluginContext<AwsStoreFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: StoreFactory> fmt::Debug for PluginContext<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("operators", &self.operators.len())
            .finish_non_exhaustive()
    }
}

impl<F: StoreFactory> PluginContext<F> {
    /// Creates a context that builds stores with `factory`.
    #[must_use]
    pub fn with_factory(factory: F) -> Self {
        Self {
            factory,
            operators: Vec::new(),
        }
    }

    /// Describes the plugin to the host.
    #[must_use]
    pub const fn register() -> PluginDescriptor {
        PluginDescriptor {
            name: PLUGIN_NAME,
            description: "S3 output plugin",
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Builds and registers an operator from instance parameters.
    ///
    /// # Errors
    ///
    /// Returns an [`InitError`] for invalid parameters, unusable credentials,
    /// or a failed bucket creation. Nothing is registered in that case.
    pub async fn init<C: ConfigSource + ?Sized>(&mut self, params: &C) -> Result<OperatorId, InitError> {
        init_logging(requested_log_level(params));
        metrics::init_metrics();
        log_parameters(params);

        let config = S3Config::from_source(params).inspect_err(|e| {
            error!("Invalid S3 output configuration: {}", e);
        })?;

        let credentials = config.credentials.resolve().await.inspect_err(|e| {
            error!("Failed to resolve credentials: {}", e);
        })?;
        debug!(source = config.credentials.kind(), "Credentials resolved");

        let store = self.factory.build(&config, &credentials).await?;

        let id = OperatorId(self.operators.len());
        let operator = S3Operator::new(id.0, config, credentials, store)
            .await
            .inspect_err(|e| error!("Failed to create S3 operator: {}", e))?;

        self.operators.push(Arc::new(operator));
        info!(operator_id = %id, "S3 output initialized");

        Ok(id)
    }

    /// Looks up an operator.
    #[must_use]
    pub fn operator(&self, id: OperatorId) -> Option<&Arc<S3Operator>> {
        self.operators.get(id.0)
    }

    /// Number of registered operators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Whether no operator has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Uploads everything `records` holds through operator `id`.
    ///
    /// Returns [`FlushOutcome::Error`] only for an unknown id; delivery
    /// failures are [`FlushOutcome::Retry`].
    #[instrument(skip(self, records), fields(operator_id = %id))]
    pub async fn flush(&self, id: OperatorId, records: &mut dyn RecordSource) -> FlushOutcome {
        let Some(operator) = self.operator(id) else {
            error!("Flush for unknown operator");
            return FlushOutcome::Error;
        };

        let report = flush_records(operator.as_ref(), records).await;
        debug!(
            encoded = report.encoded,
            dropped = report.dropped,
            bytes = report.payload_bytes,
            skipped = report.skipped,
            "Flush finished: {}",
            report.outcome.as_str()
        );

        report.outcome
    }

    /// Releases every operator.
    pub fn exit(self) -> i32 {
        info!(operators = self.operators.len(), "Shutting down S3 output");
        FLB_OK
    }
}

/// Log level named by the raw `LogLevel` parameter, `INFO` when unset or invalid.
///
/// Read before the configuration is validated so validation errors are logged.
fn requested_log_level<C: ConfigSource + ?Sized>(params: &C) -> LevelFilter {
    params
        .get(keys::LOG_LEVEL)
        .and_then(|level| level.trim().parse().ok())
        .unwrap_or(LevelFilter::INFO)
}

fn log_parameters<C: ConfigSource + ?Sized>(params: &C) {
    for key in LOGGED_KEYS {
        let Some(value) = params.get(key) else {
            continue;
        };
        if SECRET_KEYS.contains(key) && !value.is_empty() {
            debug!("[s3] {} = <redacted>", key);
        } else {
            debug!("[s3] {} = '{}'", key, value);
        }
    }
}
