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

//! S3 object key generation.
//!
//! Keys follow `{prefix}/{time-bucket}/{timestamp}[-{hash}].log[.gz]`:
//!
//! - `time-bucket` is the flush time formatted with the configured strftime
//!   pattern (default `%Y%m%d/%H`)
//! - `timestamp` is the flush time as `%Y%m%d%H%M%S`
//! - both use the configured time zone
//! - `hash` is the SHA-256 of the uncompressed payload when the `sha256`
//!   suffix is enabled
//!
//! # Examples
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use logship_destinations::s3::{KeyGenerator, S3Config, TimeZoneSetting};
//!
//! let config = S3Config::builder()
//!     .bucket("logs")
//!     .prefix("fluent-bit")
//!     .region("us-east-1")
//!     .time_zone(TimeZoneSetting::parse("UTC").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let keys = KeyGenerator::from_config(&config);
//! let ts = Utc.with_ymd_and_hms(2019, 3, 10, 10, 11, 12).unwrap();
//!
//! assert_eq!(
//!     keys.generate_key(&ts, b""),
//!     "fluent-bit/20190310/10/20190310101112.log"
//! );
//! ```

use crate::s3::config::{Compression, S3Config, SuffixAlgorithm, TimeZoneSetting};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Extension of every object before compression.
pub const LOG_EXTENSION: &str = ".log";

/// strftime pattern of the file name component.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Derives object keys for one operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGenerator {
    prefix: String,
    time_format: String,
    time_zone: TimeZoneSetting,
    compression: Compression,
    suffix_algorithm: SuffixAlgorithm,
}

impl KeyGenerator {
    /// Captures the key-related settings of a configuration.
    #[must_use]
    pub fn from_config(config: &S3Config) -> Self {
        Self {
            prefix: config.prefix.clone(),
            time_format: config.time_format.clone(),
            time_zone: config.time_zone,
            compression: config.compression,
            suffix_algorithm: config.suffix_algorithm,
        }
    }

    /// Generates the key for a payload flushed at `timestamp`.
    ///
    /// `payload` is only read when the SHA-256 suffix is enabled.
    #[must_use]
    pub fn generate_key(&self, timestamp: &DateTime<Utc>, payload: &[u8]) -> String {
        let directory = self.time_zone.format(timestamp, &self.time_format);
        let file_name = format!(
            "{}{}{}{}",
            self.time_zone.format(timestamp, FILE_TIMESTAMP_FORMAT),
            self.suffix(payload),
            LOG_EXTENSION,
            self.compression.extension()
        );

        join_key(&[&self.prefix, &directory, &file_name])
    }

    fn suffix(&self, payload: &[u8]) -> String {
        match self.suffix_algorithm {
            SuffixAlgorithm::None => String::new(),
            SuffixAlgorithm::Sha256 => format!("-{}", content_digest(payload)),
        }
    }
}

/// Lowercase hex SHA-256 of `payload`.
#[must_use]
pub fn content_digest(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Joins key segments with `/`, collapsing repeated separators.
///
/// Leading and trailing separators are dropped, so `"logs/"` and `"logs"`
/// produce the same key.
#[must_use]
pub fn join_key(segments: &[&str]) -> String {
    segments
        .iter()
        .flat_map(|segment| segment.split('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
