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

//! Metrics instrumentation for flush observability.
//!
//! Uses the `metrics` crate facade; nothing is recorded until the embedding
//! process installs a recorder (Prometheus, StatsD, ...).
//!
//! # Naming Conventions
//!
//! - Prefix with `logship_`
//! - Include a unit suffix (`_seconds`, `_bytes`, `_total`)
//!
//! # Labels
//!
//! - **output\_type**: output type like "s3" (very low cardinality)
//! - **outcome**: flush outcome, "ok" / "retry" / "error"
//! - **error\_type**: error category from [`OutputError::category`](crate::output::OutputError::category)
//!
//! Never use object keys, bucket names or record contents as labels.
//!
//! # Examples
//!
//! ```rust
//! use logship_core::metrics;
//!
//! metrics::init_metrics();
//! metrics::increment_records_encoded(3, "s3");
//! metrics::record_upload_bytes(1024, "s3");
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric name prefix for all Logship metrics.
#[doc(hidden)]
pub const METRIC_PREFIX: &str = "logship";

/// Records encoded into a flush payload.
///
/// Type: Counter
/// Labels: output_type
#[doc(hidden)]
pub const RECORDS_ENCODED_TOTAL: &str = "logship_records_encoded_total";

/// Records dropped because they could not be encoded.
///
/// Type: Counter
/// Labels: output_type
const RECORDS_DROPPED_TOTAL: &str = "logship_records_dropped_total";

/// Flush invocations by outcome.
///
/// Type: Counter
/// Labels: output_type, outcome
const FLUSHES_TOTAL: &str = "logship_flushes_total";

/// Output delivery errors.
///
/// Type: Counter
/// Labels: output_type, error_type
const OUTPUT_ERRORS_TOTAL: &str = "logship_output_errors_total";

/// Time taken by one flush, from first record pulled to delivery result.
///
/// Type: Histogram
/// Labels: output_type
/// Unit: seconds
#[doc(hidden)]
pub const FLUSH_DURATION_SECONDS: &str = "logship_flush_duration_seconds";

/// Size of the object written to storage (compressed if applicable).
///
/// Type: Histogram
/// Labels: output_type
/// Unit: bytes
const UPLOAD_BYTES: &str = "logship_upload_bytes";

/// Registers metric descriptions.
///
/// Call once at startup, before recording any metrics.
pub fn init_metrics() {
    describe_counter!(
        RECORDS_ENCODED_TOTAL,
        "Total number of records encoded into flush payloads"
    );

    describe_counter!(
        RECORDS_DROPPED_TOTAL,
        "Total number of records dropped because they could not be encoded as JSON"
    );

    describe_counter!(FLUSHES_TOTAL, "Total number of flush invocations by outcome");

    describe_counter!(
        OUTPUT_ERRORS_TOTAL,
        "Total number of errors delivering payloads to outputs"
    );

    describe_histogram!(
        FLUSH_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time taken by a flush from draining records to the delivery result"
    );

    describe_histogram!(
        UPLOAD_BYTES,
        metrics::Unit::Bytes,
        "Size of objects written to storage (compressed if applicable)"
    );
}

/// Adds to the count of encoded records.
pub fn increment_records_encoded(count: u64, output_type: &str) {
    counter!(RECORDS_ENCODED_TOTAL, "output_type" => output_type.to_string()).increment(count);
}

/// Adds to the count of dropped records.
pub fn increment_records_dropped(count: u64, output_type: &str) {
    counter!(RECORDS_DROPPED_TOTAL, "output_type" => output_type.to_string()).increment(count);
}

/// Increments the flush counter for the given outcome label.
pub fn increment_flushes(output_type: &str, outcome: &'static str) {
    counter!(
        FLUSHES_TOTAL,
        "output_type" => output_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Increments the count of output errors.
pub fn increment_output_errors(output_type: &str, error_type: &'static str) {
    counter!(
        OUTPUT_ERRORS_TOTAL,
        "output_type" => output_type.to_string(),
        "error_type" => error_type
    )
    .increment(1);
}

/// Records how long a flush took.
pub fn record_flush_duration(duration: Duration, output_type: &str) {
    histogram!(FLUSH_DURATION_SECONDS, "output_type" => output_type.to_string())
        .record(duration.as_secs_f64());
}

/// Records the size of an uploaded object.
#[allow(clippy::cast_precision_loss)]
pub fn record_upload_bytes(bytes: usize, output_type: &str) {
    histogram!(UPLOAD_BYTES, "output_type" => output_type.to_string()).record(bytes as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, SharedString, Unit};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_metric_names_share_prefix() {
        for name in [
            RECORDS_ENCODED_TOTAL,
            RECORDS_DROPPED_TOTAL,
            FLUSHES_TOTAL,
            OUTPUT_ERRORS_TOTAL,
            FLUSH_DURATION_SECONDS,
            UPLOAD_BYTES,
        ] {
            assert!(name.starts_with(METRIC_PREFIX));
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        init_metrics();
        increment_records_encoded(3, "s3");
        increment_records_dropped(2, "s3");
        increment_flushes("s3", "ok");
        increment_output_errors("s3", "upload");
        record_flush_duration(Duration::from_millis(5), "s3");
        record_upload_bytes(512, "s3");
    }

    /// Counter recorder that keeps every increment it sees.
    #[derive(Default)]
    struct CountingRecorder {
        increments: Arc<Mutex<Vec<(String, u64)>>>,
    }

    struct CountingHandle {
        name: String,
        increments: Arc<Mutex<Vec<(String, u64)>>>,
    }

    impl metrics::CounterFn for CountingHandle {
        fn increment(&self, value: u64) {
            self.increments.lock().unwrap().push((self.name.clone(), value));
        }

        fn absolute(&self, _value: u64) {}
    }

    impl metrics::Recorder for CountingRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            Counter::from_arc(Arc::new(CountingHandle {
                name: key.name().to_string(),
                increments: Arc::clone(&self.increments),
            }))
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_dropped_records_counted_in_one_increment() {
        let recorder = CountingRecorder::default();

        metrics::with_local_recorder(&recorder, || increment_records_dropped(3, "s3"));

        let increments = recorder.increments.lock().unwrap();
        assert_eq!(*increments, vec![(RECORDS_DROPPED_TOTAL.to_string(), 3)]);
    }
}
