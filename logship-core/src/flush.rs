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

//! Flush control flow.
//!
//! One flush turns everything a [`RecordSource`] currently holds into exactly
//! one delivery to an [`Output`]:
//!
//! 1. **Drain** - pull records until the source is exhausted
//! 2. **Encode** - one JSON line per record; records that fail are logged and dropped
//! 3. **Deliver** - hand the joined payload to the output, once
//! 4. **Classify** - map the result to a [`FlushOutcome`]
//!
//! There is no retry loop here. A failed delivery is reported as
//! [`FlushOutcome::Retry`] and the host redelivers the batch on its own schedule.
//!
//! # Example
//!
//! ```rust
//! use logship_core::flush::{flush_records, FlushOutcome};
//! use logship_core::output::MockOutput;
//! use logship_core::record::{EventTime, Record};
//! use logship_core::source::MemoryRecordSource;
//!
//! # async fn example() {
//! let output = MockOutput::new();
//! let mut source: MemoryRecordSource =
//!     vec![(EventTime::Unknown, Record::new().with_field("mykey", "myvalue"))]
//!         .into_iter()
//!         .collect();
//!
//! let report = flush_records(&output, &mut source).await;
//! assert_eq!(report.outcome, FlushOutcome::Ok);
//! # }
//! ```

use crate::encoder::encode_record;
use crate::metrics;
use crate::output::Output;
use crate::source::RecordSource;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Host return code: unrecoverable error, do not try again.
pub const FLB_ERROR: i32 = 0;

/// Host return code: data has been processed.
pub const FLB_OK: i32 = 1;

/// Host return code: retry the flush later.
pub const FLB_RETRY: i32 = 2;

/// Result of one flush, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The batch was delivered (or intentionally skipped).
    Ok,

    /// Delivery failed; the host should redeliver the batch later.
    Retry,

    /// The flush could not run at all (e.g. unknown instance). Not retried.
    Error,
}

impl FlushOutcome {
    /// Host return code for this outcome.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Ok => FLB_OK,
            Self::Retry => FLB_RETRY,
            Self::Error => FLB_ERROR,
        }
    }

    /// Metric label for this outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Retry => "retry",
            Self::Error => "error",
        }
    }
}

/// Records drained from a source, encoded and joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedBatch {
    /// Newline-delimited JSON; every line ends with `\n`
    pub payload: Vec<u8>,

    /// Records encoded into `payload`
    pub encoded: usize,

    /// Records dropped because they failed to encode
    pub dropped: usize,
}

impl EncodedBatch {
    /// Whether no record made it into the payload.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.encoded == 0
    }
}

/// Summary of a completed flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Outcome reported to the host
    pub outcome: FlushOutcome,

    /// Records encoded into the payload
    pub encoded: usize,

    /// Records dropped during encoding
    pub dropped: usize,

    /// Uncompressed payload size in bytes
    pub payload_bytes: usize,

    /// Whether delivery was skipped because the batch was empty
    pub skipped: bool,
}

/// Drains `source` and encodes every record into one payload.
///
/// Records that fail to encode are logged and skipped; they never abort the batch.
pub fn drain_records<S: RecordSource + ?Sized>(source: &mut S) -> EncodedBatch {
    let mut batch = EncodedBatch::default();

    while let Some((time, record)) = source.next_record() {
        match encode_record(&record) {
            Ok(line) => {
                batch.payload.extend_from_slice(line.as_bytes());
                batch.payload.push(b'\n');
                batch.encoded += 1;
            }
            Err(e) => {
                warn!(
                    timestamp = %time.resolve(),
                    "Dropping record that could not be encoded: {}", e
                );
                batch.dropped += 1;
            }
        }
    }

    batch
}

/// Runs one flush: drain, encode, deliver once, classify.
///
/// Every delivery error maps to [`FlushOutcome::Retry`]; this function never
/// returns [`FlushOutcome::Error`].
pub async fn flush_records<O, S>(output: &O, source: &mut S) -> FlushReport
where
    O: Output + ?Sized,
    S: RecordSource + ?Sized,
{
    let started = Instant::now();
    let output_type = output.metadata().output_type;

    let batch = drain_records(source);
    let payload_bytes = batch.payload.len();

    metrics::increment_records_encoded(batch.encoded as u64, &output_type);
    metrics::increment_records_dropped(batch.dropped as u64, &output_type);

    let mut report = FlushReport {
        outcome: FlushOutcome::Ok,
        encoded: batch.encoded,
        dropped: batch.dropped,
        payload_bytes,
        skipped: false,
    };

    if batch.is_empty() && output.skip_empty_batches() {
        debug!("No records to flush, skipping delivery");
        report.skipped = true;
    } else {
        debug!(
            "Delivering {} records ({} bytes, {} dropped)",
            batch.encoded, payload_bytes, batch.dropped
        );

        if let Err(e) = output.write_payload(batch.payload, batch.encoded).await {
            error!(
                retryable = e.is_retryable(),
                "Failed to deliver flush payload: {}", e
            );
            metrics::increment_output_errors(&output_type, e.category());
            report.outcome = FlushOutcome::Retry;
        }
    }

    metrics::increment_flushes(&output_type, report.outcome.as_str());
    metrics::record_flush_duration(started.elapsed(), &output_type);

    report
}
