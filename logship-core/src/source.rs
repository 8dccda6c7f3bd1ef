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

//! Record sources.
//!
//! The host runtime decodes its wire batches and hands records out one at a
//! time. [`RecordSource`] is that iterator seen from this side; the host
//! adapter implements it, tests use [`MemoryRecordSource`].

use crate::record::{EventTime, Record};
use std::collections::VecDeque;

/// Pull-based iterator over the records of one host batch.
pub trait RecordSource {
    /// Returns the next record, or `None` once the batch is exhausted.
    fn next_record(&mut self) -> Option<(EventTime, Record)>;
}

/// In-memory record source backed by a queue.
///
/// # Examples
///
/// ```rust
/// use logship_core::record::{EventTime, Record};
/// use logship_core::source::{MemoryRecordSource, RecordSource};
///
/// let mut source = MemoryRecordSource::new();
/// source.push(EventTime::Unknown, Record::new().with_field("mykey", "myvalue"));
///
/// assert!(source.next_record().is_some());
/// assert!(source.next_record().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    records: VecDeque<(EventTime, Record)>,
}

impl MemoryRecordSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record to the end of the batch.
    pub fn push(&mut self, time: EventTime, record: Record) {
        self.records.push_back((time, record));
    }

    /// Records not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl FromIterator<(EventTime, Record)> for MemoryRecordSource {
    fn from_iter<I: IntoIterator<Item = (EventTime, Record)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl RecordSource for MemoryRecordSource {
    fn next_record(&mut self) -> Option<(EventTime, Record)> {
        self.records.pop_front()
    }
}
