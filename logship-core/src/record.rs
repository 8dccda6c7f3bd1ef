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

//! Log Record Representation
//!
//! Records arrive from the host as loosely-typed key/value maps. This module gives
//! them a closed, statically checked shape: a [`Record`] is an ordered list of
//! string-keyed [`Value`]s, and a [`Value`] is one of a fixed set of variants.
//!
//! # Examples
//!
//! ```rust
//! use logship_core::record::{EventTime, Record, Value};
//!
//! let record = Record::new()
//!     .with_field("log", Value::Bytes(b"GET /health 200".to_vec()))
//!     .with_field("kubernetes", Record::new().with_field("pod", "api-0"));
//!
//! assert_eq!(record.len(), 2);
//! assert!(matches!(record.get("kubernetes"), Some(Value::Record(_))));
//!
//! let ts = EventTime::EpochSeconds(1_552_212_672).resolve();
//! assert_eq!(ts.timestamp(), 1_552_212_672);
//! ```

use chrono::{DateTime, Utc};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A single value inside a log record.
///
/// The variants mirror what a MessagePack-decoded log record can carry. Binary
/// payloads are kept as raw bytes; the encoder decides how they are rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null
    Nil,

    /// Boolean flag
    Bool(bool),

    /// Signed integer
    Integer(i64),

    /// Unsigned integer too large for `i64`, or delivered unsigned by the host
    Unsigned(u64),

    /// Floating point number
    Float(f64),

    /// UTF-8 text
    String(String),

    /// Raw bytes (most log lines arrive this way)
    Bytes(Vec<u8>),

    /// Nested record
    Record(Record),

    /// Ordered list of values
    Sequence(Vec<Value>),
}

impl Value {
    /// Returns a short name for the variant, used in log messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Unsigned(_) => "unsigned",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Record(_) => "record",
            Self::Sequence(_) => "sequence",
        }
    }
}

/// Generic serialization, used for sequences and scalars.
///
/// Bytes are rendered as UTF-8 text (lossy), never as an array or base64, so
/// records nested inside sequences follow the same rules as top-level ones.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Nil => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Unsigned(u) => serializer.serialize_u64(*u),
            Self::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Self::Float(f) => Err(S::Error::custom(format!(
                "non-finite float {f} has no JSON representation"
            ))),
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            Self::Record(r) => r.serialize(serializer),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Sequence(value)
    }
}

/// An ordered, string-keyed log record.
///
/// Field order is insertion order. Inserting an existing key replaces its value
/// in place, matching map semantics on the host side.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a field, returning the previous value for the key if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();

        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }

        self.fields.push((key, value));
        None
    }

    /// Looks up a field by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Timestamp delivered by the host alongside each record.
///
/// Hosts are not consistent about the timestamp type they hand out, so every
/// shape seen in practice is accepted and normalized by [`EventTime::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// Host time handle (seconds + nanoseconds since the epoch)
    Fluent(DateTime<Utc>),

    /// Raw integer seconds since the epoch
    EpochSeconds(u64),

    /// A timestamp type this crate does not recognize
    Unknown,
}

impl EventTime {
    /// Normalizes the timestamp to UTC, falling back to the current time when
    /// the value is unrecognized or out of range.
    #[must_use]
    pub fn resolve(&self) -> DateTime<Utc> {
        match self {
            Self::Fluent(ts) => *ts,
            Self::EpochSeconds(secs) => i64::try_from(*secs)
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now),
            Self::Unknown => Utc::now(),
        }
    }
}
