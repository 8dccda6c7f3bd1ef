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

//! Record to JSON encoding.
//!
//! One [`Record`] becomes one line of JSON text. The rules applied on top of
//! plain serialization:
//!
//! - **Bytes** are emitted as a JSON string of the bytes read as UTF-8 text,
//!   never as an array or a base64 envelope, wherever they appear.
//! - **Nested records** recurse with the same rules, at any depth, including
//!   records held in sequences.
//! - **Sequences and scalars** go through the generic [`serde::Serialize`] impl
//!   on [`Value`], which renders bytes the same way.
//!
//! Field order follows the record's insertion order.

use crate::record::{Record, Value};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// Placeholder text for a record that could not be encoded.
///
/// It is never written to a batch; the flush controller drops the record instead.
pub const EMPTY_RECORD: &str = "{}";

/// Errors produced while encoding a single record.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// A float field holds NaN or an infinity.
    #[error("field '{key}' holds a non-finite float, which JSON cannot represent")]
    NonFiniteFloat {
        /// Offending field
        key: String,
    },

    /// The generic serializer rejected a value.
    #[error("failed to serialize field '{key}': {source}")]
    Serialize {
        /// Field whose value failed
        key: String,
        /// Underlying serializer error
        #[source]
        source: serde_json::Error,
    },

    /// Rendering the final JSON text failed.
    #[error("failed to render record as JSON: {0}")]
    Render(#[source] serde_json::Error),
}

/// Encodes a record to a single line of JSON.
///
/// # Errors
///
/// Returns an [`EncodeError`] when a value has no JSON representation. The
/// caller should treat the record as [`EMPTY_RECORD`] and skip it.
pub fn encode_record(record: &Record) -> Result<String, EncodeError> {
    let object = encode_object(record)?;
    serde_json::to_string(&JsonValue::Object(object)).map_err(EncodeError::Render)
}

fn encode_object(record: &Record) -> Result<Map<String, JsonValue>, EncodeError> {
    let mut object = Map::with_capacity(record.len());

    for (key, value) in record.iter() {
        let encoded = match value {
            Value::Bytes(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
            Value::Record(nested) => JsonValue::Object(encode_object(nested)?),
            Value::Float(f) if !f.is_finite() => {
                return Err(EncodeError::NonFiniteFloat {
                    key: key.to_string(),
                })
            }
            other => serde_json::to_value(other).map_err(|source| EncodeError::Serialize {
                key: key.to_string(),
                source,
            })?,
        };

        object.insert(key.to_string(), encoded);
    }

    Ok(object)
}
