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

//! Payload compression.

use crate::s3::config::Compression;
use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::{Compression as GzLevel, GzBuilder};
use logship_core::output::OutputError;
use std::io::{Read, Write};

/// File name stored in the gzip header.
pub const GZIP_FILE_NAME: &str = "logship-s3";

/// Compresses a payload with the configured algorithm.
///
/// [`Compression::None`] returns the payload unchanged.
///
/// # Errors
///
/// Returns [`OutputError::CompressionError`] if the encoder fails.
pub fn compress(data: Vec<u8>, compression: Compression) -> Result<Vec<u8>, OutputError> {
    match compression {
        Compression::None => Ok(data),
        Compression::Gzip => compress_gzip(&data),
    }
}

fn compress_gzip(data: &[u8]) -> Result<Vec<u8>, OutputError> {
    let mtime = u32::try_from(Utc::now().timestamp()).unwrap_or(0);

    let mut encoder = GzBuilder::new()
        .filename(GZIP_FILE_NAME)
        .mtime(mtime)
        .write(Vec::with_capacity(data.len() / 4), GzLevel::default());

    encoder
        .write_all(data)
        .map_err(|e| OutputError::compression(e, "Failed to compress with gzip"))?;

    encoder
        .finish()
        .map_err(|e| OutputError::compression(e, "Failed to finalize gzip compression"))
}

/// Decompresses a gzip stream.
///
/// # Errors
///
/// Returns [`OutputError::CompressionError`] for corrupt input.
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>, OutputError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| OutputError::compression(e, "Failed to decompress gzip"))?;
    Ok(out)
}
