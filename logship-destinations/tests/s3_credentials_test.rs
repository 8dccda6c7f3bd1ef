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

//! Tests for credential resolution.

#![cfg(feature = "s3")]

use aws_credential_types::provider::ProvideCredentials;
use logship_destinations::s3::{CredentialError, CredentialSource};
use std::io::Write;
use tempfile::NamedTempFile;

fn credentials_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_shared_file_default_profile() {
    let file = credentials_file(
        "[default]\naws_access_key_id = FILEKEY\naws_secret_access_key = FILESECRET\n\n\
         [other]\naws_access_key_id = OTHERKEY\naws_secret_access_key = OTHERSECRET\n",
    );
    let path = file.path().to_str().unwrap();

    let resolved = CredentialSource::select("AKID", "SECRET", path)
        .resolve()
        .await
        .unwrap();

    let credentials = resolved
        .provider()
        .unwrap()
        .provide_credentials()
        .await
        .unwrap();
    assert_eq!(credentials.access_key_id(), "FILEKEY");
    assert_eq!(credentials.secret_access_key(), "FILESECRET");
}

#[tokio::test]
async fn test_shared_file_missing_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist");

    let err = CredentialSource::select("", "", path.to_str().unwrap())
        .resolve()
        .await
        .unwrap_err();

    assert!(matches!(err, CredentialError::SharedFile { .. }));
}

#[tokio::test]
async fn test_shared_file_without_default_profile_is_error() {
    let file = credentials_file(
        "[other]\naws_access_key_id = OTHERKEY\naws_secret_access_key = OTHERSECRET\n",
    );

    let err = CredentialSource::select("", "", file.path().to_str().unwrap())
        .resolve()
        .await
        .unwrap_err();

    assert!(matches!(err, CredentialError::SharedFile { .. }));
}

#[tokio::test]
async fn test_static_keys_used_without_file() {
    let resolved = CredentialSource::select("AKID", "SECRET", "")
        .resolve()
        .await
        .unwrap();

    assert!(!resolved.is_ambient());
}

#[tokio::test]
async fn test_incomplete_static_pair_is_error() {
    let err = CredentialSource::select("", "SECRET", "")
        .resolve()
        .await
        .unwrap_err();

    assert!(matches!(err, CredentialError::IncompletePair));
}

#[tokio::test]
async fn test_nothing_configured_is_ambient() {
    let resolved = CredentialSource::select("", "", "").resolve().await.unwrap();
    assert!(resolved.is_ambient());
}
