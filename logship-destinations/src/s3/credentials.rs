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

//! Credential resolution.
//!
//! Precedence, first match wins:
//!
//! 1. `Credential` - path to a shared credentials file, profile `default`
//! 2. `AccessKeyID` / `SecretAccessKey` - a static key pair
//! 3. Nothing configured - the SDK's default provider chain at upload time
//!
//! Branches 1 and 2 are validated eagerly, so a bad file or an incomplete
//! pair fails initialization instead of the first flush.

use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Profile read from the shared credentials file.
pub const SHARED_PROFILE: &str = "default";

const STATIC_PROVIDER_NAME: &str = "logship-static";

/// Errors raised while validating explicit credentials.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The shared credentials file could not provide credentials.
    #[error("failed to load credentials from {path}: {message}")]
    SharedFile {
        /// File that was read
        path: PathBuf,
        /// Provider message
        message: String,
    },

    /// Only one half of the static key pair was given.
    #[error("static credentials require both AccessKeyID and SecretAccessKey")]
    IncompletePair,

    /// The static provider rejected the pair.
    #[error("invalid static credentials: {0}")]
    Static(String),
}

/// Which credentials an operator should use, before validation.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Shared credentials file.
    SharedFile {
        /// Path to the file
        path: PathBuf,
        /// Profile inside the file
        profile: String,
    },

    /// Static key pair from configuration.
    Static {
        /// Access key id
        access_key_id: String,
        /// Secret access key
        secret_access_key: SecretString,
    },

    /// Default provider chain (environment, instance profile, ...).
    Ambient,
}

impl CredentialSource {
    /// Picks the credential branch from raw configuration values.
    ///
    /// A non-empty `credential_file` wins over static keys; if either key is
    /// set the static branch is taken, even when the pair is incomplete.
    #[must_use]
    pub fn select(access_key_id: &str, secret_access_key: &str, credential_file: &str) -> Self {
        if !credential_file.is_empty() {
            return Self::SharedFile {
                path: PathBuf::from(credential_file),
                profile: SHARED_PROFILE.to_string(),
            };
        }

        if !access_key_id.is_empty() || !secret_access_key.is_empty() {
            return Self::Static {
                access_key_id: access_key_id.to_string(),
                secret_access_key: SecretString::from(secret_access_key.to_string()),
            };
        }

        Self::Ambient
    }

    /// Short name of the branch, safe to log.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SharedFile { .. } => "shared_file",
            Self::Static { .. } => "static",
            Self::Ambient => "ambient",
        }
    }

    /// Builds the provider and checks that it can produce credentials.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] when the file cannot provide the profile
    /// or the static pair is incomplete.
    pub async fn resolve(&self) -> Result<ResolvedCredentials, CredentialError> {
        match self {
            Self::SharedFile { path, profile } => {
                let files = ProfileFiles::builder()
                    .with_file(ProfileFileKind::Credentials, path)
                    .build();
                let provider = ProfileFileCredentialsProvider::builder()
                    .profile_files(files)
                    .profile_name(profile)
                    .build();

                provider
                    .provide_credentials()
                    .await
                    .map_err(|e| CredentialError::SharedFile {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;

                debug!("Loaded credentials from {} (profile {})", path.display(), profile);

                Ok(ResolvedCredentials::Explicit {
                    provider: SharedCredentialsProvider::new(provider),
                    source: self.kind(),
                })
            }
            Self::Static {
                access_key_id,
                secret_access_key,
            } => {
                if access_key_id.is_empty() || secret_access_key.expose_secret().is_empty() {
                    return Err(CredentialError::IncompletePair);
                }

                let credentials = Credentials::new(
                    access_key_id.clone(),
                    secret_access_key.expose_secret().to_string(),
                    None,
                    None,
                    STATIC_PROVIDER_NAME,
                );
                credentials
                    .provide_credentials()
                    .await
                    .map_err(|e| CredentialError::Static(e.to_string()))?;

                Ok(ResolvedCredentials::Explicit {
                    provider: SharedCredentialsProvider::new(credentials),
                    source: self.kind(),
                })
            }
            Self::Ambient => Ok(ResolvedCredentials::Ambient),
        }
    }
}

/// Validated credentials handed to the object store.
#[derive(Debug, Clone)]
pub enum ResolvedCredentials {
    /// A provider built from configuration.
    Explicit {
        /// Provider passed to the SDK client
        provider: SharedCredentialsProvider,
        /// Branch that produced it
        source: &'static str,
    },

    /// No explicit credentials; the SDK discovers them at upload time.
    Ambient,
}

impl ResolvedCredentials {
    /// The explicit provider, if any.
    #[must_use]
    pub fn provider(&self) -> Option<SharedCredentialsProvider> {
        match self {
            Self::Explicit { provider, .. } => Some(provider.clone()),
            Self::Ambient => None,
        }
    }

    /// Whether the default provider chain will be used.
    #[must_use]
    pub const fn is_ambient(&self) -> bool {
        matches!(self, Self::Ambient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_file_wins_over_static_keys() {
        let source = CredentialSource::select("AKID", "SECRET", "/tmp/credentials");
        assert!(matches!(
            source,
            CredentialSource::SharedFile { ref profile, .. } if profile == SHARED_PROFILE
        ));
    }

    #[test]
    fn test_static_when_any_key_is_set() {
        assert_eq!(CredentialSource::select("AKID", "SECRET", "").kind(), "static");
        assert_eq!(CredentialSource::select("AKID", "", "").kind(), "static");
        assert_eq!(CredentialSource::select("", "SECRET", "").kind(), "static");
    }

    #[test]
    fn test_ambient_when_nothing_is_set() {
        assert_eq!(CredentialSource::select("", "", "").kind(), "ambient");
    }

    #[test]
    fn test_secret_is_not_in_debug_output() {
        let source = CredentialSource::select("AKID", "very-secret-value", "");
        assert!(!format!("{source:?}").contains("very-secret-value"));
    }

    #[tokio::test]
    async fn test_resolve_static_pair() {
        let resolved = CredentialSource::select("AKID", "SECRET", "")
            .resolve()
            .await
            .unwrap();

        let credentials = resolved
            .provider()
            .unwrap()
            .provide_credentials()
            .await
            .unwrap();
        assert_eq!(credentials.access_key_id(), "AKID");
        assert_eq!(credentials.secret_access_key(), "SECRET");
    }

    #[tokio::test]
    async fn test_resolve_incomplete_pair_fails() {
        let err = CredentialSource::select("AKID", "", "")
            .resolve()
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::IncompletePair));
    }

    #[tokio::test]
    async fn test_resolve_ambient() {
        let resolved = CredentialSource::Ambient.resolve().await.unwrap();
        assert!(resolved.is_ambient());
        assert!(resolved.provider().is_none());
    }
}
