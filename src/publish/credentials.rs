//! Credential lookup for the object store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::PublishConfig;
use crate::error::{Result, RollupError};

/// Stored credential document, as kept in the credential bucket
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CredentialRecord {
    pub username: String,
    #[serde(rename = "aws-region")]
    pub region: String,
    #[serde(rename = "bucketname")]
    pub bucket: String,
    #[serde(rename = "aws-access-key")]
    pub access_key: String,
    #[serde(rename = "aws-secret-access-key")]
    pub secret_access_key: String,
}

/// Source of credential records
pub trait CredentialStore {
    /// Fetch the record stored for `username` and `bucket`
    ///
    /// # Errors
    /// Returns an error if the record cannot be found or parsed
    fn fetch(&self, config: &PublishConfig) -> Result<CredentialRecord>;
}

/// Credential store backed by JSON files laid out as
/// `<root>/<credential_bucket>/<bucket>/<username>.json`
#[derive(Debug, Clone)]
pub struct JsonCredentialStore {
    root: PathBuf,
}

impl JsonCredentialStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of the record for a publish configuration
    #[must_use]
    pub fn record_path(&self, config: &PublishConfig) -> PathBuf {
        self.root
            .join(&config.credential_bucket)
            .join(&config.bucket)
            .join(format!("{}.json", config.username))
    }
}

impl CredentialStore for JsonCredentialStore {
    fn fetch(&self, config: &PublishConfig) -> Result<CredentialRecord> {
        let path = self.record_path(config);
        read_record(&path)
    }
}

fn read_record(path: &Path) -> Result<CredentialRecord> {
    let content = fs::read_to_string(path).map_err(|e| RollupError::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Validated access keys for the configured bucket
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub access_key: String,
    secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("access_key", &self.access_key)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Check a record against the configured identity and keep its keys
    ///
    /// # Errors
    /// Returns `Config` naming the expected and actual value for the first
    /// mismatching username, region or bucket
    pub fn validate(record: CredentialRecord, config: &PublishConfig) -> Result<Self> {
        if record.username != config.username {
            return Err(RollupError::Config(format!(
                "read credentials for wrong user (tried {} got {})",
                config.username, record.username
            )));
        }
        if record.region != config.region {
            return Err(RollupError::Config(format!(
                "credentials region mismatch for user {} (wanted {} got {})",
                config.username, config.region, record.region
            )));
        }
        if record.bucket != config.bucket {
            return Err(RollupError::Config(format!(
                "credentials bucket mismatch for user {} (wanted {} got {})",
                config.username, config.bucket, record.bucket
            )));
        }
        Ok(Self {
            username: record.username,
            access_key: record.access_key,
            secret_access_key: record.secret_access_key,
        })
    }

    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}
