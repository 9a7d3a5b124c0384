//! Publication of written tables to the object store.
//!
//! A [`Publisher`] is connected once per run, before any input is read, so that a
//! credential problem aborts the run without leaving partial output behind. It is
//! then passed to whichever stage uploads files.

pub mod credentials;
pub mod store;

use std::path::{Path, PathBuf};

pub use credentials::{CredentialRecord, CredentialStore, Credentials, JsonCredentialStore};
pub use store::{LocalObjectStore, ObjectStore};

use crate::config::PublishConfig;
use crate::error::{Result, RollupError};

/// Namespace that always holds the most recent upload
pub const LATEST_PREFIX: &str = "latest";

/// Validated handle for uploading to the configured bucket
pub struct Publisher {
    store: Box<dyn ObjectStore>,
    credentials: Credentials,
    bucket: String,
    date_slug: String,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("credentials", &self.credentials)
            .field("bucket", &self.bucket)
            .field("date_slug", &self.date_slug)
            .finish_non_exhaustive()
    }
}

impl Publisher {
    /// Fetch and validate credentials, then bind them to an object store
    ///
    /// # Arguments
    /// * `store` - Destination for uploads
    /// * `credential_store` - Where the credential record is kept
    /// * `config` - Expected identity and target bucket
    /// * `date_slug` - `YYYYMMDD` namespace for this run's uploads
    ///
    /// # Errors
    /// Returns `Config` if the credential record does not match `config`, or the
    /// lookup error if the record cannot be read
    pub fn connect(
        store: Box<dyn ObjectStore>,
        credential_store: &dyn CredentialStore,
        config: &PublishConfig,
        date_slug: impl Into<String>,
    ) -> Result<Self> {
        log::info!(
            "Fetching credentials for user {} on bucket {}",
            config.username,
            config.bucket
        );
        let record = credential_store.fetch(config)?;
        let credentials = Credentials::validate(record, config)?;
        log::debug!("Using access key {} for bucket {}", credentials.access_key, config.bucket);
        Ok(Self {
            store,
            credentials,
            bucket: config.bucket.clone(),
            date_slug: date_slug.into(),
        })
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key namespaces every file is uploaded to
    #[must_use]
    pub fn prefixes(&self) -> [&str; 2] {
        [LATEST_PREFIX, self.date_slug.as_str()]
    }

    /// Upload files under `latest/` and the dated namespace, keyed by file name
    ///
    /// # Returns
    /// The keys written, in upload order
    ///
    /// # Errors
    /// Returns an error on the first failed upload
    pub fn publish_files(&self, files: &[PathBuf]) -> Result<Vec<String>> {
        log::info!("Writing {} file(s) to bucket {}", files.len(), self.bucket);
        let mut keys = Vec::with_capacity(files.len() * 2);
        for prefix in self.prefixes() {
            for file in files {
                let key = object_key(prefix, file)?;
                log::info!("Writing file ({}) to key {key}", file.display());
                self.store.put_file(&self.bucket, &key, file)?;
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// Object key for a file: its name with spaces replaced, under `prefix`
///
/// # Errors
/// Returns `Publish` if the path has no usable file name
pub fn object_key(prefix: &str, file: &Path) -> Result<String> {
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RollupError::Publish {
            key: format!("{prefix}/?"),
            message: format!("no file name in {}", file.display()),
        })?;
    Ok(format!("{prefix}/{}", name.replace(' ', "_")))
}
