//! Object store destinations for published files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, RollupError};

/// Key/value file store organised in buckets
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` under `key` in `bucket`, replacing any existing object
    ///
    /// # Errors
    /// Returns `Publish` if the upload fails
    fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;
}

/// Object store that mirrors keys into `<root>/<bucket>/<key>` on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem location of an object
    #[must_use]
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.root.join(bucket);
        path.extend(key.split('/').filter(|part| !part.is_empty()));
        path
    }
}

impl ObjectStore for LocalObjectStore {
    fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        if key.split('/').any(|part| part == "..") {
            return Err(RollupError::Publish {
                key: key.to_string(),
                message: "key must not leave the bucket".to_string(),
            });
        }

        let target = self.object_path(bucket, key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| RollupError::io(parent, e))?;
        }
        fs::copy(path, &target).map_err(|e| RollupError::Publish {
            key: key.to_string(),
            message: format!("copying {}: {e}", path.display()),
        })?;
        Ok(())
    }
}
