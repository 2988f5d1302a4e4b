//! File-backed store of captured responses
//!
//! One file per [`CacheKey`] under the cache directory. There is no in-memory
//! index: every lookup and write goes to disk, so wiping the directory is all
//! it takes to clear the cache.

use crate::proxy::codec::{CodecError, ResponseCodec};
use crate::proxy::fingerprint::CacheKey;
use crate::proxy::types::CachedResponse;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure to persist a record
#[derive(Error, Debug)]
pub enum CacheStoreError {
    #[error("Failed to encode record for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Directory of response records
#[derive(Clone, Debug)]
pub struct CacheStore {
    directory: PathBuf,
}

impl CacheStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.directory.join(key.file_name())
    }

    /// Absent or unreadable records are misses, never errors
    pub async fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        let path = self.path_for(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(%key, "No cache record");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache record treated as miss");
                return None;
            }
        };

        match ResponseCodec::decode(&bytes) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache record treated as miss");
                None
            }
        }
    }

    /// Creates or fully overwrites the record for `key`
    pub async fn put(&self, key: &CacheKey, response: &CachedResponse) -> Result<(), CacheStoreError> {
        let bytes = ResponseCodec::encode(response).map_err(|source| CacheStoreError::Encode {
            key: key.to_string(),
            source,
        })?;

        let path = self.path_for(key);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| CacheStoreError::Write { path, source })
    }
}
