use std::{io, path::PathBuf};

use thiserror::Error;

use crate::aws::Credentials;

pub mod file;
pub mod key;
pub mod noop;

pub use file::FileCache;
pub use key::{SessionKey, derive_key};
pub use noop::NoopCache;

/// Errors surfaced by the file-backed cache.
/// A missing entry is never an error; a damaged one is.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse cache file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize credentials: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Cache policy, chosen once at startup
#[derive(Debug, Clone)]
pub enum CredentialCache {
    File(FileCache),
    Disabled(NoopCache),
}

impl CredentialCache {
    /// Select the no-op policy when caching is skipped, the file policy otherwise.
    pub fn select(skip_cache: bool, dir: Option<PathBuf>) -> Self {
        if skip_cache {
            Self::Disabled(NoopCache)
        } else {
            Self::File(FileCache::new(dir))
        }
    }

    /// Unexpired credentials stored under `key`, if any
    pub fn read(&self, key: &SessionKey) -> Result<Option<Credentials>, CacheError> {
        match self {
            Self::File(cache) => cache.read(key),
            Self::Disabled(cache) => cache.read(key),
        }
    }

    /// Store `credentials` under `key`, stamping a fresh local expiration
    pub fn write(&self, key: &SessionKey, credentials: &Credentials) -> Result<(), CacheError> {
        match self {
            Self::File(cache) => cache.write(key, credentials),
            Self::Disabled(cache) => cache.write(key, credentials),
        }
    }
}
