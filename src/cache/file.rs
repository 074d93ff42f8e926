use std::{
    fs, io,
    path::{Path, PathBuf},
};

use aws_smithy_types::DateTime;
use tracing::{debug, error};

use super::{CacheError, SessionKey};
use crate::{
    aws::{self, Credentials},
    constants::{CACHE_FILE_PREFIX, CACHE_TTL},
};

/// One JSON file per session key in the per-user cache directory
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: Option<PathBuf>,
}

impl FileCache {
    /// `dir` is `None` when no cache directory could be determined;
    /// the cache then behaves as permanently empty.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn read(&self, key: &SessionKey) -> Result<Option<Credentials>, CacheError> {
        self.read_at(key, aws::now())
    }

    pub fn write(&self, key: &SessionKey, credentials: &Credentials) -> Result<(), CacheError> {
        self.write_at(key, credentials, aws::now())
    }

    pub(crate) fn read_at(
        &self,
        key: &SessionKey,
        now: DateTime,
    ) -> Result<Option<Credentials>, CacheError> {
        let Some(dir) = self.dir.as_deref() else {
            error!("Failed to determine the user cache directory, skipping cache read");
            return Ok(None);
        };

        let path = entry_path(dir, key);
        debug!("Reading cached credentials from {}", path.display());

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cache entry found");
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Read { path, source }),
        };

        let credentials: Credentials = serde_json::from_str(&contents)
            .map_err(|source| CacheError::Parse { path, source })?;

        if credentials.is_expired_at(now) {
            debug!("Cache entry expired");
            return Ok(None);
        }

        Ok(Some(credentials))
    }

    pub(crate) fn write_at(
        &self,
        key: &SessionKey,
        credentials: &Credentials,
        now: DateTime,
    ) -> Result<(), CacheError> {
        let Some(dir) = self.dir.as_deref() else {
            error!("Failed to determine the user cache directory, credentials not cached");
            return Ok(());
        };

        fs::create_dir_all(dir).map_err(|source| CacheError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        // Local lifetime, independent of the expiry STS reported
        let record = Credentials {
            expiration: DateTime::from_secs(now.secs() + CACHE_TTL.as_secs() as i64),
            ..credentials.clone()
        };
        let contents = serde_json::to_string(&record).map_err(CacheError::Serialize)?;

        let path = entry_path(dir, key);
        fs::write(&path, contents).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).map_err(|source| {
                CacheError::Write {
                    path: path.clone(),
                    source,
                }
            })?;
        }

        debug!("Credentials cached at {}", path.display());
        Ok(())
    }
}

fn entry_path(dir: &Path, key: &SessionKey) -> PathBuf {
    dir.join(format!("{CACHE_FILE_PREFIX}{key}"))
}
