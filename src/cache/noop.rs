use super::{CacheError, SessionKey};
use crate::aws::Credentials;

/// Cache that never stores anything, used with `--skip-cache`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    pub fn read(&self, _key: &SessionKey) -> Result<Option<Credentials>, CacheError> {
        Ok(None)
    }

    pub fn write(&self, _key: &SessionKey, _credentials: &Credentials) -> Result<(), CacheError> {
        Ok(())
    }
}
