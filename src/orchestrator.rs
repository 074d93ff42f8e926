use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::{
    aws::{CredentialValidator, Credentials, RoleAssumer},
    cache::{CredentialCache, SessionKey},
    config::AssumeConfig,
    env::AmbientEnvironment,
};

/// Where the credentials handed back by [`Orchestrator::resolve`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Cache,
    Assumed,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub credentials: Credentials,
    pub source: CredentialSource,
}

/// Decides between cached credentials and a fresh AssumeRole call
pub struct Orchestrator<A, V, E> {
    config: AssumeConfig,
    cache: CredentialCache,
    assumer: A,
    validator: V,
    env: E,
}

impl<A, V, E> Orchestrator<A, V, E>
where
    A: RoleAssumer,
    V: CredentialValidator,
    E: AmbientEnvironment,
{
    pub fn new(
        config: AssumeConfig,
        cache: CredentialCache,
        assumer: A,
        validator: V,
        env: E,
    ) -> Self {
        Self {
            config,
            cache,
            assumer,
            validator,
            env,
        }
    }

    pub async fn resolve(&self) -> Result<Resolved> {
        let key = self.config.session_key();
        debug!("Session key: {}", key);

        let cached = self
            .cache
            .read(&key)
            .context("Failed to read credentials from cache")?;

        let cached = match cached {
            Some(creds) if !creds.is_expired() && !self.config.ignore_cache => creds,
            Some(_) if self.config.ignore_cache => {
                info!("Ignoring cached credentials");
                return self.reassume(&key).await;
            }
            _ => {
                debug!("No usable cached credentials");
                return self.reassume(&key).await;
            }
        };

        if self.validator.is_valid(&cached).await {
            info!("Using cached credentials");
            return Ok(Resolved {
                credentials: cached,
                source: CredentialSource::Cache,
            });
        }

        info!("Cached credentials are no longer valid");
        self.reassume(&key).await
    }

    async fn reassume(&self, key: &SessionKey) -> Result<Resolved> {
        let credentials = self.assume().await.context("Failed to assume role")?;

        self.cache
            .write(key, &credentials)
            .context("Unable to cache credentials")?;

        Ok(Resolved {
            credentials,
            source: CredentialSource::Assumed,
        })
    }

    async fn assume(&self) -> Result<Credentials> {
        let request = self.config.assume_role_request();

        match self.assumer.assume_role(&request).await {
            Err(e) if e.is_expired_token() => {
                debug!("Expired token, clearing ambient credentials and re-assuming role");
                self.env.clear_credentials();
                Ok(self.assumer.assume_role(&request).await?)
            }
            result => Ok(result?),
        }
    }
}
