use std::{fmt, time::SystemTime};

use async_trait::async_trait;
use aws_smithy_types::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod sts;

pub use sts::StsGateway;

/// AWS temporary credentials structure
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    #[serde(with = "epoch_seconds")]
    pub expiration: DateTime,
}

impl Credentials {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now())
    }

    /// A record whose expiration equals `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime) -> bool {
        self.expiration.secs() <= now.secs()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

pub fn now() -> DateTime {
    DateTime::from(SystemTime::now())
}

mod epoch_seconds {
    use aws_smithy_types::DateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime, D::Error> {
        i64::deserialize(deserializer).map(DateTime::from_secs)
    }
}

/// Role name, account and profile an assumed session belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMetadata {
    pub role_name: String,
    pub account_id: String,
    pub profile_name: String,
}

impl RoleMetadata {
    /// Split `arn:aws:iam::123456789012:role/path/Name` into its role name and account.
    /// Parts that cannot be found are left empty.
    pub fn from_role_arn(role_arn: &str, profile_name: Option<&str>) -> Self {
        let role_name = role_arn
            .rsplit_once('/')
            .map(|(_, name)| name.to_string())
            .unwrap_or_default();

        let account_id = role_arn.split(':').nth(4).unwrap_or_default().to_string();

        Self {
            role_name,
            account_id,
            profile_name: profile_name.unwrap_or_default().to_string(),
        }
    }
}

/// Parameters of a single AssumeRole call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub external_id: Option<String>,
    pub mfa_serial: Option<String>,
    pub mfa_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum AssumeRoleError {
    /// The credentials used to sign the call have expired.
    #[error("credentials used to call STS have expired: {0}")]
    ExpiredToken(String),
    #[error("AssumeRole call failed: {0}")]
    Service(String),
    #[error("AWS STS returned no credentials")]
    MissingCredentials,
    #[error("failed to read MFA token: {0}")]
    MfaPrompt(String),
}

impl AssumeRoleError {
    pub fn is_expired_token(&self) -> bool {
        matches!(self, Self::ExpiredToken(_))
    }
}

/// Issues AssumeRole calls using whatever credentials the default chain resolves.
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(&self, request: &AssumeRoleRequest)
    -> Result<Credentials, AssumeRoleError>;
}

/// Checks a credential set against the live API.
/// Implementations must map every failure to `false`.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn is_valid(&self, credentials: &Credentials) -> bool;
}
