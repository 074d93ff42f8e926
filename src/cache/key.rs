use std::fmt;

use sha2::{Digest, Sha256};

/// Cache lookup key for a (role ARN, profile) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 over `role_arn`, a NUL byte and `profile`, hex encoded.
pub fn derive_key(role_arn: &str, profile: &str) -> SessionKey {
    let mut hasher = Sha256::new();
    hasher.update(role_arn.as_bytes());
    hasher.update([0u8]);
    hasher.update(profile.as_bytes());
    SessionKey(format!("{:x}", hasher.finalize()))
}
