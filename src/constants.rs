use std::{env, path::PathBuf, time::Duration};

use dirs;

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS configuration file name
pub const AWS_CONFIG_FILE_NAME: &str = "config";

/// Default AWS region for STS operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Default role session name passed to AssumeRole
pub const DEFAULT_SESSION_NAME: &str = "assumed-role";

/// Prefix of every cache entry file name
pub const CACHE_FILE_PREFIX: &str = "assume-role-";

/// Lifetime of a cache entry, counted from the moment it is written
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Overrides the directory cache entries are stored in
pub const CACHE_DIR_ENV: &str = "ASSUME_ROLE_ARN_CACHE_DIR";

pub const ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
pub const ROLE_NAME_ENV: &str = "AWS_ROLE_NAME";
pub const ACCOUNT_ID_ENV: &str = "AWS_ACCOUNT_ID";
pub const PROFILE_NAME_ENV: &str = "AWS_PROFILE_NAME";

/// Variables cleared before re-assuming a role after an expired-token failure
pub const AMBIENT_CREDENTIAL_ENVS: [&str; 6] = [
    ACCESS_KEY_ID_ENV,
    SECRET_ACCESS_KEY_ENV,
    SESSION_TOKEN_ENV,
    ROLE_NAME_ENV,
    ACCOUNT_ID_ENV,
    PROFILE_NAME_ENV,
];

/// Get the AWS config file path
/// Respects AWS_CONFIG_FILE environment variable if set
pub fn get_aws_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join(AWS_CONFIG_FILE_NAME))
}

/// Get the directory cache entries live in
/// Respects ASSUME_ROLE_ARN_CACHE_DIR environment variable if set
pub fn get_cache_dir() -> Option<PathBuf> {
    if let Ok(path) = env::var(CACHE_DIR_ENV) {
        return Some(PathBuf::from(path));
    }

    dirs::cache_dir()
}
