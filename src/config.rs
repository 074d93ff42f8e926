use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ini::{Ini, Properties};
use tracing::debug;

use crate::{
    aws::{AssumeRoleRequest, RoleMetadata},
    cache::{SessionKey, derive_key},
    cli::RoleArgs,
    constants,
};

/// Role settings read from a profile section of the AWS config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsProfile {
    pub role_arn: Option<String>,
    pub source_profile: Option<String>,
    pub external_id: Option<String>,
    pub region: Option<String>,
    pub mfa_serial: Option<String>,
}

impl AwsProfile {
    fn from_ini_section(section: &Properties) -> Self {
        let get = |key: &str| {
            section
                .get(key)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(String::from)
        };

        Self {
            role_arn: get("role_arn"),
            source_profile: get("source_profile"),
            external_id: get("external_id"),
            region: get("region"),
            mfa_serial: get("mfa_serial"),
        }
    }
}

/// Load `profile` from the AWS config file.
///
/// A missing or unreadable file, or a missing section, yields `None`: the
/// name is then only handed to the SDK as a credentials profile.
pub fn load_profile(profile: &str) -> Option<AwsProfile> {
    let path = get_config_path()?;
    load_profile_from(&path, profile)
}

fn load_profile_from(path: &Path, profile: &str) -> Option<AwsProfile> {
    let ini = match Ini::load_from_file(path) {
        Ok(ini) => ini,
        Err(e) => {
            debug!("Failed to load AWS config {}: {}", path.display(), e);
            return None;
        }
    };

    let section_name = if profile == "default" {
        profile.to_string()
    } else {
        format!("profile {profile}")
    };

    let Some(section) = ini.section(Some(section_name.as_str())) else {
        debug!("Profile '{}' not found in {}", profile, path.display());
        return None;
    };

    let aws_profile = AwsProfile::from_ini_section(section);
    debug!("Loaded AWS profile '{}': {:?}", profile, aws_profile);
    Some(aws_profile)
}

fn get_config_path() -> Option<PathBuf> {
    constants::get_aws_config_path()
}

/// Everything one invocation needs, fixed before any cache or network access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeConfig {
    pub role_arn: String,
    pub session_name: String,
    pub external_id: Option<String>,
    /// Profile name as given by the user; part of the cache key
    pub profile: Option<String>,
    /// Profile the SDK resolves base credentials from
    pub sdk_profile: Option<String>,
    pub region: Option<String>,
    pub mfa_serial: Option<String>,
    pub mfa_token: Option<String>,
    pub ignore_cache: bool,
    pub skip_cache: bool,
}

impl AssumeConfig {
    /// Merge command-line options with the profile section. Explicit options win.
    pub fn resolve(
        args: &RoleArgs,
        ignore_cache: bool,
        skip_cache: bool,
        aws_profile: Option<AwsProfile>,
    ) -> Result<Self> {
        let profile = args.profile.clone().filter(|p| !p.is_empty());

        // A profile without a config section is used directly as the SDK profile
        let (from_file, sdk_profile) = match aws_profile {
            Some(found) => {
                let sdk_profile = found.source_profile.clone();
                (found, sdk_profile)
            }
            None => (AwsProfile::default(), profile.clone()),
        };

        let role_arn = args
            .role_arn
            .clone()
            .filter(|arn| !arn.is_empty())
            .or(from_file.role_arn)
            .context("Role ARN cannot be empty: pass --role or a profile with role_arn")?;

        Ok(Self {
            role_arn,
            session_name: args.session_name.clone(),
            external_id: args.external_id.clone().or(from_file.external_id),
            profile,
            sdk_profile,
            region: from_file.region,
            mfa_serial: args.mfa_serial.clone().or(from_file.mfa_serial),
            mfa_token: args.mfa_token.clone(),
            ignore_cache,
            skip_cache,
        })
    }

    pub fn session_key(&self) -> SessionKey {
        derive_key(&self.role_arn, self.profile.as_deref().unwrap_or_default())
    }

    pub fn assume_role_request(&self) -> AssumeRoleRequest {
        AssumeRoleRequest {
            role_arn: self.role_arn.clone(),
            session_name: self.session_name.clone(),
            external_id: self.external_id.clone(),
            mfa_serial: self.mfa_serial.clone(),
            mfa_token: self.mfa_token.clone(),
        }
    }

    pub fn role_metadata(&self) -> RoleMetadata {
        RoleMetadata::from_role_arn(&self.role_arn, self.profile.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_SESSION_NAME;
    use std::fs;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
[default]
region = eu-west-1

[profile prod]
role_arn = arn:aws:iam::123456789012:role/Admin
source_profile = base
external_id = ext-123
region = eu-central-1
mfa_serial = arn:aws:iam::111111111111:mfa/me

[profile empty]
role_arn =
"#;

    fn role_args(role_arn: Option<&str>, profile: Option<&str>) -> RoleArgs {
        RoleArgs {
            role_arn: role_arn.map(String::from),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            external_id: None,
            profile: profile.map(String::from),
            mfa_serial: None,
            mfa_token: None,
        }
    }

    fn write_config() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, CONFIG).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_named_profile() {
        let (_dir, path) = write_config();
        let profile = load_profile_from(&path, "prod").unwrap();

        assert_eq!(
            profile.role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/Admin")
        );
        assert_eq!(profile.source_profile.as_deref(), Some("base"));
        assert_eq!(profile.external_id.as_deref(), Some("ext-123"));
        assert_eq!(profile.region.as_deref(), Some("eu-central-1"));
        assert_eq!(
            profile.mfa_serial.as_deref(),
            Some("arn:aws:iam::111111111111:mfa/me")
        );
    }

    #[test]
    fn test_load_default_profile_section() {
        let (_dir, path) = write_config();
        let profile = load_profile_from(&path, "default").unwrap();

        assert_eq!(profile.region.as_deref(), Some("eu-west-1"));
        assert_eq!(profile.role_arn, None);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let (_dir, path) = write_config();
        let profile = load_profile_from(&path, "empty").unwrap();
        assert_eq!(profile.role_arn, None);
    }

    #[test]
    fn test_missing_profile_or_file_is_none() {
        let (dir, path) = write_config();
        assert!(load_profile_from(&path, "staging").is_none());
        assert!(load_profile_from(&dir.path().join("nope"), "prod").is_none());
    }

    #[test]
    fn test_resolve_from_profile() {
        let (_dir, path) = write_config();
        let aws_profile = load_profile_from(&path, "prod");
        let config =
            AssumeConfig::resolve(&role_args(None, Some("prod")), false, false, aws_profile)
                .unwrap();

        assert_eq!(config.role_arn, "arn:aws:iam::123456789012:role/Admin");
        assert_eq!(config.profile.as_deref(), Some("prod"));
        assert_eq!(config.sdk_profile.as_deref(), Some("base"));
        assert_eq!(config.region.as_deref(), Some("eu-central-1"));
        assert_eq!(config.external_id.as_deref(), Some("ext-123"));
        assert_eq!(config.session_name, DEFAULT_SESSION_NAME);
    }

    #[test]
    fn test_resolve_flags_override_profile() {
        let aws_profile = AwsProfile {
            role_arn: Some("arn:aws:iam::123456789012:role/FromFile".to_string()),
            external_id: Some("file-ext".to_string()),
            mfa_serial: Some("file-mfa".to_string()),
            ..AwsProfile::default()
        };
        let mut args = role_args(Some("arn:aws:iam::123456789012:role/FromFlag"), Some("prod"));
        args.external_id = Some("flag-ext".to_string());
        args.mfa_serial = Some("flag-mfa".to_string());
        args.mfa_token = Some("123456".to_string());

        let config = AssumeConfig::resolve(&args, true, true, Some(aws_profile)).unwrap();

        assert_eq!(config.role_arn, "arn:aws:iam::123456789012:role/FromFlag");
        assert_eq!(config.external_id.as_deref(), Some("flag-ext"));
        assert_eq!(config.mfa_serial.as_deref(), Some("flag-mfa"));
        assert_eq!(config.mfa_token.as_deref(), Some("123456"));
        assert_eq!(config.sdk_profile, None);
        assert!(config.ignore_cache);
        assert!(config.skip_cache);
    }

    #[test]
    fn test_resolve_profile_without_section_is_sdk_profile() {
        let config = AssumeConfig::resolve(
            &role_args(Some("arn:aws:iam::123456789012:role/Admin"), Some("sso")),
            false,
            false,
            None,
        )
        .unwrap();

        assert_eq!(config.sdk_profile.as_deref(), Some("sso"));
        assert_eq!(config.region, None);
    }

    #[test]
    fn test_resolve_requires_role_arn() {
        let result = AssumeConfig::resolve(&role_args(None, Some("dev")), false, false, None);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Role ARN cannot be empty")
        );
    }

    #[test]
    fn test_session_key_depends_on_profile() {
        let arn = Some("arn:aws:iam::123456789012:role/Admin");
        let plain = AssumeConfig::resolve(&role_args(arn, None), false, false, None).unwrap();
        let prod =
            AssumeConfig::resolve(&role_args(arn, Some("prod")), false, false, None).unwrap();

        assert_eq!(plain.session_key(), derive_key(&plain.role_arn, ""));
        assert_ne!(plain.session_key(), prod.session_key());
    }

    #[test]
    fn test_assume_role_request_and_metadata() {
        let mut args = role_args(Some("arn:aws:iam::123456789012:role/Admin"), Some("prod"));
        args.session_name = "ci".to_string();
        let config = AssumeConfig::resolve(&args, false, false, None).unwrap();

        let request = config.assume_role_request();
        assert_eq!(request.role_arn, config.role_arn);
        assert_eq!(request.session_name, "ci");

        let meta = config.role_metadata();
        assert_eq!(meta.role_name, "Admin");
        assert_eq!(meta.account_id, "123456789012");
        assert_eq!(meta.profile_name, "prod");
    }
}
