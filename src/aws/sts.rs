use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::{
    Client as StsClient,
    config::Credentials as StaticCredentials,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::assume_role::AssumeRoleError as SdkAssumeRoleError,
};
use dialoguer::{Input, theme::ColorfulTheme};
use tracing::{debug, info};

use super::{AssumeRoleError, AssumeRoleRequest, CredentialValidator, Credentials, RoleAssumer};
use crate::constants::DEFAULT_AWS_REGION;

/// Error codes STS uses when the signing credentials are past their expiry
const EXPIRED_TOKEN_CODES: [&str; 2] = ["ExpiredToken", "ExpiredTokenException"];

/// Provider name attached to cached credentials handed to the SDK
const CACHED_PROVIDER_NAME: &str = "assume-role-arn-cache";

/// STS-backed role assumption and credential validation
#[derive(Debug, Default)]
pub struct StsGateway {
    profile: Option<String>,
    region: Option<String>,
    prompted_token: Mutex<Option<String>>,
}

impl StsGateway {
    /// `profile` selects the SDK profile for base credentials, `region` pins the STS region.
    pub fn new(profile: Option<String>, region: Option<String>) -> Self {
        Self {
            profile,
            region,
            prompted_token: Mutex::new(None),
        }
    }

    // Priority: explicit region -> ENV vars -> Config file -> DEFAULT_AWS_REGION
    async fn load_config(&self, credentials: Option<StaticCredentials>) -> SdkConfig {
        let loader = || {
            let mut builder = aws_config::defaults(BehaviorVersion::latest());
            if let Some(profile) = &self.profile {
                builder = builder.profile_name(profile);
            }
            if let Some(credentials) = credentials.clone() {
                builder = builder.credentials_provider(credentials);
            }
            builder
        };

        if let Some(region) = &self.region {
            debug!("Using region: {}", region);
            return loader().region(Region::new(region.clone())).load().await;
        }

        let loaded = loader().load().await;
        match loaded.region() {
            Some(region) => {
                debug!("Using region: {}", region);
                loaded
            }
            None => {
                debug!(
                    "No region configured, using default {} for STS",
                    DEFAULT_AWS_REGION
                );
                loader()
                    .region(Region::new(DEFAULT_AWS_REGION))
                    .load()
                    .await
            }
        }
    }

    /// Resolve the MFA code for a request, prompting at most once per process.
    fn token_code(&self, request: &AssumeRoleRequest) -> Result<Option<String>, AssumeRoleError> {
        let Some(serial) = &request.mfa_serial else {
            return Ok(None);
        };
        if let Some(token) = &request.mfa_token {
            return Ok(Some(token.clone()));
        }

        let mut prompted = self
            .prompted_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = prompted.as_ref() {
            return Ok(Some(token.clone()));
        }

        let token = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Enter MFA code for {serial}"))
            .interact_text()
            .map_err(|e| AssumeRoleError::MfaPrompt(e.to_string()))?;

        *prompted = Some(token.clone());
        Ok(Some(token))
    }
}

#[async_trait]
impl RoleAssumer for StsGateway {
    async fn assume_role(
        &self,
        request: &AssumeRoleRequest,
    ) -> Result<Credentials, AssumeRoleError> {
        info!("Calling AWS STS AssumeRole");
        debug!("Role ARN: {}", request.role_arn);
        debug!("Session name: {}", request.session_name);

        let token_code = self.token_code(request)?;
        let config = self.load_config(None).await;
        let client = StsClient::new(&config);

        let response = client
            .assume_role()
            .role_arn(&request.role_arn)
            .role_session_name(&request.session_name)
            .set_external_id(request.external_id.clone())
            .set_serial_number(request.mfa_serial.clone())
            .set_token_code(token_code)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let sts_creds = response
            .credentials()
            .ok_or(AssumeRoleError::MissingCredentials)?;

        let credentials = Credentials {
            access_key_id: sts_creds.access_key_id().to_string(),
            secret_access_key: sts_creds.secret_access_key().to_string(),
            session_token: sts_creds.session_token().to_string(),
            expiration: *sts_creds.expiration(),
        };

        info!("Successfully obtained AWS credentials");
        Ok(credentials)
    }
}

#[async_trait]
impl CredentialValidator for StsGateway {
    async fn is_valid(&self, credentials: &Credentials) -> bool {
        let provider = StaticCredentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            Some(credentials.session_token.clone()),
            None,
            CACHED_PROVIDER_NAME,
        );
        let config = self.load_config(Some(provider)).await;

        match StsClient::new(&config).get_caller_identity().send().await {
            Ok(identity) => {
                debug!(
                    "Cached credentials belong to {}",
                    identity.arn().unwrap_or("unknown")
                );
                true
            }
            Err(e) => {
                debug!("Get caller identity failed: {}", DisplayErrorContext(&e));
                false
            }
        }
    }
}

fn classify_sdk_error(err: SdkError<SdkAssumeRoleError>) -> AssumeRoleError {
    classify(err.code(), DisplayErrorContext(&err).to_string())
}

fn classify(code: Option<&str>, message: String) -> AssumeRoleError {
    match code {
        Some(code) if EXPIRED_TOKEN_CODES.contains(&code) => AssumeRoleError::ExpiredToken(message),
        _ => AssumeRoleError::Service(message),
    }
}
