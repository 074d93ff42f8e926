use std::{io, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser};
use clap_complete::Shell;
use tracing::{debug, info};

use crate::{
    aws::StsGateway,
    cache::CredentialCache,
    completions,
    config::{self, AssumeConfig},
    constants::{self, DEFAULT_SESSION_NAME},
    env::{self, ProcessEnvironment},
    exec,
    orchestrator::{CredentialSource, Orchestrator},
};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "assume-role-arn",
    version,
    about = "Assume an AWS IAM role and export or run a command with its credentials",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub role: RoleArgs,

    #[arg(short = 'v', long, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    #[arg(
        long = "ignore-cache",
        alias = "ignoreCache",
        help = "Ignore credentials stored in cache and request new ones"
    )]
    pub ignore_cache: bool,

    #[arg(
        long = "skip-cache",
        alias = "skipCache",
        help = "Do not read or write the credentials cache"
    )]
    pub skip_cache: bool,

    #[arg(
        long,
        help = "Also export AWS_ROLE_NAME, AWS_ACCOUNT_ID and AWS_PROFILE_NAME"
    )]
    pub export_metadata: bool,

    #[arg(
        long,
        value_enum,
        value_name = "SHELL",
        help = "Print a shell completion script and exit"
    )]
    pub completions: Option<Shell>,

    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND",
        help = "Command to run with the credentials in its environment"
    )]
    pub command: Vec<String>,
}

/// Options that shape the AssumeRole call
#[derive(Debug, Clone, Args)]
pub struct RoleArgs {
    #[arg(short = 'r', long = "role", value_name = "ARN", help = "Role ARN to assume")]
    pub role_arn: Option<String>,

    #[arg(
        short = 'n',
        long = "name",
        default_value = DEFAULT_SESSION_NAME,
        help = "Role session name"
    )]
    pub session_name: String,

    #[arg(
        short = 'e',
        long = "extid",
        alias = "external-id",
        help = "External ID"
    )]
    pub external_id: Option<String>,

    #[arg(short = 'p', long, help = "AWS profile name")]
    pub profile: Option<String>,

    #[arg(
        short = 'm',
        long = "mfaserial",
        alias = "mfa-serial",
        help = "MFA device serial number"
    )]
    pub mfa_serial: Option<String>,

    #[arg(
        long = "mfatoken",
        alias = "mfa-token",
        help = "MFA token code (prompted for when omitted)"
    )]
    pub mfa_token: Option<String>,
}

impl Cli {
    pub async fn execute(self) -> Result<ExitCode> {
        if let Some(shell) = self.completions {
            completions::generate(shell, &mut io::stdout());
            return Ok(ExitCode::SUCCESS);
        }

        if self.role.role_arn.is_none() && self.role.profile.is_none() {
            anyhow::bail!("Role ARN or profile cannot be empty");
        }

        let aws_profile = self.role.profile.as_deref().and_then(config::load_profile);
        let config = AssumeConfig::resolve(
            &self.role,
            self.ignore_cache,
            self.skip_cache,
            aws_profile,
        )?;
        let metadata = self.export_metadata.then(|| config.role_metadata());

        let cache = CredentialCache::select(config.skip_cache, constants::get_cache_dir());
        let gateway = StsGateway::new(config.sdk_profile.clone(), config.region.clone());
        let validator = StsGateway::new(config.sdk_profile.clone(), config.region.clone());
        let orchestrator = Orchestrator::new(config, cache, gateway, validator, ProcessEnvironment);

        let resolved = orchestrator.resolve().await?;
        match resolved.source {
            CredentialSource::Cache => debug!("Credentials served from cache"),
            CredentialSource::Assumed => debug!("Credentials freshly assumed"),
        }

        if self.command.is_empty() {
            env::write_exports(
                &mut io::stdout().lock(),
                &resolved.credentials,
                metadata.as_ref(),
            )?;
            return Ok(ExitCode::SUCCESS);
        }

        info!("Running command with assumed role credentials");
        let vars = env::credential_env_vars(&resolved.credentials, metadata.as_ref());
        exec::run_command(&self.command, &vars)
            .await
            .with_context(|| format!("Failed to run {:?}", self.command))
    }
}
