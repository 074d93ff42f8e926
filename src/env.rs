use std::{env, io::Write};

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    aws::{Credentials, RoleMetadata},
    constants::{
        ACCESS_KEY_ID_ENV, ACCOUNT_ID_ENV, AMBIENT_CREDENTIAL_ENVS, PROFILE_NAME_ENV,
        ROLE_NAME_ENV, SECRET_ACCESS_KEY_ENV, SESSION_TOKEN_ENV,
    },
};

/// Process-wide credential variables the SDK's default chain picks up
pub trait AmbientEnvironment {
    /// Remove every ambient credential variable so the next call falls back
    /// to profile or instance credentials.
    fn clear_credentials(&self);
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl AmbientEnvironment for ProcessEnvironment {
    fn clear_credentials(&self) {
        for name in AMBIENT_CREDENTIAL_ENVS {
            debug!("Unsetting {}", name);
            // SAFETY: the binary runs on a current-thread runtime and no other
            // thread reads the environment while this runs.
            unsafe {
                env::remove_var(name);
            }
        }
    }
}

/// Variables injected into a subcommand, credentials first
pub fn credential_env_vars(
    credentials: &Credentials,
    metadata: Option<&RoleMetadata>,
) -> Vec<(&'static str, String)> {
    let mut vars = vec![
        (ACCESS_KEY_ID_ENV, credentials.access_key_id.clone()),
        (SECRET_ACCESS_KEY_ENV, credentials.secret_access_key.clone()),
        (SESSION_TOKEN_ENV, credentials.session_token.clone()),
    ];

    if let Some(meta) = metadata {
        vars.push((ROLE_NAME_ENV, meta.role_name.clone()));
        vars.push((ACCOUNT_ID_ENV, meta.account_id.clone()));
        vars.push((PROFILE_NAME_ENV, meta.profile_name.clone()));
    }

    vars
}

/// Print one `export KEY=value` line per variable
pub fn write_exports<W: Write>(
    out: &mut W,
    credentials: &Credentials,
    metadata: Option<&RoleMetadata>,
) -> Result<()> {
    for (name, value) in credential_env_vars(credentials, metadata) {
        writeln!(out, "export {name}={value}").context("Failed to write export line")?;
    }
    out.flush().context("Failed to flush exports")?;
    Ok(())
}
