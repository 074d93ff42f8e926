use std::process::{ExitCode, ExitStatus};

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info};

/// Run `args` with `vars` added to the inherited environment and wait for it.
/// Returns the exit code the caller should terminate with.
///
/// Terminal signals delivered to the foreground process group are left to the
/// child; this process keeps waiting so the child's own status is reported.
pub async fn run_command(args: &[String], vars: &[(&'static str, String)]) -> Result<ExitCode> {
    let Some((program, rest)) = args.split_first() else {
        bail!("No command given to run");
    };

    info!("Running command: {}", program);
    debug!("Command arguments: {:?}", rest);

    #[cfg(unix)]
    let _signals = ignore_terminal_signals().context("Failed to install signal handlers")?;

    let status = Command::new(program)
        .args(rest)
        .envs(vars.iter().map(|(name, value)| (*name, value.as_str())))
        .status()
        .await
        .with_context(|| format!("Failed to run the command '{program}'"))?;

    debug!("Command exited with {}", status);
    Ok(ExitCode::from(exit_code(status)))
}

/// Replace the default SIGINT/SIGQUIT/SIGTERM disposition so they no longer
/// terminate this process. Once installed the handlers stay for the process
/// lifetime; the returned streams are never polled.
#[cfg(unix)]
fn ignore_terminal_signals() -> std::io::Result<Vec<tokio::signal::unix::Signal>> {
    use tokio::signal::unix::{SignalKind, signal};

    [
        SignalKind::interrupt(),
        SignalKind::quit(),
        SignalKind::terminate(),
    ]
    .into_iter()
    .map(signal)
    .collect()
}

fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return u8::try_from(code).unwrap_or(1);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return u8::try_from(128 + signal).unwrap_or(1);
        }
    }

    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn status_of(script: &str) -> ExitStatus {
        StdCommand::new("sh").args(["-c", script]).status().unwrap()
    }

    #[test]
    fn test_exit_code_propagated() {
        assert_eq!(exit_code(status_of("exit 0")), 0);
        assert_eq!(exit_code(status_of("exit 3")), 3);
        assert_eq!(exit_code(status_of("exit 255")), 255);
    }

    #[test]
    fn test_exit_code_for_signal() {
        assert_eq!(exit_code(status_of("kill -TERM $$")), 128 + 15);
    }

    #[tokio::test]
    async fn test_run_command_injects_variables() {
        let vars = vec![("AWS_ACCESS_KEY_ID", "ASIAINJECTED".to_string())];
        let code = run_command(&sh("test \"$AWS_ACCESS_KEY_ID\" = ASIAINJECTED"), &vars)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let code = run_command(&sh("test \"$AWS_ACCESS_KEY_ID\" = other"), &vars)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::from(1));
    }

    #[tokio::test]
    async fn test_interrupt_reports_child_status() {
        // Ctrl-C reaches both processes; the child traps it and exits 7
        let script = "trap 'exit 7' INT; kill -INT $PPID; kill -INT $$; sleep 1; exit 9";
        let code = run_command(&sh(script), &[]).await.unwrap();
        assert_eq!(code, ExitCode::from(7));
    }

    #[tokio::test]
    async fn test_run_command_missing_program() {
        let args = vec!["definitely-not-a-real-program-4242".to_string()];
        let result = run_command(&args, &[]).await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to run the command")
        );
    }

    #[tokio::test]
    async fn test_run_command_requires_program() {
        assert!(run_command(&[], &[]).await.is_err());
    }
}
