use clap::CommandFactory;
use clap_complete::Shell;
use std::io::Write;

use crate::cli::Cli;

/// Write the completion script for `shell` to `out`
pub fn generate<W: Write>(shell: Shell, out: &mut W) {
    let mut cmd = Cli::command();
    let app_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, app_name, out);
}
