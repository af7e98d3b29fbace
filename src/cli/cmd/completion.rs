use std::str::FromStr;

use clap_complete::{Shell, generate};

use super::{CmdConfig, handler};
use crate::cli::builder::{CmdBuilder, Command};
use crate::cli::config::Config;
use crate::cli::error::AnkrError;

pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    b.build(
        root,
        Some(handler!(completion)),
        "completion <shell>",
        "Print a completion script for bash, zsh, fish, elvish or powershell",
        &[],
    )?;
    Ok(())
}

async fn completion(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let shell = Shell::from_str(&c.args[0])
        .map_err(|e| AnkrError::InvalidInput(format!("unsupported shell: {e}")))?;

    let mut cli = crate::cli::build_root(&mut Config::default())?.to_clap();
    let name = cli.get_name().to_string();
    generate(shell, &mut cli, name, &mut c.out);

    Ok(())
}
