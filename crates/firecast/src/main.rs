use std::process::ExitCode;

use clap::Parser;
use firecast::{Cli, commands, init_logging};

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    let code = commands::run(cli)?;
    tracing::debug!("firecast finished");
    Ok(code)
}
