use std::process::ExitCode;

use clap::Parser;
use rusty_prometheus::cli::Cli;

fn main() -> ExitCode {
    let mut cli = Cli::parse();
    cli.run().into()
}
