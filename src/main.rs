use std::process::ExitCode;

use clap::Parser;
use pixforge::{cli, logger};

fn main() -> ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = cli::Cli::parse();
    cli::run(args)
}
