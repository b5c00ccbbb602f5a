mod ui;

use std::process::ExitCode;

use clap::Parser;
use crate::ui::cli;
use winops_core::utils::logging::init_logging;

fn main() -> ExitCode {
    init_logging();
    let args = cli::Args::parse();
    match cli::run_cli(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("winops error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
