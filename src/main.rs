//! Psyker CLI entry point.
//!
//! Parses arguments, installs the log subscriber, dispatches to the command
//! handler, and maps errors to exit codes.

use psyker::cli::Cli;
use psyker::{commands, exit_codes, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(err) = logging::init(cli.global.verbose) {
        eprintln!("error: {:#}", err);
        return ExitCode::from(exit_codes::GENERAL_ERROR as u8);
    }

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            if err.is_cancelled() {
                eprintln!("task cancelled");
            } else {
                eprintln!("{}", err.to_diagnostic());
            }
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
