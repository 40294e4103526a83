//! Foreground entry point for the recon daemon.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let Err(error) = recond::run_daemon() else {
        return ExitCode::SUCCESS;
    };
    if writeln!(io::stderr().lock(), "recond: {error}").is_err() {
        return ExitCode::from(2);
    }
    ExitCode::FAILURE
}
