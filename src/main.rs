//! aflow - command-line front end for the assetflow asset pipeline

use std::process::ExitCode;

use assetflow::cli;

fn main() -> ExitCode {
    cli::run()
}
