use std::{io, process::ExitCode};

use bitc_bin::{cli::Cli, driver, init_tracing};
use clap::Parser;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut out = io::stdout().lock();
    let mut diag = io::stderr().lock();
    match driver::run(&cli, &mut out, &mut diag) {
        Ok(diagnostics) if diagnostics.may_link() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            drop(diag);
            eprintln!("bitc: {error}");
            ExitCode::FAILURE
        }
    }
}
