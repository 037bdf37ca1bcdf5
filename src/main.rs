// src/main.rs
use clap::Parser;
use cluster_pki_init::cli::{build_logger, run, Args};
use cluster_pki_init::utils::logging::Logger;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    let mut logger = match build_logger(&args) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to open log file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &mut logger, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.log(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
