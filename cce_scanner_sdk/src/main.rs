//! # CCE Scanner CLI

use cce_parser::{log_error, logging};
use cce_scanner_sdk::cli::{self, Cli, EXIT_ERROR};
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG still overrides the -v level
    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = logging::init_global_logging() {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(EXIT_ERROR);
    }

    let exit_code = match cli::run(&cli) {
        Ok(code) => code,
        Err(e) => {
            log_error!(
                logging::codes::system::INVALID_CONFIGURATION,
                "Command failed",
                "error" => &e
            );
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
