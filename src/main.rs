// CLI binary entry point for lametag
//
// This is the main entry point for the lametag command-line tool.

mod cli;

use clap::Parser;

use crate::cli::logging::init_logging;
use crate::cli::Config;

fn main() {
    let config = Config::parse();
    init_logging(config.log_format, config.log_level);

    match cli::commands::run(config) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}
