//! Pilum load binary.

use std::process;

use clap::Parser;

use pilum::cli::args::LoadArgs;
use pilum::cli::commands::run_load;
use pilum::cli::{init_logging, output_error};

fn main() {
    // Parse command line arguments using clap
    let args = LoadArgs::parse();

    init_logging(args.verbosity.level());

    if let Err(e) = run_load(args) {
        output_error(&e);
        process::exit(1);
    }
}
