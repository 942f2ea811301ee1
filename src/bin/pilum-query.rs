//! Pilum query benchmark binary.

use std::process;

use clap::Parser;

use pilum::cli::args::QueryArgs;
use pilum::cli::commands::run_query;
use pilum::cli::{init_logging, output_error};

fn main() {
    // Parse command line arguments using clap
    let args = QueryArgs::parse();

    init_logging(args.verbosity.level());

    if let Err(e) = run_query(args) {
        output_error(&e);
        process::exit(1);
    }
}
