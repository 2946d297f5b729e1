//! relstore CLI entry point
//!
//! Parses arguments and dispatches to the CLI module. Errors are printed to
//! stderr and exit with a non-zero status.

use relstore::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
