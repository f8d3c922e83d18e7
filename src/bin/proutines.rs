/// Proutines CLI
///
/// Runs the tick throughput benchmark and prints the effective configuration.

use proutines_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
