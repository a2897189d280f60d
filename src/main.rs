//! Rust Ledger Engine CLI
//!
//! Replays ledger commands from a CSV file against an account directory.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv commands.csv > balances.csv
//! cargo run -- --accounts accounts.csv --report entries commands.csv > entries.csv
//! RUST_LOG=debug cargo run -- --accounts accounts.csv --log-format json commands.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use rust_ledger_engine::cli;
use rust_ledger_engine::pipeline::ReplayPipeline;
use rust_ledger_engine::telemetry;
use std::process;

fn main() {
    let args = cli::parse_args();
    telemetry::init(args.log_format);

    let pipeline = ReplayPipeline::new(args.to_replay_config());

    // Report goes to stdout, logs to stderr
    let mut output = std::io::stdout();
    if let Err(e) = pipeline.process(&args.accounts_file, &args.input_file, &mut output) {
        tracing::error!(error = %e, "replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
