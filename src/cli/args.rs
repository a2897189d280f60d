use crate::core::RetryPolicy;
use crate::pipeline::ReplayConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay ledger commands against an account directory
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Replay deposits, withdrawals and payments through a FIFO ledger", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing ledger commands
    #[arg(value_name = "INPUT", help = "Path to the command CSV file")]
    pub input_file: PathBuf,

    /// Account directory CSV (id,name,last_name)
    #[arg(long = "accounts", value_name = "FILE", help = "Path to the accounts CSV file")]
    pub accounts_file: PathBuf,

    /// Report written to stdout after replay
    #[arg(
        long = "report",
        value_name = "REPORT",
        default_value = "balances",
        help = "Report to print: 'balances' per account or every ledger 'entries' row"
    )]
    pub report: ReportKind,

    /// Number of commands per batch
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands read per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Tokio worker threads
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Number of runtime worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// Compensation attempts before giving up
    #[arg(
        long = "rollback-attempts",
        value_name = "COUNT",
        help = "Attempts per background rollback (default: 8)"
    )]
    pub rollback_attempts: Option<u32>,

    /// Base delay between compensation attempts
    #[arg(
        long = "rollback-delay-ms",
        value_name = "MILLIS",
        help = "Initial rollback retry delay in milliseconds, doubled per attempt (default: 50)"
    )]
    pub rollback_delay_ms: Option<u64>,

    /// Log output format
    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        default_value = "text",
        help = "Log format on stderr: 'text' or 'json' (level via RUST_LOG)"
    )]
    pub log_format: LogFormat,
}

/// Report produced once replay finishes
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Balances,
    Entries,
}

/// Log line format
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl CliArgs {
    /// Create a ReplayConfig from CLI arguments
    ///
    /// Missing values fall back to defaults; zero values are replaced with
    /// defaults and a warning is logged.
    pub fn to_replay_config(&self) -> ReplayConfig {
        let default = ReplayConfig::default();

        let retry = if self.rollback_attempts.is_some() || self.rollback_delay_ms.is_some() {
            let base = default.retry.clone();
            let base_delay = self
                .rollback_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(base.base_delay);
            RetryPolicy::new(
                self.rollback_attempts.unwrap_or(base.max_attempts),
                base_delay,
                base.max_delay,
            )
        } else {
            default.retry.clone()
        };

        ReplayConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.worker_threads.unwrap_or(default.worker_threads),
            retry,
            self.report,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_report(&["program", "--accounts", "a.csv", "c.csv"], ReportKind::Balances)]
    #[case::balances(&["program", "--accounts", "a.csv", "--report", "balances", "c.csv"], ReportKind::Balances)]
    #[case::entries(&["program", "--accounts", "a.csv", "--report", "entries", "c.csv"], ReportKind::Entries)]
    fn test_report_parsing(#[case] args: &[&str], #[case] expected: ReportKind) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.report, expected);
    }

    #[rstest]
    #[case::default_text(&["program", "--accounts", "a.csv", "c.csv"], LogFormat::Text)]
    #[case::json(&["program", "--accounts", "a.csv", "--log-format", "json", "c.csv"], LogFormat::Json)]
    fn test_log_format_parsing(#[case] args: &[&str], #[case] expected: LogFormat) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.log_format, expected);
    }

    #[test]
    fn test_paths() {
        let parsed =
            CliArgs::try_parse_from(["program", "--accounts", "accounts.csv", "commands.csv"])
                .unwrap();

        assert_eq!(parsed.accounts_file, PathBuf::from("accounts.csv"));
        assert_eq!(parsed.input_file, PathBuf::from("commands.csv"));
    }

    #[rstest]
    #[case::all_defaults(&["program", "--accounts", "a.csv", "c.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--accounts", "a.csv", "--batch-size", "20", "c.csv"], 20, num_cpus::get())]
    #[case::custom_threads(&["program", "--accounts", "a.csv", "--worker-threads", "3", "c.csv"], 1000, 3)]
    #[case::zero_batch_size(&["program", "--accounts", "a.csv", "--batch-size", "0", "c.csv"], 1000, num_cpus::get())]
    #[case::zero_threads(&["program", "--accounts", "a.csv", "--worker-threads", "0", "c.csv"], 1000, num_cpus::get())]
    fn test_replay_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_threads: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_replay_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.worker_threads, expected_threads);
    }

    #[rstest]
    #[case::defaults(&["program", "--accounts", "a.csv", "c.csv"], 8, 50)]
    #[case::attempts(&["program", "--accounts", "a.csv", "--rollback-attempts", "3", "c.csv"], 3, 50)]
    #[case::delay(&["program", "--accounts", "a.csv", "--rollback-delay-ms", "5", "c.csv"], 8, 5)]
    #[case::zero_attempts(&["program", "--accounts", "a.csv", "--rollback-attempts", "0", "c.csv"], 8, 50)]
    fn test_retry_policy_conversion(
        #[case] args: &[&str],
        #[case] expected_attempts: u32,
        #[case] expected_delay_ms: u64,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_replay_config();

        assert_eq!(config.retry.max_attempts, expected_attempts);
        assert_eq!(config.retry.base_delay, Duration::from_millis(expected_delay_ms));
    }

    #[rstest]
    #[case::missing_input(&["program", "--accounts", "a.csv"])]
    #[case::missing_accounts(&["program", "c.csv"])]
    #[case::invalid_report(&["program", "--accounts", "a.csv", "--report", "totals", "c.csv"])]
    #[case::invalid_log_format(&["program", "--accounts", "a.csv", "--log-format", "xml", "c.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
