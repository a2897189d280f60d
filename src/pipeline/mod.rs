//! Command replay pipeline
//!
//! Loads an account directory from CSV, streams ledger commands from a second
//! CSV through a [`LedgerEngine`](crate::core::LedgerEngine), waits for any
//! background compensations, then writes a report.

use crate::cli::ReportKind;
use crate::core::RetryPolicy;
use tracing::warn;

pub mod replay;

pub use replay::{execute_command, ReplayPipeline, ReplaySummary};

/// Configuration for a replay run
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// Number of commands read per batch
    pub batch_size: usize,
    /// Tokio worker threads (also runs compensation tasks)
    pub worker_threads: usize,
    /// Retry policy for background compensation
    pub retry: RetryPolicy,
    /// Report written once replay finishes
    pub report: ReportKind,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            worker_threads: num_cpus::get(),
            retry: RetryPolicy::default(),
            report: ReportKind::Balances,
        }
    }
}

impl ReplayConfig {
    /// Create a ReplayConfig, replacing zero sizes with defaults
    pub fn new(
        batch_size: usize,
        worker_threads: usize,
        retry: RetryPolicy,
        report: ReportKind,
    ) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let worker_threads = if worker_threads == 0 {
            warn!(
                worker_threads,
                default = default.worker_threads,
                "invalid worker thread count, using default"
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self {
            batch_size,
            worker_threads,
            retry,
            report,
        }
    }
}
