//! Replay of a command file against an in-memory ledger
//!
//! # Architecture
//!
//! ```text
//! ReplayPipeline
//!     ├── AccountReader → InMemoryAccountDirectory
//!     ├── CommandReader (batched async CSV reading)
//!     └── LedgerEngine
//!         ├── InMemoryLedgerStore
//!         └── RollbackDispatcher (background compensation tasks)
//! ```
//!
//! # Ordering
//!
//! Commands run one at a time in file order. A payment touches two holders,
//! so splitting work by holder would let a debit of the payee race the
//! payment crediting it. The multi-threaded runtime still carries the
//! compensation tasks alongside the replay loop.

use crate::cli::ReportKind;
use crate::core::{
    AccountDirectory, InMemoryAccountDirectory, InMemoryLedgerStore, LedgerEngine,
};
use crate::io::{write_balances_csv, write_entries_csv, AccountReader, CommandReader, LedgerCommand};
use crate::pipeline::ReplayConfig;
use crate::types::{Balance, LedgerError};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters describing a finished replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Accounts loaded into the directory
    pub accounts: usize,
    /// Account rows skipped as invalid
    pub skipped_accounts: usize,
    /// Commands the engine accepted
    pub applied: usize,
    /// Commands the engine rejected
    pub rejected: usize,
    /// Command rows skipped as unparseable
    pub skipped_rows: usize,
}

/// Run one command through the engine
pub async fn execute_command(
    engine: &LedgerEngine,
    command: &LedgerCommand,
) -> Result<(), LedgerError> {
    match command {
        LedgerCommand::Deposit { account, amount } => {
            engine.deposit(account, *amount).await?;
        }
        LedgerCommand::Withdrawal { account, amount } => {
            engine.withdraw(account, *amount).await?;
        }
        LedgerCommand::Payment {
            owner,
            receiver,
            amount,
        } => {
            engine.pay(owner, receiver, *amount).await?;
        }
    }
    Ok(())
}

/// Replays a command CSV and reports the resulting ledger
#[derive(Debug, Clone)]
pub struct ReplayPipeline {
    config: ReplayConfig,
}

impl ReplayPipeline {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// Replay `input_path` against the accounts in `accounts_path`
    ///
    /// Steps:
    /// 1. Loads the account directory (bad rows are logged and skipped)
    /// 2. Builds a multi-threaded tokio runtime
    /// 3. Streams command batches and executes each command in order
    /// 4. Waits for every background compensation to finish
    /// 5. Writes the configured report to `output`
    ///
    /// # Errors
    ///
    /// Only fatal problems are returned: a missing file, an I/O failure or a
    /// runtime that cannot be built. Rejected commands are logged and counted.
    pub fn process(
        &self,
        accounts_path: &Path,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LedgerError> {
        let mut summary = ReplaySummary::default();

        let directory = InMemoryAccountDirectory::new();
        for result in AccountReader::new(accounts_path)? {
            let registered = result.and_then(|account| {
                directory.register(account).map_err(|e| e.to_string())
            });
            match registered {
                Ok(account) => {
                    debug!(account = %account.id, "account loaded");
                    summary.accounts += 1;
                }
                Err(e) => {
                    warn!(error = %e, "skipping account row");
                    summary.skipped_accounts += 1;
                }
            }
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .enable_all()
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let directory = Arc::new(directory);
            let engine = LedgerEngine::new(
                Arc::new(InMemoryLedgerStore::new()),
                Arc::clone(&directory) as Arc<dyn AccountDirectory>,
            )
            .with_retry_policy(self.config.retry.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| match e.kind() {
                    ErrorKind::NotFound => LedgerError::FileNotFound {
                        path: input_path.display().to_string(),
                    },
                    _ => LedgerError::from(e),
                })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = CommandReader::new(compat_file);

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for command in &batch {
                    match execute_command(&engine, command).await {
                        Ok(()) => summary.applied += 1,
                        Err(e) => {
                            warn!(account = command.account(), error = %e, "command rejected");
                            summary.rejected += 1;
                        }
                    }
                }
            }
            summary.skipped_rows = reader.rejected();

            engine.rollbacks().drain().await;

            self.write_report(&engine, directory.as_ref(), &mut *output)
                .await
        })?;

        info!(
            accounts = summary.accounts,
            applied = summary.applied,
            rejected = summary.rejected,
            skipped_rows = summary.skipped_rows,
            "replay finished"
        );
        Ok(summary)
    }

    async fn write_report(
        &self,
        engine: &LedgerEngine,
        directory: &dyn AccountDirectory,
        output: &mut dyn Write,
    ) -> Result<(), LedgerError> {
        let accounts = directory.find_all().await?;

        let written = match self.config.report {
            ReportKind::Balances => {
                let mut balances = Vec::with_capacity(accounts.len());
                for account in accounts {
                    let amount = engine.balance_of(&account.id).await?;
                    balances.push(Balance {
                        holder: account.id,
                        amount,
                    });
                }
                write_balances_csv(&balances, output)
            }
            ReportKind::Entries => {
                let mut entries = Vec::new();
                for account in accounts {
                    entries.extend(engine.get_all_transactions(&account.id).await?);
                }
                write_entries_csv(&entries, output)
            }
        };

        written.map_err(|message| LedgerError::IoError { message })
    }
}
