//! Asynchronous CSV reader for ledger commands
//!
//! Provides batch reading over command rows from any `futures` async reader.
//! The replay pipeline feeds it a tokio file through the compat layer.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → CommandReader → Batches of LedgerCommands
//!                  ↓
//!           csv_format module
//!           (CommandRecord, convert_command_record)
//! ```

use crate::io::csv_format::{convert_command_record, CommandRecord, LedgerCommand};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous command reader
///
/// Maintains streaming behavior with constant memory usage. Rows that fail
/// to parse or convert are logged, counted and skipped.
pub struct CommandReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    rejected: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> CommandReader<R> {
    /// Create a new CommandReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            rejected: 0,
        }
    }

    /// Read up to `batch_size` commands
    ///
    /// Returns an empty vector once the input is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CommandRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => match convert_command_record(record) {
                    Ok(command) => batch.push(command),
                    Err(e) => {
                        warn!(error = %e, "skipping command row");
                        self.rejected += 1;
                    }
                },
                Some(Err(e)) => {
                    warn!(error = %e, "skipping malformed command row");
                    self.rejected += 1;
                }
                None => break,
            }
        }

        batch
    }

    /// Rows skipped so far because they could not be parsed or converted
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}
