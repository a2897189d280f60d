//! Synchronous CSV reader for the account directory file
//!
//! Accounts are loaded once, before any command runs, so a plain blocking
//! reader is enough. Rows are streamed one at a time.
//!
//! ```no_run
//! use rust_ledger_engine::io::account_reader::AccountReader;
//! use std::path::Path;
//!
//! let reader = AccountReader::new(Path::new("accounts.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(account) => println!("Loaded account {}", account.id),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Unparseable rows are yielded as Err variants carrying their line number
//! - Field checks (blank id, blank names) are left to the directory

use crate::io::csv_format::AccountRecord;
use crate::types::{Account, LedgerError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Streaming reader over account rows
#[derive(Debug)]
pub struct AccountReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl AccountReader {
    /// Open an accounts CSV (`id,name,last_name`)
    ///
    /// # Errors
    ///
    /// * `FileNotFound` if the path does not exist
    /// * `IoError` for any other open failure
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LedgerError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LedgerError::from(e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for AccountReader {
    type Item = Result<Account, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<AccountRecord>();
        let result = deserializer.next()?;
        self.line_num += 1;
        // +1 for the header row
        let line = self.line_num + 1;

        Some(match result {
            Ok(record) => Ok(record.into()),
            Err(e) => Err(format!("Line {}: CSV parse error: {}", line, e)),
        })
    }
}
