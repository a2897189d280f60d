//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, report serialization)
//! - `account_reader` - Synchronous account reader with iterator interface
//! - `command_reader` - Asynchronous command reader with batch reading interface

pub mod account_reader;
pub mod command_reader;
pub mod csv_format;

pub use account_reader::AccountReader;
pub use command_reader::CommandReader;
pub use csv_format::{
    convert_command_record, write_balances_csv, write_entries_csv, AccountRecord, CommandRecord,
    LedgerCommand,
};
