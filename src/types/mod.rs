//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account identity records
//! - `entry`: Ledger entries, identifiers and operation results
//! - `error`: Error types for the store contract and the engine

pub mod account;
pub mod entry;
pub mod error;

pub use account::Account;
pub use entry::{AccountId, Balance, DebitOutcome, Entry, EntryId, NewEntry, PaymentReceipt};
pub use error::{LedgerError, StoreError};
