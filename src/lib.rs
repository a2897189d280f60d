//! Rust Ledger Engine Library
//! # Overview
//!
//! An account ledger that records monetary movements as immutable signed
//! entries and derives each holder's balance from the entries not yet spent.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Entry, Account, errors)
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - FIFO fund consumption (deposit, withdraw, pay)
//!   - [`core::rollback`] - Background compensation with retry
//!   - [`core::traits`] - Store, directory and clock capabilities
//!   - [`core::ledger_store`] / [`core::account_directory`] - In-memory backends
//! - [`io`] - CSV readers and report writers
//! - [`pipeline`] - Command file replay
//! - [`cli`] - CLI arguments parsing
//! - [`telemetry`] - Logging setup
//!
//! # Entries
//!
//! - **Credit**: positive, unconsumed; counts toward the holder's balance
//! - **Debit marker**: negative, recorded consumed; documents money that left
//! - **Change**: positive, unconsumed remainder of a partially spent credit
//!
//! A holder's balance is the sum of its unconsumed entries and is never
//! negative after a successful operation.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod telemetry;
pub mod types;

pub use crate::core::{
    AccountDirectory, Clock, InMemoryAccountDirectory, InMemoryLedgerStore, LedgerEngine,
    LedgerStore, RetryPolicy,
};
pub use crate::types::{
    Account, AccountId, Balance, DebitOutcome, Entry, EntryId, LedgerError, NewEntry,
    PaymentReceipt, StoreError,
};
