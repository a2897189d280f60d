//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - Capability traits for the store, directory and clock
//! - `ledger_store` - In-memory ledger entry store
//! - `account_directory` - In-memory account directory
//! - `clock` - Wall-clock and fixed time sources
//! - `rollback` - Retry policy and background compensation dispatcher
//! - `engine` - Fund consumption engine

pub mod account_directory;
pub mod clock;
pub mod engine;
pub mod ledger_store;
pub mod rollback;
pub mod traits;

pub use account_directory::InMemoryAccountDirectory;
pub use clock::{FixedClock, SystemClock};
pub use engine::LedgerEngine;
pub use ledger_store::InMemoryLedgerStore;
pub use rollback::{Compensation, RetryPolicy, RollbackDispatcher};
pub use traits::{AccountDirectory, Clock, LedgerStore};
