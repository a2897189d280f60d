//! Core traits for ledger storage, account lookup and time
//!
//! The engine depends on these capabilities only, so any backend (the
//! in-memory ones in this crate, a database, a test double that injects
//! faults) can be plugged in behind an `Arc<dyn ...>`.

use crate::types::{Account, Entry, EntryId, NewEntry, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Persistence of ledger entries
///
/// Implementations must be safe to share across tasks; the engine and the
/// compensation dispatcher call into the same store concurrently.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist a new entry and return its assigned id
    ///
    /// # Errors
    ///
    /// `MissingSender`, `MissingReceiver`, `MissingOwner` when the matching
    /// account field is empty, `ZeroAmount` when the amount is zero.
    async fn create(&self, entry: NewEntry) -> Result<EntryId, StoreError>;

    /// Fetch one entry by id
    async fn find_one(&self, id: EntryId) -> Result<Entry, StoreError>;

    /// All entries (consumed or not) for a holder, oldest first
    async fn find_all(&self, holder: &str) -> Result<Vec<Entry>, StoreError>;

    /// Raw sum of the holder's unconsumed amounts; zero when there are none
    async fn balance_of(&self, holder: &str) -> Result<Decimal, StoreError>;

    /// Flip one entry to consumed. Idempotent.
    async fn mark_consumed(&self, id: EntryId) -> Result<(), StoreError>;

    /// Flip every listed entry back to unconsumed. Idempotent.
    async fn rollback_consumed(&self, ids: &[EntryId]) -> Result<(), StoreError>;
}

/// Read-only lookup of known accounts
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Fetch an account, failing with `AccountNotFound` when unknown
    async fn find_one(&self, id: &str) -> Result<Account, StoreError>;

    /// Every known account, ordered by id
    async fn find_all(&self) -> Result<Vec<Account>, StoreError>;
}

/// Source of entry timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
