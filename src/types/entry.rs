//! Ledger entry types
//!
//! An [`Entry`] is one signed, immutable movement of funds recorded against a
//! holder. Positive amounts add funds, negative amounts are markers for money
//! that left. The only field that changes after creation is `consumed`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Account identifier as it appears in the directory and on entries
pub type AccountId = String;

/// Ledger entry identifier, assigned by the store on creation
pub type EntryId = Uuid;

/// A persisted ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Store-assigned identifier
    pub id: EntryId,

    /// Account whose balance this entry belongs to
    pub holder: AccountId,

    /// Originator of the movement
    pub source: AccountId,

    /// Destination of the movement
    pub target: AccountId,

    /// Ordering key for FIFO consumption
    pub created_at: DateTime<Utc>,

    /// Signed amount; never zero
    pub amount: Decimal,

    /// Whether the entry has been spent (or is a marker that never counts)
    pub consumed: bool,
}

/// An entry as submitted to the store, before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub holder: AccountId,
    pub source: AccountId,
    pub target: AccountId,
    pub created_at: DateTime<Utc>,
    pub amount: Decimal,
    pub consumed: bool,
}

impl NewEntry {
    /// Attach a store-assigned id, producing the persisted form
    pub fn into_entry(self, id: EntryId) -> Entry {
        Entry {
            id,
            holder: self.holder,
            source: self.source,
            target: self.target,
            created_at: self.created_at,
            amount: self.amount,
            consumed: self.consumed,
        }
    }
}

/// Spendable balance of one holder
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub holder: AccountId,
    pub amount: Decimal,
}

/// Result of a successful debit
///
/// `consumed` lists the entries flipped to consumed in the order they were
/// spent. `change` is the entry carrying back any over-cover, when the last
/// consumed entry was larger than what remained of the debit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DebitOutcome {
    pub consumed: Vec<EntryId>,
    pub change: Option<EntryId>,
}

/// Entries written by a successful payment
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    /// Consumed marker recorded against the payer
    pub debit: EntryId,
    /// Unconsumed entry recorded against the payee
    pub credit: EntryId,
}
