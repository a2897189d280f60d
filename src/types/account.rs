//! Account-related types for the ledger engine
//!
//! Accounts carry identity only. Balances are never stored on them; they are
//! derived from the holder's unconsumed ledger entries.

use super::entry::AccountId;

/// A known account holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Directory identifier, referenced by entries as holder/source/target
    pub id: AccountId,

    /// Given name
    pub name: String,

    /// Family name
    pub last_name: String,
}

impl Account {
    /// Create an account record
    ///
    /// # Arguments
    ///
    /// * `id` - Directory identifier
    /// * `name` - Given name
    /// * `last_name` - Family name
    pub fn new(
        id: impl Into<AccountId>,
        name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Account {
            id: id.into(),
            name: name.into(),
            last_name: last_name.into(),
        }
    }
}
