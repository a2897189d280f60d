//! In-memory account directory
//!
//! Accounts are keyed by id in a `DashMap`. The replay pipeline fills it from
//! the accounts CSV through [`InMemoryAccountDirectory::register`] before any
//! command runs; tests insert accounts directly.

use crate::core::traits::AccountDirectory;
use crate::types::{Account, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

/// Concurrent in-memory account directory
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: DashMap<String, Account>,
}

impl InMemoryAccountDirectory {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an account under its own id
    pub fn insert(&self, account: Account) {
        self.accounts.insert(account.id.clone(), account);
    }

    /// Register a new account with a generated id
    ///
    /// # Errors
    ///
    /// `MissingParams` when the name or last name is blank.
    pub fn create(&self, name: &str, last_name: &str) -> Result<Account, StoreError> {
        if name.trim().is_empty() || last_name.trim().is_empty() {
            return Err(StoreError::MissingParams);
        }

        let account = Account::new(Uuid::now_v7().to_string(), name, last_name);
        self.insert(account.clone());
        Ok(account)
    }

    /// Register an account read from an external source
    ///
    /// An account with a blank id gets a generated one through
    /// [`create`](Self::create). The registered account is returned.
    ///
    /// # Errors
    ///
    /// `MissingParams` when the name or last name is blank.
    pub fn register(&self, account: Account) -> Result<Account, StoreError> {
        if account.id.trim().is_empty() {
            return self.create(&account.name, &account.last_name);
        }
        if account.name.trim().is_empty() || account.last_name.trim().is_empty() {
            return Err(StoreError::MissingParams);
        }

        self.insert(account.clone());
        Ok(account)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl FromIterator<Account> for InMemoryAccountDirectory {
    fn from_iter<I: IntoIterator<Item = Account>>(iter: I) -> Self {
        let directory = Self::new();
        for account in iter {
            directory.insert(account);
        }
        directory
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_one(&self, id: &str) -> Result<Account, StoreError> {
        self.accounts
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::AccountNotFound {
                account: id.to_string(),
            })
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }
}
