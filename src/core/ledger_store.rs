//! Thread-safe in-memory ledger store
//!
//! This module provides [`InMemoryLedgerStore`], a [`LedgerStore`] backed by a
//! `DashMap` keyed by entry id. It is what the replay pipeline runs on and
//! what the tests use as the reference backend.
//!
//! # Ordering
//!
//! `find_all` returns a holder's entries ordered by `created_at`. Entries with
//! the same timestamp keep the order they were created in, tracked with a
//! monotonic sequence number stored next to each entry.
//!
//! # Thread Safety
//!
//! All operations go through DashMap's sharded locks. No guard is held across
//! an `.await`, so the store can be shared by the engine and the compensation
//! tasks at the same time.

use crate::core::traits::LedgerStore;
use crate::types::{Entry, EntryId, NewEntry, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredEntry {
    seq: u64,
    entry: Entry,
}

/// Concurrent in-memory ledger store
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    entries: DashMap<EntryId, StoredEntry>,
    next_seq: AtomicU64,
}

impl InMemoryLedgerStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, consumed or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entry has been created yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn validate(entry: &NewEntry) -> Result<(), StoreError> {
        if entry.source.is_empty() {
            return Err(StoreError::MissingSender);
        }
        if entry.target.is_empty() {
            return Err(StoreError::MissingReceiver);
        }
        if entry.holder.is_empty() {
            return Err(StoreError::MissingOwner);
        }
        if entry.amount.is_zero() {
            return Err(StoreError::ZeroAmount);
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create(&self, entry: NewEntry) -> Result<EntryId, StoreError> {
        Self::validate(&entry)?;

        let id = Uuid::now_v7();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            id,
            StoredEntry {
                seq,
                entry: entry.into_entry(id),
            },
        );

        Ok(id)
    }

    async fn find_one(&self, id: EntryId) -> Result<Entry, StoreError> {
        self.entries
            .get(&id)
            .map(|stored| stored.value().entry.clone())
            .ok_or(StoreError::TransactionNotFound { id })
    }

    async fn find_all(&self, holder: &str) -> Result<Vec<Entry>, StoreError> {
        let mut matching: Vec<StoredEntry> = self
            .entries
            .iter()
            .filter(|stored| stored.value().entry.holder == holder)
            .map(|stored| stored.value().clone())
            .collect();

        matching.sort_by(|a, b| {
            a.entry
                .created_at
                .cmp(&b.entry.created_at)
                .then(a.seq.cmp(&b.seq))
        });

        Ok(matching.into_iter().map(|stored| stored.entry).collect())
    }

    async fn balance_of(&self, holder: &str) -> Result<Decimal, StoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|stored| {
                let entry = &stored.value().entry;
                entry.holder == holder && !entry.consumed
            })
            .map(|stored| stored.value().entry.amount)
            .sum())
    }

    async fn mark_consumed(&self, id: EntryId) -> Result<(), StoreError> {
        match self.entries.get_mut(&id) {
            Some(mut stored) => {
                stored.entry.consumed = true;
                Ok(())
            }
            None => Err(StoreError::TransactionNotFound { id }),
        }
    }

    async fn rollback_consumed(&self, ids: &[EntryId]) -> Result<(), StoreError> {
        // Nothing is touched unless every id is known
        if let Some(missing) = ids.iter().find(|id| !self.entries.contains_key(*id)) {
            return Err(StoreError::TransactionNotFound { id: *missing });
        }

        for id in ids {
            if let Some(mut stored) = self.entries.get_mut(id) {
                stored.entry.consumed = false;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rstest::rstest;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn new_entry(holder: &str, amount: Decimal, offset_secs: i64) -> NewEntry {
        NewEntry {
            holder: holder.to_string(),
            source: holder.to_string(),
            target: holder.to_string(),
            created_at: base_time() + Duration::seconds(offset_secs),
            amount,
            consumed: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_one() {
        let store = InMemoryLedgerStore::new();
        let id = store
            .create(new_entry("alice", Decimal::new(100, 0), 0))
            .await
            .unwrap();

        let entry = store.find_one(id).await.unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.holder, "alice");
        assert_eq!(entry.amount, Decimal::new(100, 0));
        assert!(!entry.consumed);
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    #[case::missing_sender("alice", "", "bob", Decimal::ONE, StoreError::MissingSender)]
    #[case::missing_receiver("alice", "alice", "", Decimal::ONE, StoreError::MissingReceiver)]
    #[case::missing_owner("", "alice", "bob", Decimal::ONE, StoreError::MissingOwner)]
    #[case::zero_amount("alice", "alice", "bob", Decimal::ZERO, StoreError::ZeroAmount)]
    #[case::sender_checked_first("", "", "", Decimal::ZERO, StoreError::MissingSender)]
    #[tokio::test]
    async fn test_create_validation(
        #[case] holder: &str,
        #[case] source: &str,
        #[case] target: &str,
        #[case] amount: Decimal,
        #[case] expected: StoreError,
    ) {
        let store = InMemoryLedgerStore::new();
        let entry = NewEntry {
            holder: holder.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            created_at: base_time(),
            amount,
            consumed: false,
        };

        assert_eq!(store.create(entry).await, Err(expected));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_find_one_unknown_id() {
        let store = InMemoryLedgerStore::new();
        let id = Uuid::now_v7();

        assert_eq!(
            store.find_one(id).await,
            Err(StoreError::TransactionNotFound { id })
        );
    }

    #[tokio::test]
    async fn test_find_all_orders_by_time_then_insertion() {
        let store = InMemoryLedgerStore::new();
        let late = store
            .create(new_entry("alice", Decimal::new(3, 0), 60))
            .await
            .unwrap();
        let early_first = store
            .create(new_entry("alice", Decimal::new(1, 0), 0))
            .await
            .unwrap();
        let early_second = store
            .create(new_entry("alice", Decimal::new(2, 0), 0))
            .await
            .unwrap();
        store
            .create(new_entry("bob", Decimal::new(9, 0), 0))
            .await
            .unwrap();

        let ids: Vec<EntryId> = store
            .find_all("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect();

        assert_eq!(ids, vec![early_first, early_second, late]);
    }

    #[tokio::test]
    async fn test_find_all_unknown_holder_is_empty() {
        let store = InMemoryLedgerStore::new();
        assert!(store.find_all("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balance_ignores_consumed_entries() {
        let store = InMemoryLedgerStore::new();
        let first = store
            .create(new_entry("alice", Decimal::new(100, 0), 0))
            .await
            .unwrap();
        store
            .create(new_entry("alice", Decimal::new(50, 0), 1))
            .await
            .unwrap();
        let mut marker = new_entry("alice", Decimal::new(-30, 0), 2);
        marker.consumed = true;
        store.create(marker).await.unwrap();

        assert_eq!(store.balance_of("alice").await.unwrap(), Decimal::new(150, 0));

        store.mark_consumed(first).await.unwrap();
        assert_eq!(store.balance_of("alice").await.unwrap(), Decimal::new(50, 0));
        assert_eq!(store.balance_of("bob").await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_mark_consumed_is_idempotent() {
        let store = InMemoryLedgerStore::new();
        let id = store
            .create(new_entry("alice", Decimal::new(10, 0), 0))
            .await
            .unwrap();

        store.mark_consumed(id).await.unwrap();
        store.mark_consumed(id).await.unwrap();

        assert!(store.find_one(id).await.unwrap().consumed);
    }

    #[tokio::test]
    async fn test_mark_consumed_unknown_id() {
        let store = InMemoryLedgerStore::new();
        let id = Uuid::now_v7();

        assert_eq!(
            store.mark_consumed(id).await,
            Err(StoreError::TransactionNotFound { id })
        );
    }

    #[tokio::test]
    async fn test_rollback_restores_entries() {
        let store = InMemoryLedgerStore::new();
        let first = store
            .create(new_entry("alice", Decimal::new(10, 0), 0))
            .await
            .unwrap();
        let second = store
            .create(new_entry("alice", Decimal::new(20, 0), 1))
            .await
            .unwrap();
        store.mark_consumed(first).await.unwrap();
        store.mark_consumed(second).await.unwrap();

        store.rollback_consumed(&[first, second]).await.unwrap();
        // Second pass is a no-op
        store.rollback_consumed(&[first, second]).await.unwrap();

        assert_eq!(store.balance_of("alice").await.unwrap(), Decimal::new(30, 0));
    }

    #[tokio::test]
    async fn test_rollback_with_unknown_id_changes_nothing() {
        let store = InMemoryLedgerStore::new();
        let known = store
            .create(new_entry("alice", Decimal::new(10, 0), 0))
            .await
            .unwrap();
        store.mark_consumed(known).await.unwrap();
        let unknown = Uuid::now_v7();

        assert_eq!(
            store.rollback_consumed(&[known, unknown]).await,
            Err(StoreError::TransactionNotFound { id: unknown })
        );
        assert!(store.find_one(known).await.unwrap().consumed);
    }

    #[tokio::test]
    async fn test_rollback_empty_list() {
        let store = InMemoryLedgerStore::new();
        assert!(store.rollback_consumed(&[]).await.is_ok());
    }
}
