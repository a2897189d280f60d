//! Shared helpers for integration tests
//!
//! [`FaultyStore`] wraps the in-memory store and fails selected calls, so
//! tests can drive the engine into its compensation paths.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_ledger_engine::{
    Account, Entry, EntryId, InMemoryAccountDirectory, InMemoryLedgerStore, LedgerEngine,
    LedgerStore, NewEntry, RetryPolicy, StoreError,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type CreateFault = Box<dyn Fn(&NewEntry) -> bool + Send + Sync>;

/// Ledger store that injects failures into an in-memory store
pub struct FaultyStore {
    inner: InMemoryLedgerStore,
    /// Successful marks left before every mark fails; `u32::MAX` disables
    marks_before_failure: AtomicU32,
    /// Number of upcoming rollback calls that fail
    rollback_failures: AtomicU32,
    rollback_calls: AtomicU32,
    create_fault: Mutex<Option<CreateFault>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryLedgerStore::new(),
            marks_before_failure: AtomicU32::new(u32::MAX),
            rollback_failures: AtomicU32::new(0),
            rollback_calls: AtomicU32::new(0),
            create_fault: Mutex::new(None),
        }
    }

    /// Let `successes` marks through, then fail every mark
    pub fn fail_marks_after(&self, successes: u32) {
        self.marks_before_failure.store(successes, Ordering::SeqCst);
    }

    /// Fail the next `count` rollback calls
    pub fn fail_rollbacks(&self, count: u32) {
        self.rollback_failures.store(count, Ordering::SeqCst);
    }

    /// Fail every create the predicate matches
    pub fn fail_creates_when<F>(&self, predicate: F)
    where
        F: Fn(&NewEntry) -> bool + Send + Sync + 'static,
    {
        *self.create_fault.lock().unwrap() = Some(Box::new(predicate));
    }

    /// Stop injecting any failure
    pub fn heal(&self) {
        self.marks_before_failure.store(u32::MAX, Ordering::SeqCst);
        self.rollback_failures.store(0, Ordering::SeqCst);
        *self.create_fault.lock().unwrap() = None;
    }

    pub fn rollback_calls(&self) -> u32 {
        self.rollback_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn create(&self, entry: NewEntry) -> Result<EntryId, StoreError> {
        let rejected = self
            .create_fault
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|fault| fault(&entry));
        if rejected {
            return Err(StoreError::unavailable("create rejected"));
        }
        self.inner.create(entry).await
    }

    async fn find_one(&self, id: EntryId) -> Result<Entry, StoreError> {
        self.inner.find_one(id).await
    }

    async fn find_all(&self, holder: &str) -> Result<Vec<Entry>, StoreError> {
        self.inner.find_all(holder).await
    }

    async fn balance_of(&self, holder: &str) -> Result<Decimal, StoreError> {
        self.inner.balance_of(holder).await
    }

    async fn mark_consumed(&self, id: EntryId) -> Result<(), StoreError> {
        let left = self.marks_before_failure.load(Ordering::SeqCst);
        if left == 0 {
            return Err(StoreError::unavailable("mark rejected"));
        }
        if left != u32::MAX {
            self.marks_before_failure.store(left - 1, Ordering::SeqCst);
        }
        self.inner.mark_consumed(id).await
    }

    async fn rollback_consumed(&self, ids: &[EntryId]) -> Result<(), StoreError> {
        self.rollback_calls.fetch_add(1, Ordering::SeqCst);
        let left = self.rollback_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.rollback_failures.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::unavailable("rollback rejected"));
        }
        self.inner.rollback_consumed(ids).await
    }
}

/// Directory holding `alice` and `bob`
pub fn directory() -> Arc<InMemoryAccountDirectory> {
    Arc::new(
        vec![
            Account::new("alice", "Alice", "Liddell"),
            Account::new("bob", "Bob", "Belcher"),
        ]
        .into_iter()
        .collect(),
    )
}

/// Engine over a faulty store with fast retries
pub fn engine(store: Arc<FaultyStore>, max_attempts: u32) -> LedgerEngine {
    LedgerEngine::new(store, directory())
        .with_retry_policy(RetryPolicy::fixed(max_attempts, Duration::from_millis(1)))
}

pub fn dec(value: i64) -> Decimal {
    Decimal::new(value, 0)
}
