//! Asynchronous compensation of partially applied debits
//!
//! When a debit, withdrawal or payment fails after some entries were already
//! flipped to consumed, the engine hands a [`Compensation`] to the
//! [`RollbackDispatcher`] and returns its error straight away. The dispatcher
//! applies the compensation on a background task, retrying with exponential
//! backoff until it succeeds or the [`RetryPolicy`] gives up.
//!
//! Exhaustion is logged at `error` level and never reaches the caller. Until a
//! compensation lands, the affected holder's balance may read lower than its
//! true value.
//!
//! Compensations are also tracked per holder. A debit of a holder first
//! [`settle`](RollbackDispatcher::settle)s that holder, so it never spends a
//! change entry that a pending compensation is about to retire.

use crate::core::traits::LedgerStore;
use crate::types::{AccountId, EntryId, StoreError};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with exponential backoff
    ///
    /// A zero attempt count falls back to the default with a warning.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        let default = Self::default();

        let max_attempts = if max_attempts == 0 {
            warn!(
                max_attempts,
                default = default.max_attempts,
                "invalid rollback attempt count, using default"
            );
            default.max_attempts
        } else {
            max_attempts
        };

        Self {
            max_attempts,
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Create a policy that waits the same delay between every attempt
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, delay, delay)
    }

    /// Delay to wait after the given failed attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` attempts
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Undo work for one failed operation
///
/// `restore` entries go back to unconsumed. `retire` entries were created by
/// the failed operation (change entries) and are marked consumed so they stop
/// counting. Applying the same compensation twice leaves the same state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compensation {
    pub holder: AccountId,
    pub restore: Vec<EntryId>,
    pub retire: Vec<EntryId>,
}

impl Compensation {
    /// Compensation that only restores consumed entries
    pub fn restore(holder: &str, restore: Vec<EntryId>) -> Self {
        Self {
            holder: holder.to_string(),
            restore,
            retire: Vec::new(),
        }
    }

    /// Also retire a change entry, if there was one
    pub fn retiring(mut self, change: Option<EntryId>) -> Self {
        self.retire.extend(change);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.restore.is_empty() && self.retire.is_empty()
    }

    /// Apply once against the store
    pub async fn apply(&self, store: &dyn LedgerStore) -> Result<(), StoreError> {
        for id in &self.retire {
            store.mark_consumed(*id).await?;
        }
        if !self.restore.is_empty() {
            store.rollback_consumed(&self.restore).await?;
        }
        Ok(())
    }
}

/// Runs compensations in the background with retries
///
/// Cloning is cheap; clones share the same task trackers, so [`drain`]
/// and [`settle`] see compensations dispatched from any clone.
///
/// [`drain`]: RollbackDispatcher::drain
/// [`settle`]: RollbackDispatcher::settle
#[derive(Clone)]
pub struct RollbackDispatcher {
    store: Arc<dyn LedgerStore>,
    policy: RetryPolicy,
    tracker: TaskTracker,
    pending: Arc<DashMap<AccountId, TaskTracker>>,
}

impl RollbackDispatcher {
    pub fn new(store: Arc<dyn LedgerStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            tracker: TaskTracker::new(),
            pending: Arc::new(DashMap::new()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Schedule a compensation and return immediately
    ///
    /// Must be called from within a tokio runtime. Empty compensations are
    /// dropped without spawning anything.
    pub fn dispatch(&self, plan: Compensation) {
        if plan.is_empty() {
            return;
        }

        let holder_tracker = self
            .pending
            .entry(plan.holder.clone())
            .or_default()
            .value()
            .clone();
        let store = Arc::clone(&self.store);
        let policy = self.policy.clone();
        self.tracker.spawn(holder_tracker.track_future(async move {
            apply_with_retry(store.as_ref(), &policy, &plan).await;
        }));
    }

    /// Wait for the holder's pending compensations to finish
    ///
    /// Returns at once when none are pending.
    pub async fn settle(&self, holder: &str) {
        // Clone out so no map guard is held across the await
        let Some(tracker) = self.pending.get(holder).map(|entry| entry.value().clone())
        else {
            return;
        };

        if !tracker.is_empty() {
            debug!(%holder, pending = tracker.len(), "waiting for pending compensations");
            tracker.close();
            tracker.wait().await;
            tracker.reopen();
        }
        self.pending.remove_if(holder, |_, tracker| tracker.is_empty());
    }

    /// Number of the holder's compensations still running
    pub fn pending_for(&self, holder: &str) -> usize {
        self.pending
            .get(holder)
            .map_or(0, |entry| entry.value().len())
    }

    /// Wait for every compensation dispatched so far to finish
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Number of compensations still running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}

/// Apply a compensation until it succeeds or the policy is exhausted
///
/// Returns whether the compensation was applied.
pub async fn apply_with_retry(
    store: &dyn LedgerStore,
    policy: &RetryPolicy,
    plan: &Compensation,
) -> bool {
    let mut attempt = 1;
    loop {
        match plan.apply(store).await {
            Ok(()) => {
                info!(
                    holder = %plan.holder,
                    restored = plan.restore.len(),
                    retired = plan.retire.len(),
                    attempt,
                    "compensation applied"
                );
                return true;
            }
            Err(e) if policy.should_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    holder = %plan.holder,
                    attempt,
                    ?delay,
                    error = %e,
                    "compensation attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    holder = %plan.holder,
                    attempts = attempt,
                    restore = ?plan.restore,
                    retire = ?plan.retire,
                    error = %e,
                    "compensation abandoned after exhausting retries"
                );
                return false;
            }
        }
    }
}
