//! Fund consumption engine
//!
//! [`LedgerEngine`] turns deposits, withdrawals and payments into ledger
//! entries. Balances are never stored: a holder's balance is the sum of its
//! unconsumed entries, and spending funds means flipping entries to consumed.
//!
//! # Debit Walk
//!
//! A debit of magnitude `m` walks the holder's unconsumed entries oldest
//! first, marking each one consumed:
//!
//! ```text
//! entries: 200 (t0)  100 (t1)  300 (t2)     debit: 400
//!          consumed  consumed  consumed     change: +200 (holder, target)
//! ```
//!
//! When the last consumed entry covers more than what was still owed, a new
//! unconsumed "change" entry carries the difference back to the holder.
//!
//! # Failure Handling
//!
//! The store offers no multi-row transactions. If a step fails after entries
//! were already consumed, the engine dispatches a [`Compensation`] to the
//! [`RollbackDispatcher`] and returns the error immediately. The holder's
//! balance may read low until the compensation lands in the background, and
//! the holder's next debit waits for it to land.
//!
//! # Concurrency
//!
//! The engine holds no mutable state of its own. At most one mutating call
//! per holder is expected to be in flight; concurrent debits of the same
//! holder can race on the read-then-mark sequence.

use crate::core::clock::SystemClock;
use crate::core::rollback::{Compensation, RetryPolicy, RollbackDispatcher};
use crate::core::traits::{AccountDirectory, Clock, LedgerStore};
use crate::types::{DebitOutcome, Entry, EntryId, LedgerError, NewEntry, PaymentReceipt};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ledger engine over pluggable store, directory and clock
///
/// Cloning is cheap and clones share the same collaborators and
/// compensation dispatcher.
#[derive(Clone)]
pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    directory: Arc<dyn AccountDirectory>,
    clock: Arc<dyn Clock>,
    rollbacks: RollbackDispatcher,
}

impl LedgerEngine {
    /// Create an engine using wall-clock time and the default retry policy
    ///
    /// # Arguments
    ///
    /// * `store` - Ledger entry persistence
    /// * `directory` - Account existence checks
    pub fn new(store: Arc<dyn LedgerStore>, directory: Arc<dyn AccountDirectory>) -> Self {
        let rollbacks = RollbackDispatcher::new(Arc::clone(&store), RetryPolicy::default());
        Self {
            store,
            directory,
            clock: Arc::new(SystemClock),
            rollbacks,
        }
    }

    /// Replace the time source used to stamp new entries
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the retry policy used for compensations
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.rollbacks = RollbackDispatcher::new(Arc::clone(&self.store), policy);
        self
    }

    /// The dispatcher running this engine's compensations
    pub fn rollbacks(&self) -> &RollbackDispatcher {
        &self.rollbacks
    }

    async fn ensure_account(&self, id: &str) -> Result<(), LedgerError> {
        self.directory.find_one(id).await?;
        Ok(())
    }

    /// Spendable balance of a holder
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` - the holder is not in the directory
    /// * `NegativeBalanceInvariantViolated` - the stored sum is below zero
    pub async fn balance_of(&self, holder: &str) -> Result<Decimal, LedgerError> {
        self.ensure_account(holder).await?;

        let balance = self.store.balance_of(holder).await?;
        if balance < Decimal::ZERO {
            return Err(LedgerError::negative_balance(holder, balance));
        }

        Ok(balance)
    }

    /// Record one unconsumed entry adding `amount` to `holder`
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - `amount` is zero or negative
    /// * `Storage` - the store rejected the entry
    pub async fn credit(
        &self,
        holder: &str,
        source: &str,
        target: &str,
        amount: Decimal,
    ) -> Result<EntryId, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount, "credit"));
        }

        let id = self
            .store
            .create(NewEntry {
                holder: holder.to_string(),
                source: source.to_string(),
                target: target.to_string(),
                created_at: self.clock.now(),
                amount,
                consumed: false,
            })
            .await?;

        debug!(%holder, %source, %target, %amount, entry = %id, "credit recorded");
        Ok(id)
    }

    /// Add funds to an existing account
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - `amount` is zero or negative
    /// * `AccountNotFound` - the holder is not in the directory
    pub async fn deposit(&self, holder: &str, amount: Decimal) -> Result<EntryId, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount, "deposit"));
        }
        self.ensure_account(holder).await?;

        let id = self.credit(holder, holder, holder, amount).await?;
        info!(%holder, %amount, entry = %id, "deposit completed");
        Ok(id)
    }

    /// Consume the holder's funds oldest first
    ///
    /// `amount` is negative; its magnitude is what gets removed. Any unused
    /// remainder of the last consumed entry is credited back to `holder` as a
    /// change entry whose target is `target`.
    ///
    /// Waits for the holder's pending compensations before reading the
    /// balance.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - `amount` is zero or positive
    /// * `InsufficientBalance` - the holder cannot cover the debit; nothing is modified
    /// * `FailedDebitOperation` - a store write failed mid-walk; the entries
    ///   consumed so far are handed to the compensation dispatcher
    pub async fn debit(
        &self,
        holder: &str,
        target: &str,
        amount: Decimal,
    ) -> Result<DebitOutcome, LedgerError> {
        if amount >= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount, "debit"));
        }

        self.rollbacks.settle(holder).await;

        let balance = self.store.balance_of(holder).await?;
        if balance + amount < Decimal::ZERO {
            return Err(LedgerError::insufficient_balance(holder, balance, -amount));
        }

        let mut available: Vec<Entry> = self
            .store
            .find_all(holder)
            .await?
            .into_iter()
            .filter(|entry| !entry.consumed)
            .collect();
        // Stable, so equal timestamps keep the store's order
        available.sort_by_key(|entry| entry.created_at);

        let mut remaining = -amount;
        let mut outcome = DebitOutcome::default();

        for entry in &available {
            if let Err(e) = self.store.mark_consumed(entry.id).await {
                warn!(
                    %holder,
                    entry = %entry.id,
                    consumed = outcome.consumed.len(),
                    error = %e,
                    "failed to consume entry, compensating"
                );
                self.rollbacks
                    .dispatch(Compensation::restore(holder, outcome.consumed));
                return Err(LedgerError::failed_debit(holder));
            }
            outcome.consumed.push(entry.id);

            let leftover = entry.amount - remaining;
            debug!(
                %holder,
                entry = %entry.id,
                entry_amount = %entry.amount,
                %remaining,
                %leftover,
                "entry consumed"
            );

            if leftover.is_zero() {
                remaining = Decimal::ZERO;
                break;
            }

            if leftover < Decimal::ZERO {
                remaining -= entry.amount;
                continue;
            }

            match self.credit(holder, holder, target, leftover).await {
                Ok(change) => {
                    outcome.change = Some(change);
                    remaining = Decimal::ZERO;
                    break;
                }
                Err(e) => {
                    warn!(%holder, %leftover, error = %e, "failed to credit change, compensating");
                    self.rollbacks
                        .dispatch(Compensation::restore(holder, outcome.consumed));
                    return Err(LedgerError::failed_debit(holder));
                }
            }
        }

        if remaining > Decimal::ZERO {
            // Balance looked sufficient but the unconsumed entries ran out
            warn!(%holder, %remaining, "debit walk ended unsettled, compensating");
            self.rollbacks
                .dispatch(Compensation::restore(holder, outcome.consumed));
            return Err(LedgerError::failed_debit(holder));
        }

        Ok(outcome)
    }

    /// Remove funds from an account
    ///
    /// `amount` is negative. On success the withdrawal itself is recorded as
    /// a consumed entry carrying `amount`, and its id is returned.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` - the holder is not in the directory
    /// * any error from [`debit`](Self::debit)
    /// * `FailedDebitOperation` - the withdrawal record could not be written;
    ///   the consumption is compensated in the background
    pub async fn withdraw(&self, holder: &str, amount: Decimal) -> Result<EntryId, LedgerError> {
        self.ensure_account(holder).await?;

        let outcome = self.debit(holder, holder, amount).await?;

        let marker = NewEntry {
            holder: holder.to_string(),
            source: holder.to_string(),
            target: holder.to_string(),
            created_at: self.clock.now(),
            amount,
            consumed: true,
        };
        match self.store.create(marker).await {
            Ok(id) => {
                info!(%holder, %amount, entry = %id, consumed = outcome.consumed.len(), "withdrawal completed");
                Ok(id)
            }
            Err(e) => {
                warn!(%holder, error = %e, "failed to record withdrawal, compensating");
                self.rollbacks.dispatch(
                    Compensation::restore(holder, outcome.consumed).retiring(outcome.change),
                );
                Err(LedgerError::failed_debit(holder))
            }
        }
    }

    /// Move funds from `owner` to `receiver`
    ///
    /// The sign of `amount` is ignored. The payer's funds are consumed and a
    /// consumed marker of `-amount` is recorded against the payer, then an
    /// unconsumed entry of `amount` is recorded against the payee.
    ///
    /// # Errors
    ///
    /// * `InvalidPaymentOperation` - `owner` and `receiver` are the same account
    /// * `AccountNotFound` - either account is not in the directory
    /// * any error from [`debit`](Self::debit)
    /// * `FailedDebitOperation` - the payer's marker could not be written
    /// * `FailedCreditOperation` - the payee's entry could not be written
    ///
    /// Both failure kinds compensate the payer in the background.
    pub async fn pay(
        &self,
        owner: &str,
        receiver: &str,
        amount: Decimal,
    ) -> Result<PaymentReceipt, LedgerError> {
        if owner == receiver {
            return Err(LedgerError::invalid_payment(owner));
        }
        self.ensure_account(owner).await?;
        self.ensure_account(receiver).await?;

        let amount = amount.abs();
        let outcome = self.debit(owner, receiver, -amount).await?;

        let marker = NewEntry {
            holder: owner.to_string(),
            source: owner.to_string(),
            target: receiver.to_string(),
            created_at: self.clock.now(),
            amount: -amount,
            consumed: true,
        };
        let debit = match self.store.create(marker).await {
            Ok(id) => id,
            Err(e) => {
                warn!(%owner, %receiver, error = %e, "failed to record payment debit, compensating");
                self.rollbacks.dispatch(
                    Compensation::restore(owner, outcome.consumed).retiring(outcome.change),
                );
                return Err(LedgerError::failed_debit(owner));
            }
        };

        let credit = match self.credit(receiver, owner, receiver, amount).await {
            Ok(id) => id,
            Err(e) => {
                // The payer's marker stays consumed and never counts toward balance
                warn!(%owner, %receiver, error = %e, "failed to credit payee, compensating payer");
                self.rollbacks.dispatch(
                    Compensation::restore(owner, outcome.consumed).retiring(outcome.change),
                );
                return Err(LedgerError::failed_credit(receiver));
            }
        };

        info!(%owner, %receiver, %amount, %debit, %credit, "payment completed");
        Ok(PaymentReceipt { debit, credit })
    }

    /// Look up a single entry
    pub async fn get_transaction(&self, id: EntryId) -> Result<Entry, LedgerError> {
        Ok(self.store.find_one(id).await?)
    }

    /// Every entry of a holder, consumed or not, oldest first
    pub async fn get_all_transactions(&self, holder: &str) -> Result<Vec<Entry>, LedgerError> {
        self.ensure_account(holder).await?;
        Ok(self.store.find_all(holder).await?)
    }
}
