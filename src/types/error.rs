//! Error types for the ledger engine
//!
//! Two layers of errors live here:
//!
//! - [`StoreError`] is what the ledger store and account directory backends
//!   report. It is the collaborator contract and knows nothing about
//!   consumption or payments.
//! - [`LedgerError`] is what the engine and the replay pipeline report. Store
//!   failures are lifted into it through `From<StoreError>`, which maps the
//!   backend's not-found cases onto the engine's own variants.
//!
//! # Error Categories
//!
//! - **File I/O Errors**: File not found, permission denied, etc.
//! - **CSV Parsing Errors**: Malformed command or account rows
//! - **Ledger Errors**: Invalid amounts, insufficient balance, failed debit/credit legs
//! - **Invariant Errors**: A holder whose unconsumed entries sum below zero

use crate::types::EntryId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failures reported by a [`LedgerStore`](crate::core::LedgerStore) or
/// [`AccountDirectory`](crate::core::AccountDirectory) backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("entry is missing its holder")]
    MissingOwner,

    #[error("entry is missing its source account")]
    MissingSender,

    #[error("entry is missing its target account")]
    MissingReceiver,

    #[error("entry amount cannot be zero")]
    ZeroAmount,

    #[error("entry {id} not found")]
    TransactionNotFound { id: EntryId },

    #[error("account {account} not found")]
    AccountNotFound { account: String },

    /// Account creation without a name or last name
    #[error("account requires both a name and a last name")]
    MissingParams,

    /// The backend could not serve the request (connection lost, timeout, ...)
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }
}

/// Main error type for the ledger engine
///
/// Each variant carries enough context (holder, amounts, ids) to be logged
/// on its own without the surrounding call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// File not found at the specified path
    ///
    /// This is a fatal error that prevents replay from starting.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// Recoverable during replay: the malformed row is skipped.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// The referenced account is not in the directory
    #[error("Account {account} not found")]
    AccountNotFound {
        /// Account identifier that was looked up
        account: String,
    },

    /// The referenced ledger entry does not exist
    #[error("Transaction {id} not found")]
    TransactionNotFound {
        /// Entry identifier that was looked up
        id: EntryId,
    },

    /// Amount has the wrong sign (or is zero) for the operation
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
        /// Operation that rejected it
        operation: String,
    },

    /// The holder cannot cover the requested debit
    #[error("Insufficient balance for account {holder}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        /// Account being debited
        holder: String,
        /// Spendable balance at the time of the check
        balance: Decimal,
        /// Magnitude of the debit
        requested: Decimal,
    },

    /// A payment where payer and payee are the same account
    #[error("Account {account} cannot pay itself")]
    InvalidPaymentOperation {
        /// The account on both sides of the payment
        account: String,
    },

    /// The debit leg of an operation could not be completed
    ///
    /// Any entries consumed before the failure are handed to the
    /// compensation dispatcher before this error is returned.
    #[error("Debit operation failed for account {holder}")]
    FailedDebitOperation {
        /// Account being debited
        holder: String,
    },

    /// The credit leg of a payment could not be completed
    #[error("Credit operation failed for account {holder}")]
    FailedCreditOperation {
        /// Account that should have been credited
        holder: String,
    },

    /// The holder's unconsumed entries sum to a negative value
    #[error("Negative balance invariant violated for account {holder}: balance {balance}")]
    NegativeBalanceInvariantViolated {
        /// Account with the corrupt balance
        holder: String,
        /// The negative sum that was observed
        balance: Decimal,
    },

    /// Any other failure reported by a store backend
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::TransactionNotFound { id } => LedgerError::TransactionNotFound { id },
            StoreError::AccountNotFound { account } => LedgerError::AccountNotFound { account },
            other => LedgerError::Storage(other),
        }
    }
}

// Conversion from io::Error to LedgerError
impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to LedgerError
impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an AccountNotFound error
    pub fn account_not_found(account: &str) -> Self {
        LedgerError::AccountNotFound {
            account: account.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        LedgerError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(holder: &str, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientBalance {
            holder: holder.to_string(),
            balance,
            requested,
        }
    }

    /// Create an InvalidPaymentOperation error
    pub fn invalid_payment(account: &str) -> Self {
        LedgerError::InvalidPaymentOperation {
            account: account.to_string(),
        }
    }

    /// Create a FailedDebitOperation error
    pub fn failed_debit(holder: &str) -> Self {
        LedgerError::FailedDebitOperation {
            holder: holder.to_string(),
        }
    }

    /// Create a FailedCreditOperation error
    pub fn failed_credit(holder: &str) -> Self {
        LedgerError::FailedCreditOperation {
            holder: holder.to_string(),
        }
    }

    /// Create a NegativeBalanceInvariantViolated error
    pub fn negative_balance(holder: &str, balance: Decimal) -> Self {
        LedgerError::NegativeBalanceInvariantViolated {
            holder: holder.to_string(),
            balance,
        }
    }
}
