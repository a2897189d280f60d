//! CSV format handling for ledger commands, accounts and reports
//!
//! This module centralizes all CSV format concerns, providing:
//! - `CommandRecord` / `AccountRecord` structures for deserialization
//! - Conversion from CSV records to domain types
//! - Balance and entry report serialization
//!
//! All functions are pure (no file access) for easy testing.
//!
//! # Command Format
//!
//! ```text
//! type,account,counterparty,amount
//! deposit,alice,,100.00
//! withdrawal,alice,,25.50
//! payment,alice,bob,10
//! ```
//!
//! Amounts are written as positive magnitudes. A withdrawal's amount is
//! negated on the way in, since the engine expects debits as negative values.

use crate::types::{Account, Balance, Entry};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Command CSV row as read from disk
///
/// `counterparty` is only meaningful for payments.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CommandRecord {
    #[serde(rename = "type")]
    pub command: String,
    pub account: String,
    pub counterparty: Option<String>,
    pub amount: Option<String>,
}

/// Account CSV row as read from disk
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountRecord {
    pub id: String,
    pub name: String,
    pub last_name: String,
}

impl From<AccountRecord> for Account {
    fn from(record: AccountRecord) -> Self {
        Account::new(record.id, record.name, record.last_name)
    }
}

/// A ledger operation ready to hand to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    /// Positive amount credited to the account
    Deposit { account: String, amount: Decimal },
    /// Negative amount debited from the account
    Withdrawal { account: String, amount: Decimal },
    /// Positive amount moved from `owner` to `receiver`
    Payment {
        owner: String,
        receiver: String,
        amount: Decimal,
    },
}

impl LedgerCommand {
    /// Account the command acts on first
    pub fn account(&self) -> &str {
        match self {
            LedgerCommand::Deposit { account, .. } | LedgerCommand::Withdrawal { account, .. } => {
                account
            }
            LedgerCommand::Payment { owner, .. } => owner,
        }
    }
}

/// Convert a CommandRecord to a LedgerCommand
///
/// This function:
/// - Parses the command type (case-insensitive)
/// - Requires an amount for every command
/// - Requires a counterparty for payments
/// - Negates withdrawal amounts
///
/// Sign and range checks beyond that are left to the engine.
///
/// # Returns
///
/// - Ok(LedgerCommand) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_command_record(record: CommandRecord) -> Result<LedgerCommand, String> {
    let amount = match record.amount.as_deref().map(str::trim) {
        Some(amount_str) if !amount_str.is_empty() => Decimal::from_str(amount_str).map_err(|_| {
            format!(
                "Invalid amount '{}' for {} on account {}",
                amount_str, record.command, record.account
            )
        })?,
        _ => {
            return Err(format!(
                "{} on account {} requires an amount",
                record.command, record.account
            ))
        }
    };

    match record.command.to_lowercase().as_str() {
        "deposit" => Ok(LedgerCommand::Deposit {
            account: record.account,
            amount,
        }),
        "withdrawal" => Ok(LedgerCommand::Withdrawal {
            account: record.account,
            amount: -amount,
        }),
        "payment" => match record.counterparty {
            Some(receiver) if !receiver.trim().is_empty() => Ok(LedgerCommand::Payment {
                owner: record.account,
                receiver,
                amount,
            }),
            _ => Err(format!(
                "payment from account {} requires a counterparty",
                record.account
            )),
        },
        _ => Err(format!(
            "Invalid command type: '{}' for account {}",
            record.command, record.account
        )),
    }
}

/// Write holder balances to CSV format
///
/// Writes `account,balance` rows sorted by account id, balances with four
/// decimal places.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_balances_csv(balances: &[Balance], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["account", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = balances.to_vec();
    sorted.sort_by(|a, b| a.holder.cmp(&b.holder));

    for balance in sorted {
        writer
            .write_record(&[balance.holder, format!("{:.4}", balance.amount)])
            .map_err(|e| format!("Failed to write balance record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write ledger entries to CSV format
///
/// Entries are written in the order given, one row per entry with columns
/// `id,holder,source,target,created_at,amount,consumed`. Timestamps are
/// RFC 3339.
pub fn write_entries_csv(entries: &[Entry], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record([
            "id",
            "holder",
            "source",
            "target",
            "created_at",
            "amount",
            "consumed",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for entry in entries {
        writer
            .write_record(&[
                entry.id.to_string(),
                entry.holder.clone(),
                entry.source.clone(),
                entry.target.clone(),
                entry.created_at.to_rfc3339(),
                format!("{:.4}", entry.amount),
                entry.consumed.to_string(),
            ])
            .map_err(|e| format!("Failed to write entry record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use uuid::Uuid;

    fn record(command: &str, account: &str, counterparty: Option<&str>, amount: Option<&str>) -> CommandRecord {
        CommandRecord {
            command: command.to_string(),
            account: account.to_string(),
            counterparty: counterparty.map(str::to_string),
            amount: amount.map(str::to_string),
        }
    }

    #[rstest]
    #[case::deposit(
        record("deposit", "alice", None, Some("100.50")),
        LedgerCommand::Deposit { account: "alice".to_string(), amount: Decimal::new(10050, 2) }
    )]
    #[case::withdrawal_is_negated(
        record("withdrawal", "alice", None, Some("25")),
        LedgerCommand::Withdrawal { account: "alice".to_string(), amount: Decimal::new(-25, 0) }
    )]
    #[case::payment(
        record("payment", "alice", Some("bob"), Some("10")),
        LedgerCommand::Payment {
            owner: "alice".to_string(),
            receiver: "bob".to_string(),
            amount: Decimal::new(10, 0),
        }
    )]
    #[case::mixed_case_type(
        record("DePoSiT", "alice", None, Some(" 1 ")),
        LedgerCommand::Deposit { account: "alice".to_string(), amount: Decimal::ONE }
    )]
    fn test_convert_command_record(#[case] input: CommandRecord, #[case] expected: LedgerCommand) {
        assert_eq!(convert_command_record(input), Ok(expected));
    }

    #[rstest]
    #[case::unknown_type(record("refund", "alice", None, Some("1")), "Invalid command type")]
    #[case::missing_amount(record("deposit", "alice", None, None), "requires an amount")]
    #[case::blank_amount(record("deposit", "alice", None, Some("  ")), "requires an amount")]
    #[case::bad_amount(record("deposit", "alice", None, Some("abc")), "Invalid amount")]
    #[case::payment_without_counterparty(record("payment", "alice", None, Some("1")), "requires a counterparty")]
    #[case::payment_blank_counterparty(record("payment", "alice", Some(""), Some("1")), "requires a counterparty")]
    fn test_convert_command_record_errors(#[case] input: CommandRecord, #[case] message: &str) {
        let error = convert_command_record(input).unwrap_err();
        assert!(error.contains(message), "unexpected error: {}", error);
    }

    #[test]
    fn test_command_account() {
        let payment = LedgerCommand::Payment {
            owner: "alice".to_string(),
            receiver: "bob".to_string(),
            amount: Decimal::ONE,
        };
        assert_eq!(payment.account(), "alice");
    }

    #[test]
    fn test_write_balances_csv_sorted_with_four_places() {
        let balances = vec![
            Balance {
                holder: "bob".to_string(),
                amount: Decimal::new(5, 1),
            },
            Balance {
                holder: "alice".to_string(),
                amount: Decimal::new(100, 0),
            },
        ];
        let mut output = Vec::new();

        write_balances_csv(&balances, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,balance\nalice,100.0000\nbob,0.5000\n"
        );
    }

    #[test]
    fn test_write_entries_csv() {
        let id = Uuid::nil();
        let entries = vec![Entry {
            id,
            holder: "alice".to_string(),
            source: "alice".to_string(),
            target: "bob".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            amount: Decimal::new(-10, 0),
            consumed: true,
        }];
        let mut output = Vec::new();

        write_entries_csv(&entries, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            format!(
                "id,holder,source,target,created_at,amount,consumed\n\
                 {},alice,alice,bob,2024-01-02T03:04:05+00:00,-10.0000,true\n",
                id
            )
        );
    }

    #[test]
    fn test_account_record_conversion() {
        let account: Account = AccountRecord {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
        }
        .into();

        assert_eq!(account, Account::new("alice", "Alice", "Liddell"));
    }
}
