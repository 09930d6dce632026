//! Defines the append-only transaction ledger and its queries.

use std::fmt;

use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    account::AccountId,
    database_id::TransactionId,
    money::Money,
};

// ============================================================================
// MODELS
// ============================================================================

/// What a ledger entry did to the balance.
///
/// The amount on a [TransactionRecord] is always a magnitude, the kind
/// carries the sign: deposits add to the balance, withdrawals and fees
/// subtract from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money paid into the account.
    Deposit,
    /// Cash taken out of the account.
    Withdraw,
    /// The surcharge for a withdrawal.
    Fee,
}

impl TransactionKind {
    /// The name used for the kind in the database and in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Fee => "fee",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" => Ok(TransactionKind::Withdraw),
            "fee" => Ok(TransactionKind::Fee),
            other => Err(FromSqlError::Other(
                format!("unknown transaction kind \"{other}\"").into(),
            )),
        }
    }
}

/// An immutable entry in the ledger of an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    /// The ID of the record, increases with every append.
    pub id: TransactionId,
    /// The account whose balance the record changed.
    pub account_id: AccountId,
    /// What the record did to the balance.
    pub kind: TransactionKind,
    /// How much the balance changed by.
    pub amount: Money,
    /// When the record was appended.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the ledger table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_ledger_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('deposit', 'withdraw', 'fee')),
                amount INTEGER NOT NULL CHECK (amount >= 0),
                timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(account_id) REFERENCES accounts(id) ON UPDATE CASCADE ON DELETE RESTRICT
                )",
        (),
    )?;

    // Covers the newest-first history query.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_account_id ON transactions(account_id, id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [TransactionRecord].
pub fn map_transaction_row(row: &Row) -> Result<TransactionRecord, rusqlite::Error> {
    let id = row.get(0)?;
    let account_id = row.get(1)?;
    let kind = row.get(2)?;
    let amount = row.get(3)?;
    let timestamp = row.get(4)?;

    Ok(TransactionRecord {
        id,
        account_id,
        kind,
        amount,
        timestamp,
    })
}

/// Append a record to the ledger of `account_id`, timestamped with the
/// current time.
///
/// # Errors
/// This function will return a:
/// - [Error::AccountNotFound] if `account_id` does not refer to an account,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn append(
    account_id: AccountId,
    kind: TransactionKind,
    amount: Money,
    connection: &Connection,
) -> Result<TransactionRecord, Error> {
    connection
        .prepare(
            "INSERT INTO transactions (account_id, kind, amount, timestamp)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, account_id, kind, amount, timestamp",
        )?
        .query_row(
            params![account_id, kind, amount, OffsetDateTime::now_utc()],
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::AccountNotFound,
            error => error.into(),
        })
}

/// Get up to `limit` of the most recent records for `account_id`, newest
/// first.
///
/// # Errors
/// This function will return a:
/// - [Error::AccountNotFound] if `account_id` does not refer to an account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn recent(
    account_id: AccountId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<TransactionRecord>, Error> {
    let account_exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?1)",
        params![account_id],
        |row| row.get(0),
    )?;

    if !account_exists {
        return Err(Error::AccountNotFound);
    }

    connection
        .prepare(
            "SELECT id, account_id, kind, amount, timestamp FROM transactions
             WHERE account_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?
        .query_map(params![account_id, limit], map_transaction_row)?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
