//! Defines the account model and the queries for the account table.

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::{Error, database_id::DatabaseId, money::Money};

/// The ID of an account.
pub type AccountId = DatabaseId;

/// The balance given to accounts that are provisioned from an unknown card.
pub const DEFAULT_BALANCE: Money = Money::from_major(100);

/// A bank account that is operated with a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The identifier read from the card, unique across accounts.
    pub tag: String,
    /// The card holder's display name.
    pub name: Option<String>,
    /// The money available in the account.
    pub balance: Money,
    /// The PIN for the card, compared in plain text.
    #[serde(skip)]
    pub pin: Option<String>,
}

/// Create the account table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag TEXT NOT NULL UNIQUE,
            name TEXT,
            balance INTEGER NOT NULL DEFAULT 0,
            pin TEXT
        )",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [Account].
pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let tag = row.get(1)?;
    let name = row.get(2)?;
    let balance = row.get(3)?;
    let pin = row.get(4)?;

    Ok(Account {
        id,
        tag,
        name,
        balance,
        pin,
    })
}

/// Get the account registered to the card `tag`, if there is one.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn find_by_tag(tag: &str, connection: &Connection) -> Result<Option<Account>, Error> {
    let account = connection
        .prepare("SELECT id, tag, name, balance, pin FROM accounts WHERE tag = ?1")?
        .query_row(params![tag], map_row_to_account)
        .optional()?;

    Ok(account)
}

/// Create an account for `tag` with `balance` and no name or PIN.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateTag] if an account for `tag` already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_default(tag: &str, balance: Money, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(
            "INSERT INTO accounts (tag, balance) VALUES (?1, ?2)
             RETURNING id, tag, name, balance, pin",
        )?
        .query_row(params![tag, balance], map_row_to_account)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateTag(tag.to_owned()),
            error => error.into(),
        })
}

/// Register a card with a name, opening balance and PIN.
///
/// Cards that are already registered are left untouched.
/// Returns `true` if a new account was created.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn seed_account(
    tag: &str,
    name: &str,
    balance: Money,
    pin: &str,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_inserted = connection.execute(
        "INSERT OR IGNORE INTO accounts (tag, name, balance, pin) VALUES (?1, ?2, ?3, ?4)",
        params![tag, name, balance, pin],
    )?;

    Ok(rows_inserted == 1)
}

/// Overwrite the balance of the account `account_id`.
///
/// Only the teller operations may call this, they are responsible for
/// keeping the balance consistent with the ledger.
///
/// # Errors
/// This function will return a:
/// - [Error::AccountNotFound] if `account_id` does not refer to an account,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn update_balance(
    account_id: AccountId,
    new_balance: Money,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE accounts SET balance = ?1 WHERE id = ?2",
        params![new_balance, account_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::AccountNotFound);
    }

    Ok(())
}

/// Check whether `candidate` matches the PIN of the card `tag`.
///
/// Accounts without a PIN never match.
///
/// # Errors
/// This function will return a:
/// - [Error::AccountNotFound] if no account is registered to `tag`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn verify_pin(tag: &str, candidate: &str, connection: &Connection) -> Result<bool, Error> {
    // TODO: store a salted hash of the PIN instead of the PIN itself.
    let account = find_by_tag(tag, connection)?.ok_or(Error::AccountNotFound)?;

    Ok(account.pin.as_deref() == Some(candidate))
}
