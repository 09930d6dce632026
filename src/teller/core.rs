//! The operations that move money in and out of accounts.
//!
//! These are the only functions that change an account's balance. Each one
//! runs as a single `IMMEDIATE` SQLite transaction: the write lock is taken
//! before the balance is read, so concurrent operations on the same account
//! are serialised, and the balance update commits together with its ledger
//! records or not at all.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    account::{Account, create_default, find_by_tag, update_balance, verify_pin},
    ledger::{TransactionKind, TransactionRecord, append, recent},
    money::Money,
};

/// The result of a successful deposit.
#[derive(Debug, Clone, PartialEq)]
pub struct Deposit {
    /// The card holder's name, for the receipt.
    pub name: Option<String>,
    /// The amount paid in.
    pub amount: Money,
    /// The balance after the deposit.
    pub new_balance: Money,
}

/// The result of a successful withdrawal.
#[derive(Debug, Clone, PartialEq)]
pub struct Withdrawal {
    /// The card holder's name, for the receipt.
    pub name: Option<String>,
    /// The amount of cash taken out.
    pub amount: Money,
    /// The fee charged on top of `amount`.
    pub fee: Money,
    /// The balance after the withdrawal and fee.
    pub new_balance: Money,
}

/// The result of provisioning a card.
#[derive(Debug, Clone, PartialEq)]
pub struct Provisioned {
    /// The account registered to the card.
    pub account: Account,
    /// Whether the account was created by this call.
    pub created: bool,
}

fn require_account(tag: &str, connection: &Connection) -> Result<Account, Error> {
    find_by_tag(tag, connection)?.ok_or(Error::AccountNotFound)
}

/// Pay `amount` into the account for the card `tag`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `amount` is not positive or the new balance would overflow,
/// - [Error::AccountNotFound] if no account is registered to `tag`,
/// - or [Error::SqlError] if there is some SQL error, in which case nothing is changed.
pub fn deposit(tag: &str, amount: Money, connection: &Connection) -> Result<Deposit, Error> {
    if !amount.is_positive() {
        return Err(Error::InvalidAmount(amount));
    }

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let account = require_account(tag, &transaction)?;
    let new_balance = account
        .balance
        .checked_add(amount)
        .ok_or(Error::InvalidAmount(amount))?;

    update_balance(account.id, new_balance, &transaction)?;
    append(account.id, TransactionKind::Deposit, amount, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        account_id = account.id,
        %amount,
        %new_balance,
        "Deposit committed"
    );

    Ok(Deposit {
        name: account.name,
        amount,
        new_balance,
    })
}

/// Take `amount` out of the account for the card `tag`, charging `fee` on top.
///
/// The withdrawal is rejected unless the balance covers both `amount` and
/// `fee`. On success the ledger gains a `withdraw` record for `amount` and a
/// `fee` record for `fee`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `amount` is not positive,
/// - [Error::AccountNotFound] if no account is registered to `tag`,
/// - [Error::InsufficientFunds] if the balance is less than `amount + fee`,
/// - or [Error::SqlError] if there is some SQL error, in which case nothing is changed.
pub fn withdraw(
    tag: &str,
    amount: Money,
    fee: Money,
    connection: &Connection,
) -> Result<Withdrawal, Error> {
    if !amount.is_positive() {
        return Err(Error::InvalidAmount(amount));
    }

    let total = amount
        .checked_add(fee)
        .ok_or(Error::InvalidAmount(amount))?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let account = require_account(tag, &transaction)?;

    if account.balance < total {
        tracing::info!(
            account_id = account.id,
            balance = %account.balance,
            %amount,
            %fee,
            "Rejected withdrawal, insufficient funds"
        );

        return Err(Error::InsufficientFunds {
            balance: account.balance,
            amount,
            fee,
        });
    }

    let new_balance = account
        .balance
        .checked_sub(total)
        .ok_or(Error::InvalidAmount(amount))?;

    update_balance(account.id, new_balance, &transaction)?;
    append(account.id, TransactionKind::Withdraw, amount, &transaction)?;
    append(account.id, TransactionKind::Fee, fee, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        account_id = account.id,
        %amount,
        %fee,
        %new_balance,
        "Withdrawal committed"
    );

    Ok(Withdrawal {
        name: account.name,
        amount,
        fee,
        new_balance,
    })
}

/// Get the balance of the account for the card `tag`.
///
/// # Errors
/// This function will return a:
/// - [Error::AccountNotFound] if no account is registered to `tag`,
/// - or [Error::SqlError] if there is some SQL error.
pub fn balance_of(tag: &str, connection: &Connection) -> Result<Money, Error> {
    require_account(tag, connection).map(|account| account.balance)
}

/// Get up to `limit` of the most recent ledger records for the card `tag`,
/// newest first.
///
/// # Errors
/// This function will return a:
/// - [Error::AccountNotFound] if no account is registered to `tag`,
/// - or [Error::SqlError] if there is some SQL error.
pub fn history(
    tag: &str,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<TransactionRecord>, Error> {
    // Read the account and its records from the same snapshot.
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Deferred)?;

    let account = require_account(tag, &transaction)?;
    let records = recent(account.id, limit, &transaction)?;

    transaction.commit()?;

    Ok(records)
}

/// Check that the card `tag` belongs to an account.
///
/// Unknown cards are rejected, they are never registered by this function.
/// See [provision_tag] for registering unknown cards.
///
/// # Errors
/// This function will return a:
/// - [Error::AccessDenied] if no account is registered to `tag`,
/// - or [Error::SqlError] if there is some SQL error.
pub fn authenticate_tag(tag: &str, connection: &Connection) -> Result<Account, Error> {
    match find_by_tag(tag, connection)? {
        Some(account) => Ok(account),
        None => {
            tracing::warn!("Denied access to unrecognised card {tag:?}");
            Err(Error::AccessDenied)
        }
    }
}

/// Check `pin` against the PIN on record for the card `tag`.
///
/// # Errors
/// This function will return a:
/// - [Error::AccountNotFound] if no account is registered to `tag`,
/// - [Error::InvalidPin] if `pin` does not match,
/// - or [Error::SqlError] if there is some SQL error.
pub fn check_pin(tag: &str, pin: &str, connection: &Connection) -> Result<(), Error> {
    if verify_pin(tag, pin, connection)? {
        Ok(())
    } else {
        tracing::warn!("Incorrect PIN entered for card {tag:?}");
        Err(Error::InvalidPin)
    }
}

/// Get the account for the card `tag`, registering the card with
/// `default_balance` if it is unknown.
///
/// This is the legacy card-tap behaviour and is deliberately separate from
/// [authenticate_tag]. If another connection registers the same card first,
/// its account is returned instead of creating a second one.
///
/// # Errors
/// Returns [Error::SqlError] if there is some SQL error.
pub fn provision_tag(
    tag: &str,
    default_balance: Money,
    connection: &Connection,
) -> Result<Provisioned, Error> {
    if let Some(account) = find_by_tag(tag, connection)? {
        return Ok(Provisioned {
            account,
            created: false,
        });
    }

    match create_default(tag, default_balance, connection) {
        Ok(account) => {
            tracing::info!("Provisioned new account {} for card {tag:?}", account.id);

            Ok(Provisioned {
                account,
                created: true,
            })
        }
        Err(Error::DuplicateTag(_)) => {
            tracing::debug!("Card {tag:?} was provisioned concurrently, using existing account");

            let account = find_by_tag(tag, connection)?.ok_or(Error::AccountNotFound)?;

            Ok(Provisioned {
                account,
                created: false,
            })
        }
        Err(error) => Err(error),
    }
}
