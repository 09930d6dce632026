//! Opening and initialising the application's SQLite database.

use std::{path::Path, sync::Mutex, time::Duration};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, account::create_account_table, ledger::create_ledger_table};

/// How long a connection waits for another connection's write lock before
/// giving up with `SQLITE_BUSY`.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create the tables for the domain models if they do not already exist.
///
/// This also enables foreign key enforcement for `connection`.
///
/// # Errors
/// Returns an error if the tables cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction, SQLite ignores it otherwise.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_account_table(&transaction)?;
    create_ledger_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Open the database file at `path`, creating and initialising it if needed.
///
/// # Errors
/// Returns an error if the file cannot be opened or initialised.
pub fn open(path: impl AsRef<Path>) -> Result<Connection, Error> {
    let connection = Connection::open(path)?;
    connection.busy_timeout(BUSY_TIMEOUT)?;
    initialize(&connection)?;

    Ok(connection)
}

/// Run `operation` with exclusive access to the shared connection.
///
/// The lock is released when `operation` returns, on both the success and
/// the error path, so callers must not hold on to the connection across an
/// `.await`.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned, otherwise
/// whatever `operation` returns.
pub fn with_connection<T>(
    db_connection: &Mutex<Connection>,
    operation: impl FnOnce(&Connection) -> Result<T, Error>,
) -> Result<T, Error> {
    let connection = db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    operation(&connection)
}
