//! Kiosk ATM is the backend for a card-operated cash machine simulator.
//!
//! This library provides a JSON API over a single-file SQLite store for card
//! authentication, PIN checks, deposits, withdrawals, balance inquiries and
//! transaction history, together with the plumbing that connects the kiosk
//! hardware (card reader, keypad and receipt printer) to the API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod app_state;
mod card_session;
mod config;
mod database_id;
mod db;
pub mod endpoints;
mod hardware;
mod ledger;
mod logging;
mod money;
mod receipt;
mod routing;
mod teller;

#[cfg(test)]
mod test_utils;

pub use account::{Account, AccountId, seed_account};
pub use app_state::AppState;
pub use card_session::CardSession;
pub use config::{AtmConfig, DEFAULT_WITHDRAWAL_FEE};
pub use db::{initialize as initialize_db, open as open_db};
pub use hardware::{
    HardwareEvent, HardwareEventSource, KEY_MAP, KeyBroadcaster, MatrixKeypad, MatrixLines,
    ScriptedSource, StdinConsole, key_at, run_event_dispatcher, spawn_event_poller,
};
pub use ledger::{TransactionKind, TransactionRecord};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use money::Money;
pub use receipt::{
    DevicePrinter, LogPrinter, Receipt, ReceiptKind, ReceiptSink, print_receipt, render_receipt,
};
pub use routing::build_router;
pub use teller::{
    Deposit, Provisioned, Withdrawal, authenticate_tag, balance_of, check_pin, deposit, history,
    provision_tag, withdraw,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// No account is registered for the card tag.
    #[error("no account is registered for this card")]
    AccountNotFound,

    /// The card presented to the authenticated flow is not recognised.
    ///
    /// Unlike [Error::AccountNotFound], this error is returned when the card
    /// itself is the credential being checked.
    #[error("access denied: the card is not recognised")]
    AccessDenied,

    /// The PIN did not match the PIN on record for the card.
    #[error("incorrect PIN")]
    InvalidPin,

    /// The balance does not cover the requested amount plus the withdrawal fee.
    #[error("insufficient funds: a balance of {balance} does not cover {amount} plus a fee of {fee}")]
    InsufficientFunds {
        /// The balance at the time of the request.
        balance: Money,
        /// The amount the client asked for.
        amount: Money,
        /// The fee that would have been charged.
        fee: Money,
    },

    /// Amounts for deposits and withdrawals must be greater than zero and
    /// must not overflow the balance.
    #[error("invalid amount {0}, amounts must be greater than zero")]
    InvalidAmount(Money),

    /// The request body could not be read as a deposit or withdrawal, e.g.
    /// because the amount has a fraction of a cent or is not a number.
    #[error("invalid request: {0}")]
    InvalidRequestBody(String),

    /// An account with the tag already exists.
    ///
    /// This error is internal, callers that provision accounts should retry
    /// it as a lookup.
    #[error("an account for the card \"{0}\" already exists")]
    DuplicateTag(String),

    /// The printer or card reader could not be reached.
    ///
    /// This error is never escalated to the caller of a financial operation.
    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::AccountNotFound | Error::NotFound => StatusCode::NOT_FOUND,
            Error::AccessDenied | Error::InvalidPin => StatusCode::UNAUTHORIZED,
            Error::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidAmount(_) | Error::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Error::DuplicateTag(_) => StatusCode::CONFLICT,
            Error::HardwareUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::DatabaseLockError | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match self {
            // Storage errors are not intended to be shown to the client.
            Error::DatabaseLockError | Error::SqlError(_) => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            error => error.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod error_response_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::Value;

    use crate::{Error, Money};

    async fn get_body(error: Error) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn insufficient_funds_is_unprocessable() {
        let (status, body) = get_body(Error::InsufficientFunds {
            balance: Money::from_major(500),
            amount: Money::from_major(490),
            fee: Money::from_major(18),
        })
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["error"],
            "insufficient funds: a balance of 500.00 does not cover 490.00 plus a fee of 18.00"
        );
    }

    #[tokio::test]
    async fn credential_errors_are_unauthorized() {
        assert_eq!(
            get_body(Error::AccessDenied).await.0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_body(Error::InvalidPin).await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_amounts_are_bad_requests() {
        let (status, body) =
            get_body(Error::InvalidRequestBody("amount: 12.349 is not a valid amount of money".to_owned()))
                .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "invalid request: amount: 12.349 is not a valid amount of money"
        );
    }

    #[tokio::test]
    async fn sql_errors_are_hidden_from_the_client() {
        let (status, body) = get_body(Error::SqlError(rusqlite::Error::InvalidColumnIndex(0))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().contains("SQL"));
    }
}
