//! Defines the endpoint for taking cash out of an account.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    AppState,
    db::with_connection,
    money::Money,
    receipt::{Receipt, ReceiptSink, print_receipt},
    teller::{
        deposit_endpoint::{AmountForm, read_amount_form},
        withdraw,
    },
};

/// The state needed to make a withdrawal.
#[derive(Debug, Clone)]
pub struct WithdrawState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The fee charged on every withdrawal.
    pub withdrawal_fee: Money,
    /// Where to print receipts.
    pub receipt_sink: Arc<dyn ReceiptSink>,
    /// How long to wait for the printer.
    pub receipt_timeout: Duration,
}

impl FromRef<AppState> for WithdrawState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            withdrawal_fee: state.config.withdrawal_fee,
            receipt_sink: state.receipt_sink.clone(),
            receipt_timeout: state.config.receipt_timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct WithdrawResponse {
    new_balance: Money,
    fee: Money,
    amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt_warning: Option<String>,
}

/// A route handler for withdrawing cash from the account for the card `tag`.
///
/// The configured withdrawal fee is charged on top of the requested amount.
pub async fn withdraw_endpoint(
    State(state): State<WithdrawState>,
    Path(tag): Path<String>,
    form: Result<Json<AmountForm>, JsonRejection>,
) -> Response {
    let form = match read_amount_form(form) {
        Ok(form) => form,
        Err(error) => return error.into_response(),
    };

    let result = with_connection(&state.db_connection, |connection| {
        withdraw(&tag, form.amount, state.withdrawal_fee, connection)
    });

    let withdrawal = match result {
        Ok(withdrawal) => withdrawal,
        Err(error) => {
            tracing::debug!("Could not withdraw {} for card {tag:?}: {error}", form.amount);
            return error.into_response();
        }
    };

    let receipt_warning = if form.receipt {
        let receipt = Receipt::withdrawal(
            withdrawal.name,
            withdrawal.amount,
            withdrawal.fee,
            withdrawal.new_balance,
        );
        print_receipt(state.receipt_sink, receipt, state.receipt_timeout).await
    } else {
        None
    };

    Json(WithdrawResponse {
        new_balance: withdrawal.new_balance,
        fee: withdrawal.fee,
        amount: withdrawal.amount,
        receipt_warning,
    })
    .into_response()
}
