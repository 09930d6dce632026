//! Defines the endpoint for paying money into an account.

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
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    db::with_connection,
    money::Money,
    receipt::{Receipt, ReceiptSink, print_receipt},
    teller::deposit,
};

/// The state needed to make a deposit.
#[derive(Debug, Clone)]
pub struct DepositState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where to print receipts.
    pub receipt_sink: Arc<dyn ReceiptSink>,
    /// How long to wait for the printer.
    pub receipt_timeout: Duration,
}

impl FromRef<AppState> for DepositState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            receipt_sink: state.receipt_sink.clone(),
            receipt_timeout: state.config.receipt_timeout,
        }
    }
}

/// The request body for deposits and withdrawals.
#[derive(Debug, Clone, Deserialize)]
pub struct AmountForm {
    /// The amount in major currency units, e.g. `50.0`.
    pub amount: Money,
    /// Whether to print a receipt.
    #[serde(default)]
    pub receipt: bool,
}

/// Turn a rejected deposit or withdrawal body into a JSON error.
///
/// Amounts that cannot be represented in whole cents fail to deserialize, so
/// they are reported here rather than by the teller operations.
pub(crate) fn read_amount_form(
    form: Result<Json<AmountForm>, JsonRejection>,
) -> Result<AmountForm, Error> {
    match form {
        Ok(Json(form)) => Ok(form),
        Err(rejection) => {
            tracing::debug!("Rejected amount form: {rejection}");
            Err(Error::InvalidRequestBody(rejection.body_text()))
        }
    }
}

#[derive(Debug, Serialize)]
struct DepositResponse {
    new_balance: Money,
    amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt_warning: Option<String>,
}

/// A route handler for depositing money into the account for the card `tag`.
///
/// The receipt, if requested, is printed after the deposit has committed. A
/// printer failure is reported as `receipt_warning` and does not undo the
/// deposit.
pub async fn deposit_endpoint(
    State(state): State<DepositState>,
    Path(tag): Path<String>,
    form: Result<Json<AmountForm>, JsonRejection>,
) -> Response {
    let form = match read_amount_form(form) {
        Ok(form) => form,
        Err(error) => return error.into_response(),
    };

    let result = with_connection(&state.db_connection, |connection| {
        deposit(&tag, form.amount, connection)
    });

    let deposit = match result {
        Ok(deposit) => deposit,
        Err(error) => {
            tracing::debug!("Could not deposit {} for card {tag:?}: {error}", form.amount);
            return error.into_response();
        }
    };

    let receipt_warning = if form.receipt {
        let receipt = Receipt::deposit(deposit.name, deposit.amount, deposit.new_balance);
        print_receipt(state.receipt_sink, receipt, state.receipt_timeout).await
    } else {
        None
    };

    Json(DepositResponse {
        new_balance: deposit.new_balance,
        amount: deposit.amount,
        receipt_warning,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        account::seed_account,
        db::initialize,
        money::Money,
        receipt::test_utils::{OfflinePrinter, RecordingPrinter},
        teller::balance_of,
        test_utils::body_json,
    };

    use super::{AmountForm, DepositState, deposit_endpoint};

    fn get_test_state(receipt_sink: Arc<dyn crate::receipt::ReceiptSink>) -> DepositState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        seed_account("49375347824", "Jomar", Money::from_major(500), "1234", &conn).unwrap();

        DepositState {
            db_connection: Arc::new(Mutex::new(conn)),
            receipt_sink,
            receipt_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn deposit_returns_new_balance() {
        let state = get_test_state(Arc::new(RecordingPrinter::default()));

        let response = deposit_endpoint(
            State(state.clone()),
            Path("49375347824".to_owned()),
            Ok(Json(AmountForm {
                amount: Money::from_major(25),
                receipt: false,
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"new_balance": 525.0, "amount": 25.0})
        );
        let conn = state.db_connection.lock().unwrap();
        assert_eq!(balance_of("49375347824", &conn), Ok(Money::from_major(525)));
    }

    #[tokio::test]
    async fn deposit_prints_receipt_on_request() {
        let printer = Arc::new(RecordingPrinter::default());
        let state = get_test_state(printer.clone());

        let response = deposit_endpoint(
            State(state),
            Path("49375347824".to_owned()),
            Ok(Json(AmountForm {
                amount: Money::from_major(25),
                receipt: true,
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let printed = printer.printed.lock().unwrap();
        assert_eq!(printed.len(), 1);
        assert!(printed[0].contains("DEPOSIT"));
        assert!(printed[0].contains("525.00"));
    }

    #[tokio::test]
    async fn printer_failure_keeps_deposit() {
        let state = get_test_state(Arc::new(OfflinePrinter));

        let response = deposit_endpoint(
            State(state.clone()),
            Path("49375347824".to_owned()),
            Ok(Json(AmountForm {
                amount: Money::from_major(25),
                receipt: true,
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["new_balance"], json!(525.0));
        assert!(body["receipt_warning"].as_str().unwrap().contains("offline"));
        let conn = state.db_connection.lock().unwrap();
        assert_eq!(balance_of("49375347824", &conn), Ok(Money::from_major(525)));
    }

    #[tokio::test]
    async fn deposit_rejects_zero_amount() {
        let state = get_test_state(Arc::new(RecordingPrinter::default()));

        let response = deposit_endpoint(
            State(state),
            Path("49375347824".to_owned()),
            Ok(Json(AmountForm {
                amount: Money::ZERO,
                receipt: false,
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deposit_to_unknown_card_is_not_found() {
        let state = get_test_state(Arc::new(RecordingPrinter::default()));

        let response = deposit_endpoint(
            State(state),
            Path("XYZ".to_owned()),
            Ok(Json(AmountForm {
                amount: Money::from_major(5),
                receipt: false,
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
