//! Defines the endpoint for balance inquiries.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    account::find_by_tag,
    db::with_connection,
    money::Money,
    receipt::{Receipt, ReceiptSink, print_receipt},
};

/// The state needed for a balance inquiry.
#[derive(Debug, Clone)]
pub struct BalanceState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where to print receipts.
    pub receipt_sink: Arc<dyn ReceiptSink>,
    /// How long to wait for the printer.
    pub receipt_timeout: Duration,
}

impl FromRef<AppState> for BalanceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            receipt_sink: state.receipt_sink.clone(),
            receipt_timeout: state.config.receipt_timeout,
        }
    }
}

/// The query parameters for a balance inquiry.
#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    /// Whether to print a receipt.
    #[serde(default)]
    pub receipt: bool,
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt_warning: Option<String>,
}

/// A route handler for getting the balance of the account for the card `tag`.
pub async fn balance_endpoint(
    State(state): State<BalanceState>,
    Path(tag): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Response {
    let result = with_connection(&state.db_connection, |connection| {
        find_by_tag(&tag, connection)?.ok_or(Error::AccountNotFound)
    });

    let account = match result {
        Ok(account) => account,
        Err(error) => return error.into_response(),
    };

    let receipt_warning = if query.receipt {
        let receipt = Receipt::balance_inquiry(account.name, account.balance);
        print_receipt(state.receipt_sink, receipt, state.receipt_timeout).await
    } else {
        None
    };

    Json(BalanceResponse {
        balance: account.balance,
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
        extract::{Path, Query, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        account::seed_account,
        db::initialize,
        money::Money,
        receipt::test_utils::RecordingPrinter,
        test_utils::body_json,
    };

    use super::{BalanceQuery, BalanceState, balance_endpoint};

    fn get_test_state(printer: Arc<RecordingPrinter>) -> BalanceState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        seed_account("983933453559", "User2", Money::from_major(300), "5678", &conn).unwrap();

        BalanceState {
            db_connection: Arc::new(Mutex::new(conn)),
            receipt_sink: printer,
            receipt_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn returns_balance() {
        let printer = Arc::new(RecordingPrinter::default());
        let state = get_test_state(printer.clone());

        let response = balance_endpoint(
            State(state),
            Path("983933453559".to_owned()),
            Query(BalanceQuery::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"balance": 300.0}));
        assert!(printer.printed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prints_balance_inquiry_receipt() {
        let printer = Arc::new(RecordingPrinter::default());
        let state = get_test_state(printer.clone());

        let response = balance_endpoint(
            State(state),
            Path("983933453559".to_owned()),
            Query(BalanceQuery { receipt: true }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let printed = printer.printed.lock().unwrap();
        assert_eq!(printed.len(), 1);
        assert!(printed[0].contains("BALANCE INQUIRY"));
        assert!(printed[0].contains("User2"));
    }

    #[tokio::test]
    async fn unknown_card_is_not_found() {
        let state = get_test_state(Arc::new(RecordingPrinter::default()));

        let response = balance_endpoint(
            State(state),
            Path("XYZ".to_owned()),
            Query(BalanceQuery::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
