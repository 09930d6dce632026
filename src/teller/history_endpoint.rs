//! Defines the endpoint for listing the recent transactions of an account.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{AppState, db::with_connection, teller::history};

/// The most records a client can ask for in one request.
pub const MAX_HISTORY_LIMIT: u32 = 100;

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct HistoryState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The number of records to return when the client does not ask for a
    /// specific number.
    pub default_limit: u32,
}

impl FromRef<AppState> for HistoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            default_limit: state.config.history_limit,
        }
    }
}

/// The query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// The maximum number of records to return.
    pub limit: Option<u32>,
}

/// A route handler for the most recent transactions of the card `tag`,
/// newest first.
pub async fn history_endpoint(
    State(state): State<HistoryState>,
    Path(tag): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(state.default_limit)
        .min(MAX_HISTORY_LIMIT);

    match with_connection(&state.db_connection, |connection| {
        history(&tag, limit, connection)
    }) {
        Ok(records) => Json(records).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
    };
    use rusqlite::Connection;

    use crate::{
        account::seed_account,
        db::initialize,
        money::Money,
        teller::{deposit, withdraw},
        test_utils::{assert_content_type, body_json},
    };

    use super::{HistoryQuery, HistoryState, MAX_HISTORY_LIMIT, history_endpoint};

    fn get_test_state() -> HistoryState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        seed_account("49375347824", "Jomar", Money::from_major(500), "1234", &conn).unwrap();

        HistoryState {
            db_connection: Arc::new(Mutex::new(conn)),
            default_limit: 10,
        }
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let state = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            deposit("49375347824", Money::from_major(20), &conn).unwrap();
            withdraw("49375347824", Money::from_major(50), Money::from_major(18), &conn).unwrap();
        }

        let response = history_endpoint(
            State(state),
            Path("49375347824".to_owned()),
            Query(HistoryQuery::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "application/json");
        let body = body_json(response).await;
        let kinds: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|record| record["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["fee", "withdraw", "deposit"]);
        assert_eq!(body[0]["amount"], 18.0);
        assert!(body[0]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn uses_default_limit() {
        let state = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            for _ in 0..12 {
                deposit("49375347824", Money::from_major(1), &conn).unwrap();
            }
        }

        let response = history_endpoint(
            State(state),
            Path("49375347824".to_owned()),
            Query(HistoryQuery::default()),
        )
        .await;

        assert_eq!(body_json(response).await.as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn clamps_requested_limit() {
        let state = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            for _ in 0..(MAX_HISTORY_LIMIT + 5) {
                deposit("49375347824", Money::from_cents(1), &conn).unwrap();
            }
        }

        let response = history_endpoint(
            State(state),
            Path("49375347824".to_owned()),
            Query(HistoryQuery {
                limit: Some(u32::MAX),
            }),
        )
        .await;

        assert_eq!(
            body_json(response).await.as_array().unwrap().len(),
            MAX_HISTORY_LIMIT as usize
        );
    }

    #[tokio::test]
    async fn unknown_card_is_not_found() {
        let response = history_endpoint(
            State(get_test_state()),
            Path("XYZ".to_owned()),
            Query(HistoryQuery::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
