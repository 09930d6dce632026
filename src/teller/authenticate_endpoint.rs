//! Defines the endpoints for checking a card and its PIN.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState,
    db::with_connection,
    money::Money,
    teller::{authenticate_tag, check_pin},
};

/// The state needed to authenticate a card.
#[derive(Debug, Clone)]
pub struct AuthenticateState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthenticateState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for authenticating a card.
#[derive(Debug, Clone, Deserialize)]
pub struct CardForm {
    /// The card tag read by the card reader.
    pub tag: String,
}

/// The request body for checking a PIN.
#[derive(Clone, Deserialize)]
pub struct PinForm {
    /// The card tag read by the card reader.
    pub tag: String,
    /// The PIN typed on the keypad.
    pub pin: String,
}

// Keep the PIN out of the logs.
impl std::fmt::Debug for PinForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinForm")
            .field("tag", &self.tag)
            .field("pin", &"********")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct AuthenticateResponse {
    name: Option<String>,
    balance: Money,
}

/// A route handler for checking that a card is registered, responds with
/// the card holder's name and balance.
///
/// Unknown cards are rejected with `401 Unauthorized` and are not registered.
pub async fn authenticate_endpoint(
    State(state): State<AuthenticateState>,
    Json(form): Json<CardForm>,
) -> Response {
    match with_connection(&state.db_connection, |connection| {
        authenticate_tag(&form.tag, connection)
    }) {
        Ok(account) => Json(AuthenticateResponse {
            name: account.name,
            balance: account.balance,
        })
        .into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for checking the PIN typed for a card.
pub async fn verify_pin_endpoint(
    State(state): State<AuthenticateState>,
    Json(form): Json<PinForm>,
) -> Response {
    match with_connection(&state.db_connection, |connection| {
        check_pin(&form.tag, &form.pin, connection)
    }) {
        Ok(()) => Json(json!({ "verified": true })).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State, http::StatusCode};
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        account::{find_by_tag, seed_account},
        db::initialize,
        money::Money,
        test_utils::body_json,
    };

    use super::{
        AuthenticateState, CardForm, PinForm, authenticate_endpoint, verify_pin_endpoint,
    };

    fn get_test_state() -> AuthenticateState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        seed_account("49375347824", "Jomar", Money::from_major(500), "1234", &conn).unwrap();

        AuthenticateState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn pin_form(tag: &str, pin: &str) -> Json<PinForm> {
        Json(PinForm {
            tag: tag.to_owned(),
            pin: pin.to_owned(),
        })
    }

    #[tokio::test]
    async fn known_card_returns_name_and_balance() {
        let response = authenticate_endpoint(
            State(get_test_state()),
            Json(CardForm {
                tag: "49375347824".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"name": "Jomar", "balance": 500.0})
        );
    }

    #[tokio::test]
    async fn unknown_card_is_denied_and_not_registered() {
        let state = get_test_state();

        let response = authenticate_endpoint(
            State(state.clone()),
            Json(CardForm {
                tag: "XYZ".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let conn = state.db_connection.lock().unwrap();
        assert_eq!(find_by_tag("XYZ", &conn), Ok(None));
    }

    #[tokio::test]
    async fn correct_pin_is_verified() {
        let response =
            verify_pin_endpoint(State(get_test_state()), pin_form("49375347824", "1234")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"verified": true}));
    }

    #[tokio::test]
    async fn wrong_pin_is_unauthorized() {
        let response =
            verify_pin_endpoint(State(get_test_state()), pin_form("49375347824", "9999")).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"error": "incorrect PIN"}));
    }

    #[tokio::test]
    async fn pin_for_unknown_card_is_not_found() {
        let response = verify_pin_endpoint(State(get_test_state()), pin_form("XYZ", "1234")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn pin_is_redacted_from_debug_output() {
        let form = PinForm {
            tag: "49375347824".to_owned(),
            pin: "1234".to_owned(),
        };

        assert!(!format!("{form:?}").contains("1234"));
    }
}
